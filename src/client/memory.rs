//! In-memory stream client
//!
//! Serves a fixed, scripted sequence of record batches per shard. Iterator
//! tokens have the form `<shard_id>_iterator-<n>` where `n` is the 1-based
//! position of the next batch; once a shard's script is exhausted every
//! further fetch returns an empty, caught-up batch.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use super::{ClientError, RawRecord, RecordBatch, ShardPage, StartPosition, StreamClient};
use crate::shard::ShardId;

const ITERATOR_SEPARATOR: &str = "_iterator-";
const PAGE_TOKEN_PREFIX: &str = "page-";

/// Errors produced by [`MemoryStreamClient`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryClientError {
    /// The requested stream does not exist
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// The requested shard does not exist
    #[error("Shard not found: {0}")]
    ShardNotFound(String),

    /// The iterator token was not issued by this client
    #[error("Invalid shard iterator: {0}")]
    InvalidIterator(String),

    /// The pagination token was not issued by this client
    #[error("Invalid next token: {0}")]
    InvalidNextToken(String),

    /// A failure injected by the test script
    #[error("{0}")]
    Injected(String),
}

#[derive(Debug, Clone)]
struct ScriptedBatch {
    records: Vec<RawRecord>,
    millis_behind_latest: u64,
}

#[derive(Debug, Default)]
struct CallLog {
    list_calls: Vec<Option<String>>,
    iterator_requests: Vec<(ShardId, StartPosition)>,
    fetches: Vec<String>,
}

/// Scripted, in-memory implementation of [`StreamClient`]
#[derive(Debug)]
pub struct MemoryStreamClient {
    stream_name: String,
    page_size: usize,
    shard_ids: Vec<ShardId>,
    scripts: HashMap<ShardId, Vec<ScriptedBatch>>,
    listing_failure: Option<String>,
    iterator_failures: HashMap<ShardId, String>,
    fetch_failures: HashMap<(ShardId, usize), String>,
    calls: Mutex<CallLog>,
}

impl MemoryStreamClient {
    /// Create a client serving a single stream with no shards
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            page_size: usize::MAX,
            shard_ids: Vec::new(),
            scripts: HashMap::new(),
            listing_failure: None,
            iterator_failures: HashMap::new(),
            fetch_failures: HashMap::new(),
            calls: Mutex::new(CallLog::default()),
        }
    }

    /// Split the shard listing into pages of `page_size` shards
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Add a shard with an empty script
    pub fn with_shard(mut self, shard_id: impl Into<ShardId>) -> Self {
        let shard_id = shard_id.into();
        if !self.scripts.contains_key(&shard_id) {
            self.shard_ids.push(shard_id.clone());
            self.scripts.insert(shard_id, Vec::new());
        }
        self
    }

    /// Append a batch to a shard's script, adding the shard if needed
    pub fn with_batch(
        self,
        shard_id: impl Into<ShardId>,
        records: Vec<RawRecord>,
        millis_behind_latest: u64,
    ) -> Self {
        let shard_id = shard_id.into();
        let mut client = self.with_shard(shard_id.clone());
        if let Some(script) = client.scripts.get_mut(&shard_id) {
            script.push(ScriptedBatch {
                records,
                millis_behind_latest,
            });
        }
        client
    }

    /// Make every shard listing request fail
    pub fn fail_listing(mut self, message: impl Into<String>) -> Self {
        self.listing_failure = Some(message.into());
        self
    }

    /// Make iterator requests for a shard fail
    pub fn fail_iterator(
        mut self,
        shard_id: impl Into<ShardId>,
        message: impl Into<String>,
    ) -> Self {
        self.iterator_failures.insert(shard_id.into(), message.into());
        self
    }

    /// Make the `fetch`-th (1-based) fetch from a shard fail
    pub fn fail_fetch(
        mut self,
        shard_id: impl Into<ShardId>,
        fetch: usize,
        message: impl Into<String>,
    ) -> Self {
        self.fetch_failures.insert((shard_id.into(), fetch), message.into());
        self
    }

    /// Pagination tokens passed to `list_shards`, one entry per call
    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.calls.lock().list_calls.clone()
    }

    /// Iterator requests in the order they were made
    pub fn iterator_requests(&self) -> Vec<(ShardId, StartPosition)> {
        self.calls.lock().iterator_requests.clone()
    }

    /// Iterator tokens passed to `get_records`, in call order
    pub fn fetches(&self) -> Vec<String> {
        self.calls.lock().fetches.clone()
    }

    /// Number of fetches made against one shard
    pub fn fetch_count(&self, shard_id: &str) -> usize {
        self.calls
            .lock()
            .fetches
            .iter()
            .filter(|token| parse_iterator(token).map_or(false, |(id, _)| id == shard_id))
            .count()
    }

    fn check_stream(&self, stream_name: &str) -> std::result::Result<(), MemoryClientError> {
        if stream_name != self.stream_name {
            return Err(MemoryClientError::StreamNotFound(stream_name.to_string()));
        }
        Ok(())
    }
}

fn iterator_token(shard_id: &str, position: usize) -> String {
    format!("{}{}{:04}", shard_id, ITERATOR_SEPARATOR, position)
}

fn parse_iterator(token: &str) -> Option<(&str, usize)> {
    let (shard_id, position) = token.rsplit_once(ITERATOR_SEPARATOR)?;
    let position = position.parse::<usize>().ok()?;
    if position == 0 {
        return None;
    }
    Some((shard_id, position))
}

impl StreamClient for MemoryStreamClient {
    fn list_shards(
        &self,
        stream_name: &str,
        next_token: Option<&str>,
    ) -> std::result::Result<ShardPage, ClientError> {
        self.calls
            .lock()
            .list_calls
            .push(next_token.map(str::to_string));

        if let Some(message) = &self.listing_failure {
            return Err(MemoryClientError::Injected(message.clone()).into());
        }
        self.check_stream(stream_name)?;

        let offset = match next_token {
            None => 0,
            Some(token) => token
                .strip_prefix(PAGE_TOKEN_PREFIX)
                .and_then(|offset| offset.parse::<usize>().ok())
                .filter(|offset| *offset <= self.shard_ids.len())
                .ok_or_else(|| MemoryClientError::InvalidNextToken(token.to_string()))?,
        };

        let end = offset.saturating_add(self.page_size).min(self.shard_ids.len());
        let next_token = if end < self.shard_ids.len() {
            Some(format!("{}{}", PAGE_TOKEN_PREFIX, end))
        } else {
            None
        };

        Ok(ShardPage {
            shard_ids: self.shard_ids[offset..end].to_vec(),
            next_token,
        })
    }

    fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        position: &StartPosition,
    ) -> std::result::Result<String, ClientError> {
        self.calls
            .lock()
            .iterator_requests
            .push((shard_id.to_string(), *position));

        self.check_stream(stream_name)?;
        if let Some(message) = self.iterator_failures.get(shard_id) {
            return Err(MemoryClientError::Injected(message.clone()).into());
        }
        if !self.scripts.contains_key(shard_id) {
            return Err(MemoryClientError::ShardNotFound(shard_id.to_string()).into());
        }

        Ok(iterator_token(shard_id, 1))
    }

    fn get_records(&self, iterator: &str) -> std::result::Result<RecordBatch, ClientError> {
        let fetch_number = {
            let mut calls = self.calls.lock();
            calls.fetches.push(iterator.to_string());
            calls
                .fetches
                .iter()
                .filter(|token| {
                    parse_iterator(token).map(|(id, _)| id)
                        == parse_iterator(iterator).map(|(id, _)| id)
                })
                .count()
        };

        let (shard_id, position) = parse_iterator(iterator)
            .ok_or_else(|| MemoryClientError::InvalidIterator(iterator.to_string()))?;
        let script = self
            .scripts
            .get(shard_id)
            .ok_or_else(|| MemoryClientError::InvalidIterator(iterator.to_string()))?;

        if let Some(message) = self.fetch_failures.get(&(shard_id.to_string(), fetch_number)) {
            return Err(MemoryClientError::Injected(message.clone()).into());
        }

        let batch = match script.get(position - 1) {
            Some(batch) => RecordBatch {
                records: batch.records.clone(),
                next_iterator: iterator_token(shard_id, position + 1),
                millis_behind_latest: batch.millis_behind_latest,
            },
            None => RecordBatch {
                records: Vec::new(),
                next_iterator: iterator_token(shard_id, position + 1),
                millis_behind_latest: 0,
            },
        };

        Ok(batch)
    }
}
