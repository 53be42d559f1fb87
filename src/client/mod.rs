//! Upstream stream API
//!
//! The reader talks to the streaming service through the [`StreamClient`]
//! trait. A real deployment wires an AWS transport behind it; the
//! [`MemoryStreamClient`] serves scripted batches from memory.

mod memory;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shard::ShardId;

pub use memory::{MemoryClientError, MemoryStreamClient};

/// Error type returned by client implementations
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// Where a new shard iterator should start reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartPosition {
    /// Only records added after the iterator is created
    Latest,
    /// Records from the given instant onwards
    AtTimestamp(DateTime<Utc>),
}

impl StartPosition {
    /// `LATEST` without a start time, `AT_TIMESTAMP` with one
    pub fn from_start_time(start_time: Option<DateTime<Utc>>) -> Self {
        match start_time {
            Some(timestamp) => Self::AtTimestamp(timestamp),
            None => Self::Latest,
        }
    }

    /// The upstream iterator type name
    pub fn iterator_type(&self) -> &'static str {
        match self {
            Self::Latest => "LATEST",
            Self::AtTimestamp(_) => "AT_TIMESTAMP",
        }
    }

    /// The timestamp carried by `AT_TIMESTAMP`
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Latest => None,
            Self::AtTimestamp(timestamp) => Some(*timestamp),
        }
    }
}

impl Default for StartPosition {
    fn default() -> Self {
        Self::Latest
    }
}

impl fmt::Display for StartPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "LATEST"),
            Self::AtTimestamp(timestamp) => write!(f, "AT_TIMESTAMP({})", timestamp.to_rfc3339()),
        }
    }
}

/// A single record as delivered by the stream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    /// Compressed payload
    pub data: Vec<u8>,
    /// Upstream sequence number, if the transport reports one
    pub sequence_number: Option<String>,
    /// Partition key the producer used
    pub partition_key: Option<String>,
}

impl RawRecord {
    /// Create a record from its payload
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            sequence_number: None,
            partition_key: None,
        }
    }

    /// Attach an upstream sequence number
    pub fn with_sequence_number(mut self, sequence_number: impl Into<String>) -> Self {
        self.sequence_number = Some(sequence_number.into());
        self
    }

    /// Attach a partition key
    pub fn with_partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }
}

/// Response to a single record fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    /// Records in shard order
    pub records: Vec<RawRecord>,
    /// Token for the next fetch from the same shard
    pub next_iterator: String,
    /// How far behind the tip of the shard this fetch left the reader
    pub millis_behind_latest: u64,
}

impl RecordBatch {
    /// Whether the fetch reported no remaining backlog
    pub fn is_caught_up(&self) -> bool {
        self.millis_behind_latest == 0
    }
}

/// One page of a shard listing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShardPage {
    /// Shard ids in upstream order
    pub shard_ids: Vec<ShardId>,
    /// Token for the next page; `None` on the last page
    pub next_token: Option<String>,
}

/// Blocking access to a sharded stream
///
/// Every method maps to exactly one upstream request. Implementations must
/// not retry internally.
pub trait StreamClient {
    /// List one page of the stream's shards
    fn list_shards(
        &self,
        stream_name: &str,
        next_token: Option<&str>,
    ) -> std::result::Result<ShardPage, ClientError>;

    /// Obtain an iterator token for a shard
    fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        position: &StartPosition,
    ) -> std::result::Result<String, ClientError>;

    /// Fetch the records behind an iterator token
    fn get_records(&self, iterator: &str) -> std::result::Result<RecordBatch, ClientError>;
}

impl<C: StreamClient + ?Sized> StreamClient for &C {
    fn list_shards(
        &self,
        stream_name: &str,
        next_token: Option<&str>,
    ) -> std::result::Result<ShardPage, ClientError> {
        (**self).list_shards(stream_name, next_token)
    }

    fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        position: &StartPosition,
    ) -> std::result::Result<String, ClientError> {
        (**self).get_shard_iterator(stream_name, shard_id, position)
    }

    fn get_records(&self, iterator: &str) -> std::result::Result<RecordBatch, ClientError> {
        (**self).get_records(iterator)
    }
}

impl<C: StreamClient + ?Sized> StreamClient for Box<C> {
    fn list_shards(
        &self,
        stream_name: &str,
        next_token: Option<&str>,
    ) -> std::result::Result<ShardPage, ClientError> {
        (**self).list_shards(stream_name, next_token)
    }

    fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        position: &StartPosition,
    ) -> std::result::Result<String, ClientError> {
        (**self).get_shard_iterator(stream_name, shard_id, position)
    }

    fn get_records(&self, iterator: &str) -> std::result::Result<RecordBatch, ClientError> {
        (**self).get_records(iterator)
    }
}

impl<C: StreamClient + ?Sized> StreamClient for Arc<C> {
    fn list_shards(
        &self,
        stream_name: &str,
        next_token: Option<&str>,
    ) -> std::result::Result<ShardPage, ClientError> {
        (**self).list_shards(stream_name, next_token)
    }

    fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        position: &StartPosition,
    ) -> std::result::Result<String, ClientError> {
        (**self).get_shard_iterator(stream_name, shard_id, position)
    }

    fn get_records(&self, iterator: &str) -> std::result::Result<RecordBatch, ClientError> {
        (**self).get_records(iterator)
    }
}
