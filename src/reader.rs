//! Round-robin stream reader
//!
//! The reader discovers a stream's shards once, opens one cursor per shard
//! and then polls the shards in discovery order, one fetch each per pass.
//! Every event of a shard's batch is emitted before the next shard is
//! polled. After a full pass the reader stops if every shard reported no
//! backlog on its latest fetch; otherwise it starts another pass.
//!
//! Polling is tight: there is no pause between fetches or passes. Because
//! `caught_up` is recomputed on every fetch, a shard that keeps receiving
//! data can keep the reader running indefinitely.

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::StreamClient;
use crate::config::ReaderConfig;
use crate::decoder::{LogEvent, RecordDecoder};
use crate::error::{Error, Result};
use crate::metrics::ReaderMetrics;
use crate::shard::{ShardCursor, ShardDiscovery, ShardId, ShardStats};

/// Production phase of a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// More events may follow
    Polling,
    /// Every shard caught up after a full pass, or the event limit was hit
    Finished,
    /// An error was delivered; nothing more will be produced
    Failed,
}

/// Lazily produced sequence of log events from every shard of a stream
///
/// Iterating yields `Ok(event)` items until the stream is caught up. If a
/// fetch or decode fails, events already decoded from that batch are
/// yielded first, then the error, and the iterator is fused.
pub struct StreamReader<C: StreamClient> {
    client: C,
    stream_name: String,
    cursors: Vec<ShardCursor>,
    decoder: RecordDecoder,
    pending: VecDeque<LogEvent>,
    pending_error: Option<Error>,
    next_shard: usize,
    passes: usize,
    yielded: usize,
    max_events: Option<usize>,
    state: ReaderState,
    metrics: Option<Arc<ReaderMetrics>>,
}

impl<C: StreamClient> StreamReader<C> {
    /// Open a reader on a stream
    ///
    /// Without a start time only records written from now on are read;
    /// with one, reading starts at that instant.
    pub fn open(
        client: C,
        stream_name: impl Into<String>,
        start_time: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Self> {
        let mut config = ReaderConfig::new();
        config.start_time = start_time;
        Self::with_config(client, stream_name, config)
    }

    /// Open a reader with a custom configuration
    ///
    /// Discovers the shards and acquires an iterator for every one of them.
    /// Any failure here aborts the open.
    pub fn with_config(
        client: C,
        stream_name: impl Into<String>,
        config: ReaderConfig,
    ) -> Result<Self> {
        config.validate()?;

        let stream_name = stream_name.into();
        let position = config.start_position();

        let shard_ids = ShardDiscovery::new(&client).discover(&stream_name)?;
        let cursors = shard_ids
            .into_iter()
            .map(|shard_id| ShardCursor::open(&client, &stream_name, shard_id, &position))
            .collect::<Result<Vec<_>>>()?;

        info!(
            stream = %stream_name,
            shards = cursors.len(),
            position = %position,
            "opened stream reader"
        );

        let metrics = if config.collect_metrics {
            Some(Arc::new(ReaderMetrics::new()))
        } else {
            None
        };

        Ok(Self {
            client,
            stream_name,
            cursors,
            decoder: RecordDecoder::new(config.compression_algorithm),
            pending: VecDeque::new(),
            pending_error: None,
            next_shard: 0,
            passes: 0,
            yielded: 0,
            max_events: config.max_events,
            state: ReaderState::Polling,
            metrics,
        })
    }

    /// The stream being read
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Shard ids in polling order
    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.cursors
            .iter()
            .map(|cursor| cursor.shard_id().to_string())
            .collect()
    }

    /// Per-shard cursors in polling order
    pub fn cursors(&self) -> &[ShardCursor] {
        &self.cursors
    }

    /// Number of completed passes over all shards
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Number of events handed to the consumer so far
    pub fn events_yielded(&self) -> usize {
        self.yielded
    }

    /// Current production phase
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Whether the sequence has ended, normally or not
    pub fn is_finished(&self) -> bool {
        self.state != ReaderState::Polling
    }

    /// Shared metrics handle, if metrics are enabled
    pub fn metrics(&self) -> Option<Arc<ReaderMetrics>> {
        self.metrics.clone()
    }

    /// Aggregate statistics across all shards
    pub fn stats(&self) -> ShardStats {
        let mut stats = ShardStats::new();
        for cursor in &self.cursors {
            stats.add_shard(
                cursor.shard_id().to_string(),
                cursor.is_caught_up(),
                cursor.stats().clone(),
            );
        }
        stats
    }

    fn limit_reached(&self) -> bool {
        self.max_events.map_or(false, |max| self.yielded >= max)
    }

    /// Fetch one batch from the shard at `index` and queue its events
    ///
    /// Records are decoded in order; on the first failure the events decoded
    /// so far stay queued and the error is returned.
    fn poll_shard(&mut self, index: usize) -> Result<()> {
        let metrics = self.metrics.as_deref();
        let cursor = &mut self.cursors[index];
        let records = cursor.advance(&self.client, metrics)?;

        let mut events = 0usize;
        let mut result = Ok(());
        for record in &records {
            match self.decoder.decode_with_metrics(&record.data, metrics) {
                Ok(decoded) => {
                    events += decoded.events.len();
                    self.pending.extend(decoded.events);
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        cursor.add_events(events);

        result
    }

    /// Finish a pass; returns whether another pass should start
    fn end_pass(&mut self) -> bool {
        self.passes += 1;
        if let Some(metrics) = &self.metrics {
            metrics.increment_passes();
        }

        if self.cursors.iter().all(ShardCursor::is_caught_up) {
            debug!(
                stream = %self.stream_name,
                passes = self.passes,
                events = self.yielded,
                "all shards caught up"
            );
            return false;
        }

        self.next_shard = 0;
        true
    }
}

impl<C: StreamClient> Iterator for StreamReader<C> {
    type Item = Result<LogEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.limit_reached() {
                if self.state == ReaderState::Polling {
                    debug!(
                        stream = %self.stream_name,
                        events = self.yielded,
                        "event limit reached"
                    );
                    self.state = ReaderState::Finished;
                }
                return None;
            }

            if let Some(event) = self.pending.pop_front() {
                self.yielded += 1;
                return Some(Ok(event));
            }

            if let Some(error) = self.pending_error.take() {
                return Some(Err(error));
            }

            if self.state != ReaderState::Polling {
                return None;
            }

            if self.next_shard == self.cursors.len() && !self.end_pass() {
                self.state = ReaderState::Finished;
                return None;
            }

            let index = self.next_shard;
            self.next_shard += 1;

            if let Err(error) = self.poll_shard(index) {
                warn!(
                    stream = %self.stream_name,
                    shard = %self.cursors[index].shard_id(),
                    error = %error,
                    "stopping stream reader"
                );
                self.state = ReaderState::Failed;
                self.pending_error = Some(error);
            }
        }
    }
}

impl<C: StreamClient> FusedIterator for StreamReader<C> {}
