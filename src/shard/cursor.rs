//! Per-shard read position
//!
//! A cursor holds the iterator token for the next fetch from one shard and
//! whether the most recent fetch reported the shard as caught up.

use std::time::Instant;

use tracing::debug;

use crate::client::{RawRecord, StartPosition, StreamClient};
use crate::error::{Error, Result};
use crate::metrics::ReaderMetrics;
use crate::shard::{CursorStats, ShardId};

/// Read position within one shard
#[derive(Debug, Clone)]
pub struct ShardCursor {
    shard_id: ShardId,
    iterator: String,
    caught_up: bool,
    stats: CursorStats,
}

impl ShardCursor {
    /// Acquire an iterator for a shard at the requested start position
    pub fn open<C: StreamClient + ?Sized>(
        client: &C,
        stream_name: &str,
        shard_id: impl Into<ShardId>,
        position: &StartPosition,
    ) -> Result<Self> {
        let shard_id = shard_id.into();
        let iterator = client
            .get_shard_iterator(stream_name, &shard_id, position)
            .map_err(|e| Error::iterator(shard_id.as_str(), e))?;

        debug!(shard = %shard_id, position = %position, "opened shard iterator");

        Ok(Self {
            shard_id,
            iterator,
            caught_up: false,
            stats: CursorStats::default(),
        })
    }

    /// Fetch the next batch of records
    ///
    /// Makes exactly one upstream call. On success the iterator token is
    /// replaced and `caught_up` is recomputed from this fetch alone, so it
    /// can go back to `false` after having been `true`. On failure the
    /// cursor is left untouched.
    pub fn advance<C: StreamClient + ?Sized>(
        &mut self,
        client: &C,
        metrics: Option<&ReaderMetrics>,
    ) -> Result<Vec<RawRecord>> {
        let start = Instant::now();
        let batch = client
            .get_records(&self.iterator)
            .map_err(|e| Error::fetch(self.shard_id.as_str(), e))?;
        let duration = start.elapsed();

        let bytes: usize = batch.records.iter().map(|record| record.data.len()).sum();

        self.caught_up = batch.is_caught_up();
        self.iterator = batch.next_iterator;

        self.stats.fetches += 1;
        self.stats.records += batch.records.len();
        self.stats.bytes += bytes;
        self.stats.millis_behind_latest = Some(batch.millis_behind_latest);

        if let Some(metrics) = metrics {
            metrics.increment_fetches();
            metrics.add_records(batch.records.len());
            metrics.add_bytes_fetched(bytes);
            metrics.record_fetch_duration(duration);
        }

        debug!(
            shard = %self.shard_id,
            records = batch.records.len(),
            millis_behind_latest = batch.millis_behind_latest,
            "fetched records"
        );

        Ok(batch.records)
    }

    /// Count events decoded from this cursor's records
    pub(crate) fn add_events(&mut self, count: usize) {
        self.stats.events += count;
    }

    /// The shard this cursor reads
    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    /// The token the next fetch will use
    pub fn iterator(&self) -> &str {
        &self.iterator
    }

    /// Whether the last fetch reported no remaining backlog
    pub fn is_caught_up(&self) -> bool {
        self.caught_up
    }

    /// Statistics for this cursor
    pub fn stats(&self) -> &CursorStats {
        &self.stats
    }
}
