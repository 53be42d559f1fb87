//! Shard read statistics
//!
//! Per-cursor counters and the aggregate view across all shards of a reader.

use serde::Serialize;

use crate::shard::ShardId;

/// Statistics about a single shard cursor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CursorStats {
    /// Number of fetches made
    pub fetches: usize,
    /// Number of records received
    pub records: usize,
    /// Number of events decoded from those records
    pub events: usize,
    /// Compressed bytes received
    pub bytes: usize,
    /// Backlog reported by the most recent fetch
    pub millis_behind_latest: Option<u64>,
}

impl CursorStats {
    /// Average number of records per fetch
    pub fn avg_records_per_fetch(&self) -> f64 {
        if self.fetches == 0 {
            return 0.0;
        }

        self.records as f64 / self.fetches as f64
    }
}

/// Statistics about every shard of a reader
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShardStats {
    /// Number of shards
    pub shard_count: usize,
    /// Number of shards whose last fetch reported no backlog
    pub caught_up_shards: usize,
    /// Total fetches across all shards
    pub total_fetches: usize,
    /// Total records across all shards
    pub total_records: usize,
    /// Total events across all shards
    pub total_events: usize,
    /// Largest backlog reported by any shard's last fetch
    pub max_millis_behind_latest: Option<u64>,
    /// Per-shard breakdown in discovery order
    pub shards: Vec<(ShardId, CursorStats)>,
}

impl ShardStats {
    /// Create new empty shard stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cursor's statistics into the aggregate
    pub fn add_shard(&mut self, shard_id: ShardId, caught_up: bool, stats: CursorStats) {
        self.shard_count += 1;
        if caught_up {
            self.caught_up_shards += 1;
        }
        self.total_fetches += stats.fetches;
        self.total_records += stats.records;
        self.total_events += stats.events;
        if let Some(lag) = stats.millis_behind_latest {
            self.max_millis_behind_latest =
                Some(self.max_millis_behind_latest.map_or(lag, |max| max.max(lag)));
        }
        self.shards.push((shard_id, stats));
    }

    /// Whether every shard reported no backlog on its last fetch
    pub fn all_caught_up(&self) -> bool {
        self.caught_up_shards == self.shard_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_stats_average() {
        let stats = CursorStats::default();
        assert_eq!(stats.avg_records_per_fetch(), 0.0);

        let stats = CursorStats {
            fetches: 4,
            records: 10,
            ..Default::default()
        };
        assert_eq!(stats.avg_records_per_fetch(), 2.5);
    }

    #[test]
    fn test_shard_stats_aggregate() {
        let mut stats = ShardStats::new();
        assert!(stats.all_caught_up());

        stats.add_shard(
            "shard-0001".to_string(),
            true,
            CursorStats {
                fetches: 2,
                records: 3,
                events: 6,
                bytes: 300,
                millis_behind_latest: Some(0),
            },
        );
        stats.add_shard(
            "shard-0002".to_string(),
            false,
            CursorStats {
                fetches: 1,
                records: 1,
                events: 2,
                bytes: 100,
                millis_behind_latest: Some(2500),
            },
        );

        assert_eq!(stats.shard_count, 2);
        assert_eq!(stats.caught_up_shards, 1);
        assert!(!stats.all_caught_up());
        assert_eq!(stats.total_fetches, 3);
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.total_events, 8);
        assert_eq!(stats.max_millis_behind_latest, Some(2500));
        assert_eq!(stats.shards[0].0, "shard-0001");
    }
}
