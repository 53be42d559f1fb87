//! Shard discovery and per-shard read positions
//!
//! A stream is split into shards, each an independently ordered partition.
//! The reader discovers the shard set once and keeps one [`ShardCursor`]
//! per shard for the rest of its life.

mod cursor;
mod discovery;
mod info;

pub use cursor::ShardCursor;
pub use discovery::ShardDiscovery;
pub use info::{CursorStats, ShardStats};

/// Shard ID type
pub type ShardId = String;
