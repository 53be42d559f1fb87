//! # kinesis_logs_rs
//!
//! Read CloudWatch Logs subscription data from a sharded Kinesis stream as
//! one ordered sequence of log events.
//!
//! ## Overview
//!
//! CloudWatch Logs delivers subscription data (VPC flow logs, for example)
//! into a stream as gzip-compressed JSON envelopes, spread across shards.
//! A [`StreamReader`] discovers the shards once, polls them round-robin and
//! yields the extracted fields of every data event until all shards report
//! that they are caught up.
//!
//! ```no_run
//! use kinesis_logs_rs::{MemoryStreamClient, StreamReader};
//!
//! let client = MemoryStreamClient::new("flow-logs").with_shard("shardId-000000000000");
//! let reader = StreamReader::open(&client, "flow-logs", None)?;
//!
//! let mut out = std::io::stdout();
//! kinesis_logs_rs::format::write_tsv(&mut out, reader)?;
//! # Ok::<(), kinesis_logs_rs::Error>(())
//! ```
//!
//! The upstream API sits behind the [`StreamClient`] trait, so any transport
//! can be plugged in.

pub mod client;
pub mod compression;
pub mod config;
pub mod decoder;
pub mod error;
pub mod format;
pub mod metrics;
pub mod reader;
pub mod shard;

pub use client::{
    ClientError, MemoryStreamClient, RawRecord, RecordBatch, ShardPage, StartPosition,
    StreamClient,
};
pub use config::{parse_start_time, CompressionAlgorithm, ReaderConfig, DEFAULT_TIME_FORMAT};
pub use decoder::{LogEvent, MessageType, RecordDecoder};
pub use error::{Error, Result};
pub use metrics::ReaderMetrics;
pub use reader::{ReaderState, StreamReader};
pub use shard::{ShardCursor, ShardDiscovery, ShardId, ShardStats};
