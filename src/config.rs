//! Configuration for the stream reader
//!
//! This module provides configuration options for reading a log stream.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::client::StartPosition;
use crate::error::{Error, Result};

/// Default format for [`parse_start_time`]
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Compression algorithms a record payload may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum CompressionAlgorithm {
    /// Uncompressed payloads
    None,
    /// Gzip, as written by CloudWatch Logs subscriptions
    Gzip,
    /// LZ4 frame format
    Lz4,
    /// Zstandard
    Zstd,
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        Self::Gzip
    }
}

impl std::fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for CompressionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            "lz4" => Ok(Self::Lz4),
            "zstd" => Ok(Self::Zstd),
            _ => Err(Error::config(format!("Unknown compression algorithm: {}", s))),
        }
    }
}

impl CompressionAlgorithm {
    /// Get the name of the compression algorithm
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }

    /// Check if compression is enabled
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Configuration options for a stream reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ReaderConfig {
    /// Read from this instant onwards; `None` reads only new records
    pub start_time: Option<DateTime<Utc>>,
    /// Stop after this many events; `None` means no limit
    ///
    /// A 0 read from JSON means no limit, as with [`ReaderConfig::with_max_events`].
    #[serde(deserialize_with = "deserialize_max_events")]
    pub max_events: Option<usize>,
    /// Compression applied to each record payload
    pub compression_algorithm: CompressionAlgorithm,
    /// Enable metrics collection
    pub collect_metrics: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            start_time: None,
            max_events: None,
            compression_algorithm: CompressionAlgorithm::Gzip,
            collect_metrics: true,
        }
    }
}

impl ReaderConfig {
    /// Create a new reader configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instant to start reading from
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Parse and set the start time using a `chrono` format string
    pub fn with_start_time_str(self, text: &str, format: &str) -> Result<Self> {
        let start_time = parse_start_time(text, format)?;
        Ok(self.with_start_time(start_time))
    }

    /// Set the maximum number of events; 0 means no limit
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = if max_events == 0 { None } else { Some(max_events) };
        self
    }

    /// Set the record compression algorithm
    pub fn with_compression_algorithm(mut self, algorithm: CompressionAlgorithm) -> Self {
        self.compression_algorithm = algorithm;
        self
    }

    /// Set whether to collect metrics
    pub fn with_collect_metrics(mut self, collect: bool) -> Self {
        self.collect_metrics = collect;
        self
    }

    /// The iterator start position implied by the start time
    pub fn start_position(&self) -> StartPosition {
        StartPosition::from_start_time(self.start_time)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_events == Some(0) {
            return Err(Error::config(
                "Maximum events must be at least 1; use None for no limit",
            ));
        }

        Ok(())
    }

    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Create a human-readable string representation of the configuration
    pub fn to_string_pretty(&self) -> String {
        let mut result = String::new();

        result.push_str("=== Reader Configuration ===\n\n");

        result.push_str("Position:\n");
        result.push_str(&format!("  Start Position: {}\n", self.start_position()));
        match self.max_events {
            Some(max) => result.push_str(&format!("  Max Events: {}\n", max)),
            None => result.push_str("  Max Events: unlimited\n"),
        }

        result.push_str("\nDecoding:\n");
        result.push_str(&format!("  Compression Algorithm: {}\n", self.compression_algorithm));

        result.push_str("\nAdditional Settings:\n");
        result.push_str(&format!("  Collect Metrics: {}\n", self.collect_metrics));

        result
    }
}

fn deserialize_max_events<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let max_events = Option::<usize>::deserialize(deserializer)?;
    Ok(max_events.filter(|max| *max > 0))
}

/// Parse a naive timestamp in the given `chrono` format as UTC
pub fn parse_start_time(text: &str, format: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), format).map_err(|e| {
        Error::timestamp(format!("Cannot parse {:?} with format {:?}: {}", text, format, e))
    })?;

    Ok(Utc.from_utc_datetime(&naive))
}
