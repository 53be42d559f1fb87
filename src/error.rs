//! Error handling for the log reader
//!
//! This module provides error types and result aliases for stream reading,
//! record decoding and configuration.

use std::io;
use thiserror::Error;

use crate::client::ClientError;

/// Errors that can occur while reading a log stream
#[derive(Error, Debug)]
pub enum Error {
    /// Listing the stream's shards failed
    #[error("Shard discovery failed for stream {stream}: {source}")]
    Discovery {
        stream: String,
        #[source]
        source: ClientError,
    },

    /// Acquiring a shard iterator failed
    #[error("Shard iterator error for {shard_id}: {source}")]
    Iterator {
        shard_id: String,
        #[source]
        source: ClientError,
    },

    /// Fetching records from a shard failed
    #[error("Fetch error for {shard_id}: {source}")]
    Fetch {
        shard_id: String,
        #[source]
        source: ClientError,
    },

    /// A fetched record could not be decompressed or parsed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Errors related to compression
    #[error("Compression error: {0}")]
    Compression(String),

    /// Errors related to I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to timestamp parsing
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    /// Generic error type for other cases
    #[error("{0}")]
    Other(String),
}

/// Result type for reader operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new discovery error
    pub fn discovery(stream: impl Into<String>, source: impl Into<ClientError>) -> Self {
        Self::Discovery {
            stream: stream.into(),
            source: source.into(),
        }
    }

    /// Create a new iterator error
    pub fn iterator(shard_id: impl Into<String>, source: impl Into<ClientError>) -> Self {
        Self::Iterator {
            shard_id: shard_id.into(),
            source: source.into(),
        }
    }

    /// Create a new fetch error
    pub fn fetch(shard_id: impl Into<String>, source: impl Into<ClientError>) -> Self {
        Self::Fetch {
            shard_id: shard_id.into(),
            source: source.into(),
        }
    }

    /// Create a new decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a new compression error
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression(message.into())
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new timestamp error
    pub fn timestamp(message: impl Into<String>) -> Self {
        Self::Timestamp(message.into())
    }

    /// Create a new generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Check if this error came from the upstream service
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::Discovery { .. } | Self::Iterator { .. } | Self::Fetch { .. }
        )
    }

    /// Check if this is a decode error
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Timestamp(_))
    }

    /// The shard the error is attributed to, if any
    pub fn shard_id(&self) -> Option<&str> {
        match self {
            Self::Iterator { shard_id, .. } | Self::Fetch { shard_id, .. } => Some(shard_id),
            _ => None,
        }
    }

    /// Get a user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Discovery { stream, .. } => Some(format!(
                "Check that stream {} exists and that your credentials can describe it",
                stream
            )),
            Self::Iterator { .. } => {
                Some("The start time may be outside the stream's retention period".to_string())
            }
            Self::Fetch { .. } => Some(
                "The request may have been throttled; retrying is left to the caller".to_string(),
            ),
            Self::Decode(_) => Some(
                "Records must be gzip-compressed CloudWatch Logs subscription payloads"
                    .to_string(),
            ),
            Self::Timestamp(_) => Some("Check the start time against the time format".to_string()),
            _ => None,
        }
    }
}
