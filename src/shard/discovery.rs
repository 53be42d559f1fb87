//! Shard discovery
//!
//! Lists every shard of a stream, following pagination to the end.

use tracing::debug;

use crate::client::StreamClient;
use crate::error::{Error, Result};
use crate::shard::ShardId;

/// Lists the shards of a stream
pub struct ShardDiscovery<'a, C: StreamClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: StreamClient + ?Sized> ShardDiscovery<'a, C> {
    /// Create a discovery helper over a client
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Return every shard id of the stream in upstream order
    ///
    /// Any upstream failure aborts discovery; nothing is retried.
    pub fn discover(&self, stream_name: &str) -> Result<Vec<ShardId>> {
        let mut shard_ids = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .client
                .list_shards(stream_name, next_token.as_deref())
                .map_err(|e| Error::discovery(stream_name, e))?;
            pages += 1;

            shard_ids.extend(page.shard_ids);

            // An empty token ends the listing just like a missing one
            match page.next_token.filter(|token| !token.is_empty()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(
            stream = stream_name,
            shards = shard_ids.len(),
            pages,
            "discovered shards"
        );

        Ok(shard_ids)
    }
}
