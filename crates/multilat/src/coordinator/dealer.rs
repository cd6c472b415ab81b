//! Scatter-gather distance collection over the data-plane dealer set.

use std::collections::HashMap;
use std::time::Duration;

use multilat_core::wire::{self, DISTANCE_REQUEST};
use multilat_core::Result;

use crate::net::DealerPool;

use super::store::NodeRecord;

/// Broadcasts `GetDistance` to every connected node and gathers the
/// replies. Not reentrant; the coordinator serializes rounds behind a
/// mutex so two scatter rounds never overlap on the socket set.
pub struct DistanceDealer {
    pool: DealerPool,
    expected: Vec<i32>,
    poll_timeout: Duration,
}

impl DistanceDealer {
    pub fn new(poll_timeout: Duration) -> Self {
        Self {
            pool: DealerPool::new(),
            expected: Vec::new(),
            poll_timeout,
        }
    }

    /// Opens one dealer connection per registered node. Called inside
    /// the activation write phase; a retry after a failed activation
    /// reuses connections that already succeeded.
    pub async fn connect(&mut self, nodes: &HashMap<i32, NodeRecord>) -> Result<()> {
        for record in nodes.values() {
            self.pool.connect(record.node_id, &record.reply_address).await?;
        }
        self.expected = self.pool.peer_ids();
        tracing::info!(nodes = self.expected.len(), "distance dealer connected");
        Ok(())
    }

    /// One scatter/gather round. The gather phase ends when every
    /// expected node has replied, or when `poll_timeout` elapses with
    /// no new message. Partial maps are returned as-is; a duplicate
    /// reply within the round keeps the last value.
    pub async fn request_distances(&mut self) -> HashMap<i32, f64> {
        self.pool.drain();

        for &node_id in &self.expected {
            if let Err(e) = self.pool.send(node_id, DISTANCE_REQUEST.to_vec()).await {
                tracing::warn!(node_id, error = %e, "distance request failed");
            }
        }

        let mut distances = HashMap::new();
        while distances.len() < self.expected.len() {
            match self.pool.recv_timeout(self.poll_timeout).await {
                Some((node_id, payload)) => match wire::decode_distance(&payload) {
                    Some(distance) => {
                        distances.insert(node_id, distance);
                    }
                    None => {
                        tracing::warn!(node_id, "undecodable distance reply dropped");
                    }
                },
                None => {
                    tracing::debug!(
                        received = distances.len(),
                        expected = self.expected.len(),
                        "gather round timed out"
                    );
                    break;
                }
            }
        }

        distances
    }
}
