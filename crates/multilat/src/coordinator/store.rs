//! Concurrency-safe registry of sensor nodes plus the activation flag.
//!
//! The two logical variables each live behind their own fair
//! reader/writer lock. Lock order is always `active` before `nodes`.
//! `add_node` holds the activation read guard across its mutation and
//! the activation transition holds the write guard across dealer/solver
//! setup, so a registration can never interleave with activation: a
//! caller that observes `is_active == true` sees exactly the registry
//! that was frozen at activation.

use std::collections::{hash_map::Entry, HashMap};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockWriteGuard};

use multilat_core::Point3;

/// A registered sensor node. Immutable after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: i32,
    pub position: Point3,
    /// Data-plane endpoint where the node's distance router listens.
    pub reply_address: String,
}

impl NodeRecord {
    pub fn new(node_id: i32, position: Point3, reply_address: impl Into<String>) -> Self {
        Self {
            node_id,
            position,
            reply_address: reply_address.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct NetworkStore {
    active: RwLock<bool>,
    nodes: RwLock<HashMap<i32, NodeRecord>>,
}

impl NetworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. Returns `true` iff the id was free and the
    /// network is still inactive; no mutation otherwise.
    pub async fn add_node(&self, record: NodeRecord) -> bool {
        let active = self.active.read().await;
        if *active {
            return false;
        }

        let mut nodes = self.nodes.write().await;
        match nodes.entry(record.node_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
        // `active` read guard held until here: no insertion can race
        // the activation transition.
    }

    /// Snapshot copy of the registry, safe for concurrent readers.
    pub async fn get_nodes_info(&self) -> HashMap<i32, NodeRecord> {
        self.nodes.read().await.clone()
    }

    pub async fn get_is_active(&self) -> bool {
        *self.active.read().await
    }

    pub async fn set_is_active(&self, state: bool) {
        *self.active.write().await = state;
    }

    /// Enters the activation write phase. Returns `None` when the
    /// network is already active. The returned guard freezes the
    /// registry snapshot; the flag flips only on `commit`, so a failed
    /// setup (guard dropped) leaves the store inactive.
    pub async fn begin_activation(&self) -> Option<ActivationGuard<'_>> {
        let flag = self.active.write().await;
        if *flag {
            return None;
        }

        let snapshot = self.nodes.read().await.clone();
        Some(ActivationGuard { flag, snapshot })
    }
}

pub struct ActivationGuard<'a> {
    flag: RwLockWriteGuard<'a, bool>,
    snapshot: HashMap<i32, NodeRecord>,
}

impl ActivationGuard<'_> {
    /// The registry as frozen at the start of the activation.
    pub fn nodes(&self) -> &HashMap<i32, NodeRecord> {
        &self.snapshot
    }

    /// Flips the flag. Everything observable behind the flag must be
    /// initialized before calling this.
    pub fn commit(mut self) {
        *self.flag = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i32) -> NodeRecord {
        NodeRecord::new(
            id,
            Point3::new(id as f64, 0.0, 0.0),
            format!("tcp://127.0.0.1:2500{id}"),
        )
    }

    #[tokio::test]
    async fn test_add_and_snapshot() {
        let store = NetworkStore::new();
        assert!(store.add_node(record(1)).await);
        assert!(store.add_node(record(2)).await);

        let nodes = store.get_nodes_info().await;
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[&1].reply_address, "tcp://127.0.0.1:25001");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = NetworkStore::new();
        assert!(store.add_node(record(1)).await);
        assert!(!store.add_node(record(1)).await);
        assert_eq!(store.get_nodes_info().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_after_activation_rejected() {
        let store = NetworkStore::new();
        assert!(store.add_node(record(1)).await);

        store.begin_activation().await.unwrap().commit();
        assert!(store.get_is_active().await);

        assert!(!store.add_node(record(2)).await);
        assert_eq!(store.get_nodes_info().await.len(), 1);
    }

    #[tokio::test]
    async fn test_flag_accessors() {
        let store = NetworkStore::new();
        assert!(!store.get_is_active().await);

        store.set_is_active(true).await;
        assert!(store.get_is_active().await);
    }

    #[tokio::test]
    async fn test_second_activation_refused() {
        let store = NetworkStore::new();
        store.begin_activation().await.unwrap().commit();
        assert!(store.begin_activation().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_guard_leaves_store_inactive() {
        let store = NetworkStore::new();
        {
            let guard = store.begin_activation().await.unwrap();
            assert!(guard.nodes().is_empty());
            // dropped without commit
        }
        assert!(!store.get_is_active().await);
        assert!(store.begin_activation().await.is_some());
    }
}
