use std::collections::HashSet;
use std::sync::Arc;

use multilat::coordinator::{NetworkStore, NodeRecord};
use multilat_core::Point3;

// =============================================================================
// HELPERS
// =============================================================================

fn record(id: i32) -> NodeRecord {
    NodeRecord::new(
        id,
        Point3::new(id as f64, 0.0, 0.0),
        format!("tcp://127.0.0.1:25{id:03}"),
    )
}

// =============================================================================
// REGISTRY INVARIANTS
// =============================================================================

#[tokio::test]
async fn duplicate_ids_never_enter_the_registry() {
    let store = NetworkStore::new();

    assert!(store.add_node(record(1)).await);
    assert!(!store.add_node(record(1)).await);
    assert!(!store.add_node(record(1)).await);

    assert_eq!(store.get_nodes_info().await.len(), 1);
}

#[tokio::test]
async fn concurrent_distinct_adds_all_land() {
    let store = Arc::new(NetworkStore::new());

    let mut handles = Vec::new();
    for id in 1..=32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.add_node(record(id)).await }));
    }

    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let nodes = store.get_nodes_info().await;
    assert_eq!(nodes.len(), 32);
}

#[tokio::test]
async fn concurrent_adds_of_same_id_admit_exactly_one() {
    let store = Arc::new(NetworkStore::new());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.add_node(record(7)).await }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(store.get_nodes_info().await.len(), 1);
}

// =============================================================================
// ACTIVATION SEMANTICS
// =============================================================================

#[tokio::test]
async fn snapshot_is_frozen_at_activation() {
    let store = Arc::new(NetworkStore::new());

    for id in 1..=5 {
        assert!(store.add_node(record(id)).await);
    }

    store.begin_activation().await.unwrap().commit();
    let frozen: HashSet<i32> = store.get_nodes_info().await.into_keys().collect();
    assert_eq!(frozen.len(), 5);

    // Post-activation registrations must all bounce off.
    let mut handles = Vec::new();
    for id in 6..=20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.add_node(record(id)).await }));
    }
    for handle in handles {
        assert!(!handle.await.unwrap());
    }

    // Every later snapshot observes the frozen set.
    for _ in 0..10 {
        let now: HashSet<i32> = store.get_nodes_info().await.into_keys().collect();
        assert_eq!(now, frozen);
    }
}

#[tokio::test]
async fn adds_racing_activation_are_linearizable() {
    let store = Arc::new(NetworkStore::new());

    let mut add_handles = Vec::new();
    for id in 1..=24 {
        let store = Arc::clone(&store);
        add_handles.push(tokio::spawn(async move {
            (id, store.add_node(record(id)).await)
        }));
    }

    let activator = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_micros(200)).await;
            store.begin_activation().await.unwrap().commit();
        })
    };

    let mut results = Vec::new();
    for handle in add_handles {
        results.push(handle.await.unwrap());
    }
    activator.await.unwrap();

    // An accepted add is visible in the post-activation registry; a
    // rejected one never is.
    let registered: HashSet<i32> = store.get_nodes_info().await.into_keys().collect();
    for (id, accepted) in results {
        assert_eq!(
            registered.contains(&id),
            accepted,
            "node {id}: accepted={accepted} but registry disagrees"
        );
    }
}

#[tokio::test]
async fn at_most_one_activation_succeeds() {
    let store = Arc::new(NetworkStore::new());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            match store.begin_activation().await {
                Some(guard) => {
                    guard.commit();
                    true
                }
                None => false,
            }
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    assert!(store.get_is_active().await);
}

#[tokio::test]
async fn abandoned_activation_can_be_retried() {
    let store = NetworkStore::new();
    assert!(store.add_node(record(1)).await);

    {
        let guard = store.begin_activation().await.unwrap();
        assert_eq!(guard.nodes().len(), 1);
        // Dropped without commit, e.g. after a failed dealer connect.
    }

    assert!(!store.get_is_active().await);
    assert!(store.add_node(record(2)).await, "store must still accept nodes");

    let guard = store.begin_activation().await.unwrap();
    assert_eq!(guard.nodes().len(), 2);
    guard.commit();
    assert!(store.get_is_active().await);
}
