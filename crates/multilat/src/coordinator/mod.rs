//! The Network coordinator: registration/activation state machine,
//! scatter-gather distance collection, and position solving.

mod dealer;
mod store;

pub use dealer::DistanceDealer;
pub use store::{ActivationGuard, NetworkStore, NodeRecord};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;

use multilat_core::wire::{
    AddNodeResponse, GlobalPositionResponse, NetworkRequest, RegisterStatus, StartNetworkResponse,
    StartStatus,
};
use multilat_core::{MultilatError, Point3, Result};

use crate::config::NetworkConfig;
use crate::net::RouterEndpoint;

pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
    serve_handle: RwLock<Option<JoinHandle<()>>>,
}

struct CoordinatorInner {
    config: NetworkConfig,
    store: NetworkStore,
    dealer: Mutex<DistanceDealer>,
    solver: Mutex<crate::solver::MultilatSolver>,
    router: RouterEndpoint,
    workers: Arc<Semaphore>,
    running: AtomicBool,
}

impl Coordinator {
    pub fn new(config: NetworkConfig) -> Self {
        let poll_timeout = Duration::from_millis(config.poll_timeout_ms);
        let workers = Arc::new(Semaphore::new(config.workers));

        let inner = Arc::new(CoordinatorInner {
            config,
            store: NetworkStore::new(),
            dealer: Mutex::new(DistanceDealer::new(poll_timeout)),
            solver: Mutex::new(crate::solver::MultilatSolver::new()),
            router: RouterEndpoint::new(),
            workers,
            running: AtomicBool::new(false),
        });

        Self {
            inner,
            serve_handle: RwLock::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub async fn is_active(&self) -> bool {
        self.inner.store.get_is_active().await
    }

    /// Binds the control socket and starts serving. Returns the
    /// resolved control endpoint.
    pub async fn start(&self) -> Result<String> {
        let endpoint = self.inner.router.bind(&self.inner.config.control_bind).await?;
        self.inner.running.store(true, Ordering::SeqCst);

        let handle = self.spawn_serve_loop();
        *self.serve_handle.write().await = Some(handle);

        tracing::info!(
            control = %endpoint,
            workers = self.inner.config.workers,
            "coordinator started"
        );

        Ok(endpoint)
    }

    pub async fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.serve_handle.write().await.take() {
            handle.abort();
        }

        tracing::info!("coordinator stopped");
    }

    fn spawn_serve_loop(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tracing::debug!("coordinator serve loop started");

            while inner.running.load(Ordering::SeqCst) {
                let (identity, payload) = match inner.router.recv().await {
                    Ok(frames) => frames,
                    Err(e) => {
                        if inner.running.load(Ordering::SeqCst) {
                            tracing::warn!(error = %e, "control recv error");
                            tokio::time::sleep(Duration::from_millis(500)).await;
                        }
                        continue;
                    }
                };

                let request: NetworkRequest = match serde_json::from_slice(&payload) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable control request dropped");
                        continue;
                    }
                };

                let permit = match Arc::clone(&inner.workers).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break, // semaphore closed, shutting down
                };

                let task_inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    let _permit = permit;
                    let reply = Self::handle_request(&task_inner, request).await;
                    match reply {
                        Ok(bytes) => {
                            if let Err(e) = task_inner.router.send_reply(identity, bytes).await {
                                tracing::warn!(error = %e, "control reply failed");
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "request handler failed");
                        }
                    }
                });
            }

            tracing::debug!("coordinator serve loop stopped");
        })
    }

    async fn handle_request(inner: &CoordinatorInner, request: NetworkRequest) -> Result<Vec<u8>> {
        match request {
            NetworkRequest::AddNode {
                node_id,
                x,
                y,
                z,
                bind_address,
            } => {
                let record = NodeRecord::new(
                    node_id,
                    Point3::from_wire([x, y, z]),
                    bind_address,
                );
                let response = Self::handle_add_node(inner, record).await;
                Ok(serde_json::to_vec(&response)?)
            }
            NetworkRequest::StartNetwork { client_id } => {
                let response = Self::handle_start_network(inner, client_id).await;
                Ok(serde_json::to_vec(&response)?)
            }
            NetworkRequest::GetTargetGlobalPosition { client_id } => {
                let response = Self::handle_global_position(inner, client_id).await;
                Ok(serde_json::to_vec(&response)?)
            }
        }
    }

    async fn handle_add_node(inner: &CoordinatorInner, record: NodeRecord) -> AddNodeResponse {
        let node_id = record.node_id;
        let accepted = inner.store.add_node(record).await;

        if accepted {
            tracing::info!(node_id, "node registered");
            AddNodeResponse {
                status: RegisterStatus::Ok,
            }
        } else {
            let reason = if inner.store.get_is_active().await {
                MultilatError::AlreadyActive
            } else {
                MultilatError::DuplicateNode(node_id)
            };
            tracing::warn!(node_id, error = %reason, "registration rejected");
            AddNodeResponse {
                status: RegisterStatus::Error,
            }
        }
    }

    async fn handle_start_network(
        inner: &CoordinatorInner,
        client_id: i32,
    ) -> StartNetworkResponse {
        let Some(guard) = inner.store.begin_activation().await else {
            let n_nodes = inner.store.get_nodes_info().await.len() as i32;
            tracing::warn!(client_id, "start refused, network already active");
            return StartNetworkResponse {
                status: StartStatus::Error,
                n_nodes,
            };
        };

        let n_nodes = guard.nodes().len() as i32;

        // Dealer and solver must be fully initialized before the flag
        // flip becomes observable; the activation guard keeps every
        // other handler out until commit.
        let mut dealer = inner.dealer.lock().await;
        if let Err(e) = dealer.connect(guard.nodes()).await {
            tracing::warn!(client_id, error = %e, "activation failed");
            return StartNetworkResponse {
                status: StartStatus::Error,
                n_nodes,
            };
        }

        inner.solver.lock().await.set_sensor_positions(guard.nodes());
        guard.commit();

        tracing::info!(client_id, n_nodes, "network activated");
        StartNetworkResponse {
            status: StartStatus::Ok,
            n_nodes,
        }
    }

    async fn handle_global_position(
        inner: &CoordinatorInner,
        client_id: i32,
    ) -> GlobalPositionResponse {
        if !inner.store.get_is_active().await {
            tracing::debug!(client_id, error = %MultilatError::NotActive, "position query rejected");
            return GlobalPositionResponse::error();
        }

        let distances = inner.dealer.lock().await.request_distances().await;
        if distances.is_empty() {
            tracing::debug!(client_id, "empty gather round");
            return GlobalPositionResponse::error();
        }

        match inner.solver.lock().await.estimate_position(&distances) {
            Ok(estimate) => {
                tracing::debug!(
                    client_id,
                    x = estimate.x,
                    y = estimate.y,
                    z = estimate.z,
                    n = distances.len(),
                    "position estimated"
                );
                GlobalPositionResponse::ok(estimate.to_wire())
            }
            Err(e) => {
                tracing::warn!(client_id, error = %e, "estimation failed");
                GlobalPositionResponse::error()
            }
        }
    }
}
