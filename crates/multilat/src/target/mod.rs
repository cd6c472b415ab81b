//! The Target role: a trajectory updater advancing the true position
//! at a fixed rate, and an RPC endpoint serving it.

mod trajectory;

pub use trajectory::Trajectory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use multilat_core::wire::{PositionResponse, TargetRequest};
use multilat_core::{MultilatError, Point3, Result};

use crate::config::TargetConfig;
use crate::net::RouterEndpoint;

pub struct TargetService {
    inner: Arc<TargetInner>,
    /// Taken by the updater task on start.
    trajectory: Mutex<Option<Trajectory>>,
    updater_handle: RwLock<Option<JoinHandle<()>>>,
    serve_handle: RwLock<Option<JoinHandle<()>>>,
}

struct TargetInner {
    config: TargetConfig,
    position: RwLock<Point3>,
    router: RouterEndpoint,
    running: AtomicBool,
}

impl TargetService {
    /// Loads the trajectory up front; a malformed document is fatal
    /// before any socket is bound.
    pub fn new(config: TargetConfig) -> Result<Self> {
        let trajectory = Trajectory::from_json_file(&config.trajectory_path, config.loop_path)?;
        Ok(Self::with_trajectory(config, trajectory))
    }

    pub fn with_trajectory(config: TargetConfig, trajectory: Trajectory) -> Self {
        let inner = Arc::new(TargetInner {
            config,
            position: RwLock::new(trajectory.current()),
            router: RouterEndpoint::new(),
            running: AtomicBool::new(false),
        });

        Self {
            inner,
            trajectory: Mutex::new(Some(trajectory)),
            updater_handle: RwLock::new(None),
            serve_handle: RwLock::new(None),
        }
    }

    pub async fn current_position(&self) -> Point3 {
        *self.inner.position.read().await
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Binds the control socket and starts the updater and serve
    /// loops. Returns the resolved control endpoint.
    pub async fn start(&self) -> Result<String> {
        let Some(trajectory) = self.trajectory.lock().await.take() else {
            return Err(MultilatError::config("target service already started"));
        };

        let endpoint = self.inner.router.bind(&self.inner.config.control_bind).await?;
        self.inner.running.store(true, Ordering::SeqCst);

        let updater_handle = self.spawn_updater(trajectory);
        let serve_handle = self.spawn_serve_loop();

        *self.updater_handle.write().await = Some(updater_handle);
        *self.serve_handle.write().await = Some(serve_handle);

        tracing::info!(control = %endpoint, "target service started");
        Ok(endpoint)
    }

    pub async fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.updater_handle.write().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.serve_handle.write().await.take() {
            handle.abort();
        }

        tracing::info!("target service stopped");
    }

    fn spawn_updater(&self, mut trajectory: Trajectory) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tracing::debug!("trajectory updater started");

            let period = Duration::from_secs_f64(1.0 / inner.config.update_frequency_hz);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            while inner.running.load(Ordering::SeqCst) {
                interval.tick().await;

                let next = trajectory.advance();
                *inner.position.write().await = next;

                tracing::trace!(x = next.x, y = next.y, z = next.z, "position advanced");
            }

            tracing::debug!("trajectory updater stopped");
        })
    }

    fn spawn_serve_loop(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tracing::debug!("target serve loop started");

            while inner.running.load(Ordering::SeqCst) {
                match inner.router.recv().await {
                    Ok((identity, payload)) => {
                        let request: TargetRequest = match serde_json::from_slice(&payload) {
                            Ok(request) => request,
                            Err(e) => {
                                tracing::debug!(error = %e, "undecodable target request dropped");
                                continue;
                            }
                        };

                        let TargetRequest::GetPosition { node_id } = request;
                        let position = inner.position.read().await;
                        let response = PositionResponse::ok(position.to_wire());
                        drop(position);

                        tracing::trace!(node_id, "position served");

                        let reply = match serde_json::to_vec(&response) {
                            Ok(bytes) => bytes,
                            Err(e) => {
                                tracing::warn!(error = %e, "position reply serialization failed");
                                continue;
                            }
                        };

                        if let Err(e) = inner.router.send_reply(identity, reply).await {
                            tracing::warn!(error = %e, "position reply failed");
                        }
                    }
                    Err(e) => {
                        if inner.running.load(Ordering::SeqCst) {
                            tracing::warn!(error = %e, "target recv error");
                            tokio::time::sleep(Duration::from_millis(500)).await;
                        }
                    }
                }
            }

            tracing::debug!("target serve loop stopped");
        })
    }
}
