//! The Node role: one-shot registration, a periodic range sensor, and
//! the data-plane distance router.

mod reading;

pub use reading::SensorReading;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand_distr::{Distribution, Normal};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use multilat_core::wire::{
    self, AddNodeResponse, NetworkRequest, PositionResponse, PositionStatus, RegisterStatus,
    TargetRequest, DISTANCE_REQUEST,
};
use multilat_core::{MultilatError, Point3, Result};

use crate::config::NodeConfig;
use crate::net::{RouterEndpoint, RpcClient};

pub struct SensorNode {
    inner: Arc<NodeInner>,
    router_handle: RwLock<Option<JoinHandle<()>>>,
    sensor_handle: RwLock<Option<JoinHandle<()>>>,
}

struct NodeInner {
    config: NodeConfig,
    reading: SensorReading,
    router: RouterEndpoint,
    running: AtomicBool,
}

impl SensorNode {
    pub fn new(config: NodeConfig) -> Self {
        let inner = Arc::new(NodeInner {
            config,
            reading: SensorReading::new(),
            router: RouterEndpoint::new(),
            running: AtomicBool::new(false),
        });

        Self {
            inner,
            router_handle: RwLock::new(None),
            sensor_handle: RwLock::new(None),
        }
    }

    pub fn id(&self) -> i32 {
        self.inner.config.id
    }

    pub fn position(&self) -> Point3 {
        self.inner.config.position.into()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Binds the distance router, registers with the coordinator, and
    /// starts the background loops. A rejected registration (duplicate
    /// id or already-active network) is fatal for the node.
    pub async fn start(&self) -> Result<()> {
        let reply_address = self.inner.router.bind(&self.inner.config.router_bind).await?;
        self.register(&reply_address).await?;

        self.inner.running.store(true, Ordering::SeqCst);

        let router_handle = self.spawn_distance_router();
        let sensor_handle = self.spawn_sensor_loop();

        *self.router_handle.write().await = Some(router_handle);
        *self.sensor_handle.write().await = Some(sensor_handle);

        tracing::info!(
            id = self.inner.config.id,
            router = %reply_address,
            "sensor node started"
        );

        Ok(())
    }

    pub async fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.router_handle.write().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.sensor_handle.write().await.take() {
            handle.abort();
        }

        tracing::info!(id = self.inner.config.id, "sensor node stopped");
    }

    async fn register(&self, reply_address: &str) -> Result<()> {
        let config = &self.inner.config;
        let timeout = Duration::from_millis(config.request_timeout_ms);

        let rpc = RpcClient::connect(&config.network_addr, timeout).await?;
        let position = Point3::from(config.position).to_wire();
        let request = NetworkRequest::AddNode {
            node_id: config.id,
            x: position[0],
            y: position[1],
            z: position[2],
            bind_address: reply_address.to_string(),
        };

        let response: AddNodeResponse = rpc.call(&request).await?;
        match response.status {
            RegisterStatus::Ok => {
                tracing::info!(id = config.id, "registered with coordinator");
                Ok(())
            }
            _ => Err(MultilatError::network(
                "registration rejected: duplicate id or network already active",
            )),
        }
    }

    fn spawn_distance_router(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tracing::debug!(id = inner.config.id, "distance router started");

            while inner.running.load(Ordering::SeqCst) {
                match inner.router.recv().await {
                    Ok((identity, payload)) => {
                        if payload != DISTANCE_REQUEST {
                            tracing::debug!(id = inner.config.id, "unknown payload dropped");
                            continue;
                        }

                        // No reading yet: stay silent, the round's poll
                        // timeout covers us.
                        let Some(distance) = inner.reading.latest().await else {
                            tracing::debug!(id = inner.config.id, "no reading yet");
                            continue;
                        };

                        let reply = wire::encode_distance(distance);
                        if let Err(e) = inner.router.send_reply(identity, reply).await {
                            tracing::warn!(id = inner.config.id, error = %e, "distance reply failed");
                        }
                    }
                    Err(e) => {
                        if inner.running.load(Ordering::SeqCst) {
                            tracing::warn!(id = inner.config.id, error = %e, "router recv error");
                            tokio::time::sleep(Duration::from_millis(500)).await;
                        }
                    }
                }
            }

            tracing::debug!(id = inner.config.id, "distance router stopped");
        })
    }

    fn spawn_sensor_loop(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tracing::debug!(id = inner.config.id, "sensor loop started");

            let period = Duration::from_secs_f64(1.0 / inner.config.sensor.frequency_hz);
            let timeout = Duration::from_millis(inner.config.request_timeout_ms);
            let noise = match Normal::new(0.0, inner.config.sensor.noise_var.sqrt()) {
                Ok(noise) => noise,
                Err(e) => {
                    tracing::error!(id = inner.config.id, error = %e, "invalid noise parameters");
                    return;
                }
            };

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let mut target: Option<RpcClient> = None;

            while inner.running.load(Ordering::SeqCst) {
                interval.tick().await;

                if target.is_none() {
                    match RpcClient::connect(&inner.config.target_addr, timeout).await {
                        Ok(client) => target = Some(client),
                        Err(e) => {
                            tracing::debug!(id = inner.config.id, error = %e, "target not reachable");
                            continue;
                        }
                    }
                }

                let Some(client) = target.as_ref() else {
                    continue;
                };

                let request = TargetRequest::GetPosition {
                    node_id: inner.config.id,
                };
                let response: PositionResponse = match client.call(&request).await {
                    Ok(response) => response,
                    Err(e) => {
                        // Keep the previous reading on a failed poll.
                        tracing::debug!(id = inner.config.id, error = %e, "target poll failed");
                        continue;
                    }
                };

                if response.status != PositionStatus::Ok {
                    tracing::debug!(id = inner.config.id, "target replied with error status");
                    continue;
                }

                let target_position =
                    Point3::from_wire([response.x, response.y, response.z]);
                let sensor_position = Point3::from(inner.config.position);

                let epsilon = {
                    let mut rng = rand::thread_rng();
                    noise.sample(&mut rng)
                };
                let distance = (sensor_position.distance_to(&target_position) + epsilon).max(0.0);

                inner.reading.store(distance).await;
            }

            tracing::debug!(id = inner.config.id, "sensor loop stopped");
        })
    }

    /// Latest measurement, mainly for tests and diagnostics.
    pub async fn latest_reading(&self) -> Option<f64> {
        self.inner.reading.latest().await
    }
}
