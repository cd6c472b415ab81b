//! The Client role: drives the coordinator, smooths estimates with a
//! Kalman filter, and logs predictions to CSV.

mod kalman;

pub use kalman::KalmanTracker;

use std::fs::File;
use std::time::{Duration, Instant, SystemTime};

use multilat_core::wire::{
    GlobalPositionResponse, NetworkRequest, StartNetworkResponse, StartStatus, TrackingStatus,
};
use multilat_core::{Point3, Result};

use crate::config::ClientConfig;
use crate::net::RpcClient;

pub struct ClientTracker {
    config: ClientConfig,
    rpc: RpcClient,
    filter: KalmanTracker,
    writer: csv::Writer<File>,
    last_update: Option<Instant>,
}

impl ClientTracker {
    /// Connects to the coordinator and opens the prediction log.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let rpc = RpcClient::connect(&config.network_addr, timeout).await?;

        let file = File::create(&config.output_path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(["timestamp", "x", "y", "z"])
            .map_err(csv_error)?;
        writer.flush()?;

        let filter = KalmanTracker::new(&config.tracker);

        Ok(Self {
            config,
            rpc,
            filter,
            writer,
            last_update: None,
        })
    }

    /// Asks the coordinator to freeze registration and activate.
    /// `SS_ERROR` with a node count means someone else already started
    /// the network, which is fine for tracking.
    pub async fn start_network(&self) -> Result<(StartStatus, i32)> {
        let request = NetworkRequest::StartNetwork {
            client_id: self.config.client_id,
        };
        let response: StartNetworkResponse = self.rpc.call(&request).await?;

        match response.status {
            StartStatus::Ok => {
                tracing::info!(n_nodes = response.n_nodes, "network started");
            }
            _ => {
                tracing::warn!(n_nodes = response.n_nodes, "network was already active");
            }
        }

        Ok((response.status, response.n_nodes))
    }

    /// One tracking tick: request an estimate, feed the filter, log
    /// the prediction. `Ok(None)` when the coordinator replied with an
    /// error status.
    pub async fn tick(&mut self) -> Result<Option<Point3>> {
        let request = NetworkRequest::GetTargetGlobalPosition {
            client_id: self.config.client_id,
        };
        let response: GlobalPositionResponse = self.rpc.call(&request).await?;

        if response.status != TrackingStatus::Ok {
            tracing::debug!("no estimate this tick");
            return Ok(None);
        }

        let measurement = Point3::from_wire([response.x, response.y, response.z]);

        let now = Instant::now();
        let dt = self
            .last_update
            .map(|previous| now.duration_since(previous).as_secs_f64())
            .unwrap_or(0.0);
        self.last_update = Some(now);

        let prediction = self.filter.process_measurement(measurement, dt);
        self.write_prediction(&prediction)?;

        Ok(Some(prediction))
    }

    /// Runs the tracking loop until `stop` resolves. The cadence is
    /// independent of RPC latency; a late round just feeds the filter a
    /// larger dt.
    pub async fn run(&mut self, stop: impl std::future::Future<Output = ()>) -> Result<()> {
        let period = Duration::from_secs_f64(1.0 / self.config.frequency_hz);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!(error = %e, "tracking tick failed");
                    }
                }
            }
        }

        self.writer.flush()?;
        tracing::info!(output = %self.config.output_path, "tracker stopped");
        Ok(())
    }

    pub fn predicted_position(&self) -> Option<Point3> {
        self.filter.is_initialized().then(|| self.filter.position())
    }

    fn write_prediction(&mut self, prediction: &Point3) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        self.writer
            .write_record([
                format!("{}.{:03}", timestamp.as_secs(), timestamp.subsec_millis()),
                prediction.x.to_string(),
                prediction.y.to_string(),
                prediction.z.to_string(),
            ])
            .map_err(csv_error)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> multilat_core::MultilatError {
    multilat_core::MultilatError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}
