//! # multilat
//!
//! A distributed sensor fleet that localizes a moving 3D target by
//! multilateration.
//!
//! Four roles cooperate over ZeroMQ:
//! - the **target** advertises its true trajectory position,
//! - **sensor nodes** poll the target and host a simulated range sensor,
//! - the **coordinator** registers nodes, scatter-gathers distance
//!   measurements over a dealer/router fabric, and solves the
//!   least-squares multilateration problem,
//! - the **client** drives the system and smooths the estimates with a
//!   Kalman filter.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use multilat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NetworkConfig::from_file("network.toml")?;
//!     let coordinator = Coordinator::new(config);
//!     coordinator.start().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli`: Enable the four role binaries with logging and config layering

pub mod config;
pub mod coordinator;
pub mod net;
pub mod sensor;
pub mod solver;
pub mod target;
pub mod tracker;

#[cfg(feature = "cli")]
pub mod cli;

pub use multilat_core::{MultilatError, Point3, Result};

pub mod prelude {
    pub use multilat_core::{MultilatError, Point3, Result};

    pub use crate::config::{ClientConfig, NetworkConfig, NodeConfig, TargetConfig};
    pub use crate::coordinator::Coordinator;
    pub use crate::sensor::SensorNode;
    pub use crate::target::TargetService;
    pub use crate::tracker::ClientTracker;
}
