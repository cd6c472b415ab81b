//! `multilat-node`: runs one sensor node.

use std::path::PathBuf;

use clap::Parser;
use tokio::signal;

use crate::config::NodeConfig;
use crate::sensor::SensorNode;

use super::logging::{self, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "multilat-node", version, about = "Multilateration sensor node")]
pub struct Args {
    #[arg(short, long, default_value = "node.toml")]
    pub config: PathBuf,

    #[arg(long, env = "MULTILAT_NODE_ID")]
    pub id: Option<i32>,

    /// Sensor position as "x,y,z".
    #[arg(long, value_delimiter = ',', num_args = 3)]
    pub position: Option<Vec<f64>>,

    #[arg(long, env = "MULTILAT_ROUTER_BIND")]
    pub router_bind: Option<String>,

    #[arg(long, env = "MULTILAT_NETWORK_ADDR")]
    pub network_addr: Option<String>,

    #[arg(long, env = "MULTILAT_TARGET_ADDR")]
    pub target_addr: Option<String>,

    #[arg(long)]
    pub sensor_frequency_hz: Option<f64>,

    #[arg(long)]
    pub noise_var: Option<f64>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

pub async fn execute(args: Args) -> anyhow::Result<()> {
    let mut config = if args.config.exists() {
        NodeConfig::from_file(&args.config)?
    } else {
        let id = args
            .id
            .ok_or_else(|| anyhow::anyhow!("--id is required without a config file"))?;
        NodeConfig::minimal(id)
    };

    if let Some(id) = args.id {
        config.id = id;
    }
    if let Some(position) = args.position {
        config.position = [position[0], position[1], position[2]];
    }
    if let Some(router_bind) = args.router_bind {
        config.router_bind = router_bind;
    }
    if let Some(network_addr) = args.network_addr {
        config.network_addr = network_addr;
    }
    if let Some(target_addr) = args.target_addr {
        config.target_addr = target_addr;
    }
    if let Some(frequency_hz) = args.sensor_frequency_hz {
        config.sensor.frequency_hz = frequency_hz;
    }
    if let Some(noise_var) = args.noise_var {
        config.sensor.noise_var = noise_var;
    }

    config.validate()?;

    logging::init_logging(
        &format!("node-{}", config.id),
        LoggingConfig {
            verbose: args.verbose,
            log_dir: args.log_dir,
            ..Default::default()
        },
    )?;

    tracing::info!(
        id = config.id,
        router = %config.router_bind,
        network = %config.network_addr,
        target = %config.target_addr,
        "starting sensor node"
    );

    let node = SensorNode::new(config);
    node.start().await?;

    signal::ctrl_c().await?;

    tracing::info!("shutdown signal received");
    node.stop().await;

    Ok(())
}
