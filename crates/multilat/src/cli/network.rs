//! `multilat-network`: runs the Network coordinator.

use std::path::PathBuf;

use clap::Parser;
use tokio::signal;

use crate::config::NetworkConfig;
use crate::coordinator::Coordinator;

use super::logging::{self, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "multilat-network", version, about = "Multilateration network coordinator")]
pub struct Args {
    #[arg(short, long, default_value = "network.toml")]
    pub config: PathBuf,

    #[arg(long, env = "MULTILAT_CONTROL_BIND")]
    pub control_bind: Option<String>,

    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long)]
    pub poll_timeout_ms: Option<u64>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

pub async fn execute(args: Args) -> anyhow::Result<()> {
    let mut config = if args.config.exists() {
        NetworkConfig::from_file(&args.config)?
    } else {
        NetworkConfig::default()
    };

    if let Some(control_bind) = args.control_bind {
        config.control_bind = control_bind;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(poll_timeout_ms) = args.poll_timeout_ms {
        config.poll_timeout_ms = poll_timeout_ms;
    }

    config.validate()?;

    logging::init_logging(
        "network",
        LoggingConfig {
            verbose: args.verbose,
            log_dir: args.log_dir,
            ..Default::default()
        },
    )?;

    tracing::info!(
        control = %config.control_bind,
        workers = config.workers,
        "starting network coordinator"
    );

    let coordinator = Coordinator::new(config);
    coordinator.start().await?;

    signal::ctrl_c().await?;

    tracing::info!("shutdown signal received");
    coordinator.stop().await;

    Ok(())
}
