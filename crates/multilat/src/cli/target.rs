//! `multilat-target`: runs the Target trajectory service.

use std::path::PathBuf;

use clap::Parser;
use tokio::signal;

use crate::config::TargetConfig;
use crate::target::TargetService;

use super::logging::{self, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "multilat-target", version, about = "Multilateration moving target")]
pub struct Args {
    #[arg(short, long, default_value = "target.toml")]
    pub config: PathBuf,

    #[arg(long, env = "MULTILAT_TARGET_BIND")]
    pub control_bind: Option<String>,

    #[arg(long, env = "MULTILAT_TRAJECTORY")]
    pub trajectory: Option<PathBuf>,

    #[arg(long)]
    pub update_frequency_hz: Option<f64>,

    #[arg(long)]
    pub loop_path: Option<bool>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

pub async fn execute(args: Args) -> anyhow::Result<()> {
    let mut config = if args.config.exists() {
        TargetConfig::from_file(&args.config)?
    } else {
        let trajectory = args
            .trajectory
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("--trajectory is required without a config file"))?;
        TargetConfig::minimal(trajectory.to_string_lossy())
    };

    if let Some(control_bind) = args.control_bind {
        config.control_bind = control_bind;
    }
    if let Some(trajectory) = args.trajectory {
        config.trajectory_path = trajectory.to_string_lossy().into_owned();
    }
    if let Some(update_frequency_hz) = args.update_frequency_hz {
        config.update_frequency_hz = update_frequency_hz;
    }
    if let Some(loop_path) = args.loop_path {
        config.loop_path = loop_path;
    }

    config.validate()?;

    logging::init_logging(
        "target",
        LoggingConfig {
            verbose: args.verbose,
            log_dir: args.log_dir,
            ..Default::default()
        },
    )?;

    tracing::info!(
        control = %config.control_bind,
        trajectory = %config.trajectory_path,
        frequency_hz = config.update_frequency_hz,
        loop_path = config.loop_path,
        "starting target service"
    );

    // A malformed trajectory aborts here, before any socket is bound.
    let service = TargetService::new(config)?;
    service.start().await?;

    signal::ctrl_c().await?;

    tracing::info!("shutdown signal received");
    service.stop().await;

    Ok(())
}
