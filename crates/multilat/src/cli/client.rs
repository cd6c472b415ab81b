//! `multilat-client`: drives the network and tracks the target.

use std::path::PathBuf;

use clap::Parser;
use tokio::signal;

use crate::config::ClientConfig;
use crate::tracker::ClientTracker;

use super::logging::{self, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "multilat-client", version, about = "Multilateration tracking client")]
pub struct Args {
    #[arg(short, long, default_value = "client.toml")]
    pub config: PathBuf,

    #[arg(long, env = "MULTILAT_NETWORK_ADDR")]
    pub network_addr: Option<String>,

    #[arg(long, env = "MULTILAT_CLIENT_ID")]
    pub client_id: Option<i32>,

    #[arg(long)]
    pub frequency_hz: Option<f64>,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

pub async fn execute(args: Args) -> anyhow::Result<()> {
    let mut config = if args.config.exists() {
        ClientConfig::from_file(&args.config)?
    } else {
        ClientConfig::default()
    };

    if let Some(network_addr) = args.network_addr {
        config.network_addr = network_addr;
    }
    if let Some(client_id) = args.client_id {
        config.client_id = client_id;
    }
    if let Some(frequency_hz) = args.frequency_hz {
        config.frequency_hz = frequency_hz;
    }
    if let Some(output) = args.output {
        config.output_path = output.to_string_lossy().into_owned();
    }

    config.validate()?;

    logging::init_logging(
        "client",
        LoggingConfig {
            verbose: args.verbose,
            log_dir: args.log_dir,
            ..Default::default()
        },
    )?;

    tracing::info!(
        network = %config.network_addr,
        client_id = config.client_id,
        frequency_hz = config.frequency_hz,
        output = %config.output_path,
        "starting tracking client"
    );

    let mut tracker = ClientTracker::connect(config).await?;
    tracker.start_network().await?;

    tracker
        .run(async {
            let _ = signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
