//! Sensor node binary. Requires the `cli` feature.

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = multilat::cli::node::Args::parse();
    multilat::cli::node::execute(args).await
}
