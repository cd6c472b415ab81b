//! Tracking client binary. Requires the `cli` feature.

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = multilat::cli::client::Args::parse();
    multilat::cli::client::execute(args).await
}
