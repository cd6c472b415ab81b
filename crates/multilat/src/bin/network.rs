//! Network coordinator binary. Requires the `cli` feature.

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = multilat::cli::network::Args::parse();
    multilat::cli::network::execute(args).await
}
