//! Target service binary. Requires the `cli` feature.

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = multilat::cli::target::Args::parse();
    multilat::cli::target::execute(args).await
}
