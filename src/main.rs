use anyhow::{Context, Result};
use clap::Parser;
use presence_processor::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await.context("presence-processor failed")
}
