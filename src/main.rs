use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod server;
mod storage;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before anything touches CONFIG
    dotenvy::dotenv().ok();

    utils::log::init();
    cli::Cli::parse().run().await?;
    Ok(())
}
