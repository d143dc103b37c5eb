//! hood CLI
//!
//! Scaffolds migrations and config files, and runs the project's migrations
//! through its runner binary.

use clap::Parser;

use hood_migrate::cli::{dispatch, init_logging, HoodCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = HoodCli::parse();
    init_logging(cli.verbose)?;
    dispatch(&cli).await
}
