//! Phonescout CLI — phone number carrier and line-type lookups.
//!
//! Drives a local WebDriver session against phonevalidator.com for single
//! numbers or whole CSV batches and writes a validated-numbers report.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
