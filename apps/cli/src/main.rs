//! DocPilot CLI — keeps onboarding docs synchronized with the repo.
//!
//! Generates task lists, FAQs, and quick-start guides from repository
//! documentation and keeps them current through hook triggers, without
//! overwriting human edits.

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
