//! entsoe CLI: fetch Transparency Platform data by free-text names.
//!
//! Datasets, areas and parameter codes are resolved against a catalog
//! scraped from the published API guide.

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
