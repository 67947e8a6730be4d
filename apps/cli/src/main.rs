//! filmcatalog CLI: load and browse a TV series' filming-location catalog.
//!
//! Reloads the bundled season records into the content graph, mirrors them
//! into a local database, and answers listing and map-framing queries.

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
