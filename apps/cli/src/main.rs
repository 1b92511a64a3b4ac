//! wikimirror CLI: mirror a wiki project into a publishable snapshot.
//!
//! Fetches titles and pages from the origin, applies the site's publication
//! rules and prints the result as JSON.

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
