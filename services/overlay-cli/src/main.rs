//! precip-overlay
//!
//! Renders, animates and queries precipitation grids from local files or
//! the grid API.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::error;

use overlay_cli::cli::{Cli, Command};
use overlay_cli::commands;
use overlay_cli::logging::init_tracing;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    if let Err(e) = run(cli.command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Render(args) => print(&commands::render(&args).await?),
        Command::Point(args) => print(&commands::point(&args).await?),
        Command::Area(args) => print(&commands::area(&args).await?),
        Command::Legend(args) => print(&commands::legend(&args)?),
        Command::Info(args) => print(&commands::info(&args).await?),
        Command::Convert(args) => print(&commands::convert(&args)?),
        Command::Periods(args) => print(&commands::periods(&args).await?),
        Command::Times(args) => print(&commands::times(&args).await?),
        Command::Animate(args) => print(&commands::animate(&args).await?),
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
