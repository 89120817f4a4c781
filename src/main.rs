mod api;
mod cache;
mod cli;
mod config;
mod error;
mod models;
mod pipeline;
mod validator;

use clap::Parser;
use cli::{App, Cli};
use colored::*;
use error::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    info!("Initializing pollution report app...");
    let app = match App::new() {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {:?}", e);
            println!(
                "{}",
                "Error: Failed to initialize application. Check logs.".red()
            );
            return Err(e);
        },
    };

    if let Err(e) = app.run_command(cli.command).await {
        error!("Command execution failed: {:?}", e);
        println!(
            "{} {}",
            "Error executing command:".red(),
            e.to_string().red()
        );
        return Err(e);
    }

    Ok(())
}
