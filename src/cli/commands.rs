//! CLI commands and rendering.
//!
//! Two thin adapters over the core pipeline: `refresh` runs a full fetch
//! cycle and caches the report (the scheduled job's work), `report` prints
//! the cached report without recomputing anything (the read endpoint's work).

use crate::cache::{Cache, MemoryCache};
use crate::config::AppConfig;
use crate::error::Result;
use crate::models::Report;
use crate::pipeline::Pipeline;
use clap::{Args, Parser, Subcommand};
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use std::sync::Arc;
use tracing::info;

/// CLI tool building a worst-city-per-country air pollution report
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch upstream data, rebuild the report and cache it
    Refresh,

    /// Print the currently cached report (never recomputes)
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Emit the raw report envelope as JSON
    #[arg(long)]
    pub json: bool,
}

/// CLI application state.
pub struct App {
    pipeline: Pipeline,
}

impl App {
    /// Loads configuration from the environment and wires the pipeline to
    /// an in-process cache store.
    pub fn new() -> Result<Self> {
        let config = AppConfig::from_env()?;
        let cache = Cache::new(Arc::new(MemoryCache::new()));
        let pipeline = Pipeline::new(cache, config)?;
        Ok(Self { pipeline })
    }

    /// Runs the selected command.
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Refresh => self.refresh().await,
            Commands::Report(args) => self.show_report(args.json),
        }
    }

    async fn refresh(&self) -> Result<()> {
        info!("Starting report refresh cycle");
        let report = self.pipeline.refresh_report().await?;
        println!(
            "{} {} entries cached at {}",
            "Report refreshed:".green(),
            report.count,
            report.generated_at.to_rfc3339()
        );
        render_table(&report);
        Ok(())
    }

    fn show_report(&self, as_json: bool) -> Result<()> {
        let Some(report) = self.pipeline.cached_report() else {
            println!("{}", "No report cached yet. Run `refresh` first.".yellow());
            return Ok(());
        };

        if as_json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!(
            "Generated at {} ({} entries)",
            report.generated_at.to_rfc3339(),
            report.count
        );
        render_table(&report);
        Ok(())
    }
}

fn render_table(report: &Report) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Country", "City", "Pollution", "Description"]);

    for entry in &report.data {
        table.add_row(vec![
            Cell::new(&entry.country),
            Cell::new(&entry.city),
            Cell::new(format!("{:.2}", entry.pollution)),
            Cell::new(&entry.description),
        ]);
    }

    println!("{table}");
}
