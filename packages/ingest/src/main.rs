#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the DIME enrichment tool.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use dime_cli_utils::IndicatifProgress;
use dime_ingest::{
    IngestOptions, all_datasets, app_token_from_env, resolve_dataset, snapshot, snapshot_path,
};

#[derive(Parser)]
#[command(name = "dime_ingest", about = "Municipal facility enrichment tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, geocode and write the enriched snapshot (default)
    Enrich(EnrichArgs),
    /// List the embedded dataset definitions
    Datasets,
    /// Print counts from an existing snapshot
    Summary {
        /// Snapshot to read (overrides `DIME_SNAPSHOT_PATH`)
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
struct EnrichArgs {
    /// Maximum number of records to fetch (overrides the dataset limit)
    #[arg(long)]
    limit: Option<u32>,
    /// Dataset identifier (overrides `DIME_DATASET`)
    #[arg(long)]
    dataset: Option<String>,
    /// Snapshot output path (overrides `DIME_SNAPSHOT_PATH`)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Pause after each record's geocode attempt, in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = dime_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command.unwrap_or_else(|| Commands::Enrich(EnrichArgs::default())) {
        Commands::Enrich(args) => {
            let options = IngestOptions {
                dataset: resolve_dataset(args.dataset)?,
                app_token: app_token_from_env(),
                output: snapshot_path(args.output),
                limit: args.limit,
                pacing: args
                    .pacing_ms
                    .map_or(dime_ingest::DEFAULT_PACING, Duration::from_millis),
            };

            let bar = IndicatifProgress::records_bar(&multi, &options.dataset);
            let summary = dime_ingest::run(&options, bar).await?;

            println!();
            println!("Enrichment complete in {:.1}s", summary.elapsed.as_secs_f64());
            println!("  Records:            {}", summary.total);
            println!("  Addresses found:    {}", summary.addresses_found);
            println!("  Addresses missing:  {}", summary.addresses_missing);
            println!("  Without coordinate: {}", summary.unlocatable);
            println!("  Zones detected:     {}", summary.zones_detected);
            println!("  Snapshot:           {}", options.output.display());
        }
        Commands::Datasets => {
            let datasets = all_datasets();
            println!("{:<12} {:<24} NAME", "ID", "MUNICIPALITY");
            println!("{}", "-".repeat(72));
            for dataset in &datasets {
                println!(
                    "{:<12} {:<24} {}",
                    dataset.id(),
                    dataset.municipality,
                    dataset.name()
                );
            }
            println!("\n{} datasets configured", datasets.len());
        }
        Commands::Summary { input } => {
            let path = snapshot_path(input);
            let Some(snapshot) = snapshot::load(&path)? else {
                log::error!("No snapshot at {}", path.display());
                return Err(format!("snapshot not found: {}", path.display()).into());
            };
            let summary = snapshot.summarize();
            println!("Snapshot: {}", path.display());
            println!("  Records:           {}", summary.total);
            println!("  Addresses found:   {}", summary.addresses_found);
            println!("  Addresses missing: {}", summary.addresses_missing);
            println!("  Zones detected:    {}", summary.zones_detected);
        }
    }

    Ok(())
}
