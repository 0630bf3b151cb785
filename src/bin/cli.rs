use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use football_fixtures::utils::dates::fetch_window;
use football_fixtures::{build_job_runner, init_tracing, Config, RunOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Fetch, enrich and store upcoming football fixtures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fetch job once
    Fetch {
        /// First day of the window (YYYY-MM-DD), defaults to today in UTC
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Number of days in the window
        #[arg(long)]
        days: Option<u32>,

        /// Where the output files are written
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Print the dates a fetch would cover
    Dates {
        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long, default_value = "3")]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Dates { from, days } => {
            for date in fetch_window(from.unwrap_or(today), days) {
                println!("{}", date);
            }
        }
        Commands::Fetch {
            from,
            days,
            data_dir,
        } => {
            let mut config = Config::from_env().context("Invalid configuration")?;
            if let Some(days) = days.filter(|d| *d > 0) {
                config.pipeline.window_days = days;
            }
            if let Some(dir) = data_dir {
                config.pipeline.data_dir = dir;
            }

            let start = from.unwrap_or(today);
            println!(
                "Fetching fixtures for {} day(s) from {}...\n",
                config.pipeline.window_days, start
            );

            let runner = build_job_runner(&config);
            match runner.try_run(start).await? {
                RunOutcome::NoFixtures => println!("No fixtures found, nothing written"),
                RunOutcome::Completed {
                    fixtures,
                    domestic,
                    international,
                    files,
                } => {
                    println!("Enriched {} fixtures", fixtures);
                    println!("  - {} domestic -> {}", domestic, files.domestic.display());
                    println!(
                        "  - {} international -> {}",
                        international,
                        files.international.display()
                    );
                }
            }
        }
    }

    Ok(())
}
