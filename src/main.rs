mod config;
mod dashboard;
mod error;
mod jobs;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::dashboard::{RenderOptions, Source, render};
use crate::loader::DataCache;
use crate::pipeline::{Pipeline, RunOutcome};

#[derive(Parser)]
#[command(name = "listing-scraper", about = "Product and job listing scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape the configured listing page and save it as CSV
    Scrape,

    /// Search jobs through the remote actor and save them as Excel
    Jobs {
        /// Job title to search for (prompted for when omitted)
        #[arg(short, long)]
        title: Option<String>,

        /// Give up on the remote run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Summarise a saved listing file
    Dashboard {
        /// CSV or XLSX file (default: dashboard.data_path)
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(long)]
        min_price: Option<f64>,

        #[arg(long)]
        max_price: Option<f64>,

        #[arg(long)]
        min_rating: Option<f64>,

        /// Re-render every N seconds until Ctrl-C
        #[arg(long)]
        watch: Option<u64>,
    },
}

/// Exit status for a job search stopped by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "listing_scraper=info,warn",
        1 => "listing_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Scrape => {
            let _t = utils::Timer::start("Listing scrape");
            match Pipeline::new(config).run_listings().await? {
                RunOutcome::Written { path, rows } => {
                    println!("✅ {} products saved to {}", rows, path.display());
                }
                RunOutcome::NoData => {
                    println!("⚠️ No products found. Try changing the URL or check if the request was blocked.");
                }
            }
        }

        Command::Jobs { title, timeout } => {
            let title = match title {
                Some(t) => t,
                None => prompt("Enter job title: ")?,
            };
            if title.trim().is_empty() {
                bail!("A job title is required");
            }

            let _t = utils::Timer::start(format!("Job search {:?}", title));
            println!("\nFetching jobs... Please wait, it may take up to a minute.\n");

            let deadline = timeout.map(|s| tokio::time::Instant::now() + Duration::from_secs(s));
            let pipeline = Pipeline::new(config);

            let outcome = tokio::select! {
                res = pipeline.run_jobs(title.trim(), deadline) => Some(res),
                _ = tokio::signal::ctrl_c() => None,
            };

            let code = report_jobs(title.trim(), outcome);
            if code != 0 {
                return Ok(ExitCode::from(code));
            }
        }

        Command::Dashboard {
            file,
            min_price,
            max_price,
            min_rating,
            watch,
        } => {
            let path = file.unwrap_or_else(|| config.dashboard.data_path.clone());
            let opts = RenderOptions {
                min_price,
                max_price,
                min_rating,
                histogram_bins: config.dashboard.histogram_bins,
            };
            let mut cache = DataCache::new();

            loop {
                let rows = cache
                    .get_or_load(&path)
                    .with_context(|| format!("Failed to load {:?}", path))?;
                let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
                let label = path.display().to_string();
                let source = Source {
                    label: &label,
                    modified,
                };

                let mut out = std::io::stdout().lock();
                render(&mut out, &rows, &source, &opts)?;
                out.flush()?;
                drop(out);

                let Some(secs) = watch else { break };
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(secs.max(1))) => {}
                    _ = tokio::signal::ctrl_c() => break,
                }
                println!();
            }
            info!("Dashboard closed");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Print the result of a job search and pick the exit status. `None` means
/// the search was interrupted.
fn report_jobs(title: &str, outcome: Option<Result<RunOutcome>>) -> u8 {
    match outcome {
        Some(Ok(RunOutcome::Written { path, rows })) => {
            println!("\nSaved {} cleaned jobs to {}", rows, path.display());
            0
        }
        Some(Ok(RunOutcome::NoData)) => {
            println!("\nNo jobs found for {:?}.", title);
            0
        }
        Some(Err(e)) => {
            error!("{:#}", e);
            println!("\n❌ {:#}", e);
            1
        }
        None => {
            warn!("Interrupted, remote run left as is");
            EXIT_INTERRUPTED
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}
