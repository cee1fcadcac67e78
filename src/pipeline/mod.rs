//! Pipeline orchestrator: ties sources → storage together.
//!
//! ## Run modes
//!
//! `run_listings()` — fetch the configured listing page, collect titled
//!   listings and write them to `scraper.output_path`.
//!
//! `run_jobs(title)` — run a remote job search and write the cleaned postings
//!   to `{jobs.output_dir}/{title}_cleaned_jobs.xlsx`.
//!
//! Both modes overwrite their output file, and neither writes anything when
//! the source comes back empty.

use crate::config::AppConfig;
use crate::jobs::{self, JobScraper};
use crate::models::Tabular;
use crate::scraper::{AmazonScraper, ListingSource};
use crate::storage::write_table;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::time::Instant;
use tracing::{info, warn};

pub struct Pipeline {
    config: AppConfig,
}

#[derive(Debug, PartialEq)]
pub enum RunOutcome {
    Written { path: PathBuf, rows: usize },
    NoData,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run_listings(&self) -> Result<RunOutcome> {
        let scraper = AmazonScraper::new(&self.config.scraper).context("Failed to build scraper")?;
        self.run_listings_with(&scraper).await
    }

    pub async fn run_listings_with(&self, source: &dyn ListingSource) -> Result<RunOutcome> {
        info!("=== Scraping listings ({}) ===", source.source_name());
        let records = source
            .scrape()
            .await
            .with_context(|| format!("{} scrape failed", source.source_name()))?;

        if records.is_empty() {
            warn!("No products found. Try changing the target URL or check whether the request was blocked.");
        }
        persist(&records, &self.config.scraper.output_path)
    }

    /// Remote failures (missing credentials, a run ending in anything but
    /// success) come back as errors wrapping `ScrapeError`.
    pub async fn run_jobs(&self, title: &str, deadline: Option<Instant>) -> Result<RunOutcome> {
        info!("=== Searching jobs for {:?} ===", title);
        let scraper = JobScraper::new(&self.config.jobs).context("Failed to build job client")?;

        let records = scraper
            .search(title, deadline)
            .await
            .with_context(|| format!("Job search for {:?} failed", title))?;

        if records.is_empty() {
            warn!("The run succeeded but returned no jobs for {:?}", title);
        }
        persist(&records, &jobs::output_path(&self.config.jobs.output_dir, title))
    }
}

fn persist<T: Tabular>(records: &[T], path: &Path) -> Result<RunOutcome> {
    if records.is_empty() {
        return Ok(RunOutcome::NoData);
    }
    let rows = write_table(records, path).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(RunOutcome::Written {
        path: path.to_path_buf(),
        rows,
    })
}
