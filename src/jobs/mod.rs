//! Job search through a remote scraping actor: submit a run, wait for it,
//! download its dataset and flatten each item into a `JobRecord`.

pub mod client;
pub mod poll;

use crate::config::JobsConfig;
use crate::error::{Result, ScrapeError};
use crate::models::{JobRecord, RawJobItem};
use crate::scraper::cleaner::{html_to_text, json_scalar_text};
use std::path::{Path, PathBuf};
use tokio::time::Instant;
use tracing::info;
use url::Url;

use self::client::{ActorClient, RunInput, StartUrl};
use self::poll::{PollPolicy, RunState, wait_for_terminal};

pub struct JobScraper {
    client: ActorClient,
    policy: PollPolicy,
    search_url: String,
    max_results: u32,
}

impl JobScraper {
    pub fn new(config: &JobsConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: ActorClient::new(config)?,
            policy: config.poll_policy(),
            search_url: config.search_url.clone(),
            max_results: config.max_results,
        })
    }

    fn run_input(&self, title: &str) -> Result<RunInput> {
        let url = Url::parse_with_params(&self.search_url, &[("q", title)])?;
        Ok(RunInput {
            start_urls: vec![StartUrl { url: url.into() }],
            max_results: self.max_results,
        })
    }

    /// Run a search for `title` and return the cleaned postings.
    ///
    /// Any terminal state other than `Succeeded` comes back as
    /// `ScrapeError::RemoteJob`.
    pub async fn search(&self, title: &str, deadline: Option<Instant>) -> Result<Vec<JobRecord>> {
        let input = self.run_input(title)?;
        let submitted = self.client.start_run(&input).await?;
        info!("Submitted run {} for {:?}", submitted.run_id, title);

        let run_id = submitted.run_id.clone();
        let finished = if submitted.state.is_terminal() {
            submitted
        } else {
            wait_for_terminal(&self.policy, deadline, || self.client.run_status(&run_id)).await?
        };

        if finished.state != RunState::Succeeded {
            return Err(ScrapeError::RemoteJob {
                run_id: finished.run_id,
                state: finished.state,
            });
        }

        let dataset_id = finished.dataset_id.ok_or_else(|| {
            ScrapeError::Protocol(format!("run {} has no default dataset", finished.run_id))
        })?;

        let items = self.client.dataset_items(&dataset_id).await?;
        info!("Dataset {}: {} items", dataset_id, items.len());
        Ok(items.into_iter().map(clean_job).collect())
    }
}

/// Flatten one actor item.
pub fn clean_job(item: RawJobItem) -> JobRecord {
    JobRecord {
        title: item.position_name,
        company: item.company,
        location: item.location,
        salary: item.salary,
        job_type: item.job_type.map(|t| t.join(", ")).unwrap_or_default(),
        rating: item.rating.as_ref().and_then(json_scalar_text),
        reviews: item.reviews_count.as_ref().and_then(json_scalar_text),
        posted: item.posted_at,
        apply_link: item.external_apply_link.or(item.url),
        description: item.description_html.as_deref().map(html_to_text).unwrap_or_default(),
    }
}

/// `{dir}/{title}_cleaned_jobs.xlsx`, with path separators in the title replaced.
pub fn output_path(dir: &Path, title: &str) -> PathBuf {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    dir.join(format!("{}_cleaned_jobs.xlsx", stem))
}
