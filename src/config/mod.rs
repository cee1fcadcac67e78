use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::jobs::poll::{Backoff, PollPolicy};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Listing page scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Prepended to every extracted product href.
    #[serde(default = "default_site_origin")]
    pub site_origin: String,

    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// `None` keeps the HTTP client's own default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Remote actor (job search) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub actor_id: Option<String>,

    #[serde(default)]
    pub apify_token: Option<String>,

    /// Search page handed to the actor; the job title goes into `?q=`.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub exponential_backoff: bool,

    #[serde(default = "default_max_poll_interval_secs")]
    pub max_poll_interval_secs: u64,

    #[serde(default)]
    pub max_polls: Option<u32>,

    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: Option<u64>,
}

/// Dashboard configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default = "default_output_path")]
    pub data_path: PathBuf,

    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_target_url() -> String {
    "https://www.amazon.com/s?k=home+appliances".to_string()
}
fn default_site_origin() -> String {
    "https://www.amazon.com".to_string()
}
fn default_output_path() -> PathBuf {
    PathBuf::from("amazon_products.csv")
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36"
        .to_string()
}
fn default_accept_language() -> String {
    "en-US,en;q=0.5".to_string()
}
fn default_api_base() -> String {
    "https://api.apify.com/v2".to_string()
}
fn default_search_url() -> String {
    "https://www.indeed.com/jobs".to_string()
}
fn default_max_results() -> u32 {
    100
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_poll_interval_secs() -> u64 {
    5
}
fn default_max_poll_interval_secs() -> u64 {
    60
}
fn default_max_wait_secs() -> Option<u64> {
    Some(900)
}
fn default_histogram_bins() -> usize {
    10
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            site_origin: default_site_origin(),
            output_path: default_output_path(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            timeout_secs: None,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            actor_id: None,
            apify_token: None,
            search_url: default_search_url(),
            max_results: default_max_results(),
            output_dir: default_output_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            exponential_backoff: false,
            max_poll_interval_secs: default_max_poll_interval_secs(),
            max_polls: None,
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: default_output_path(),
            histogram_bins: default_histogram_bins(),
        }
    }
}

impl JobsConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_secs(self.poll_interval_secs);
        let backoff = if self.exponential_backoff {
            Backoff::Exponential {
                max_interval: Duration::from_secs(self.max_poll_interval_secs),
            }
        } else {
            Backoff::Fixed
        };

        PollPolicy {
            interval,
            backoff,
            max_attempts: self.max_polls,
            max_wait: self.max_wait_secs.map(Duration::from_secs),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("LISTINGS").separator("__"))
            .build()?;

        Self::from_sources(cfg, |key| std::env::var(key).ok())
    }

    /// Deserialize merged sources, then fill credentials through `lookup`.
    /// One bad value fails the whole load.
    fn from_sources(cfg: config::Config, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut app_cfg: AppConfig = cfg.try_deserialize().context("Invalid configuration")?;
        app_cfg.jobs.fill_credentials(lookup);
        Ok(app_cfg)
    }
}

impl JobsConfig {
    /// `ACTOR_ID` / `APIFY_TOKEN` fill whatever the config files left unset.
    /// Empty values count as unset.
    fn fill_credentials(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if self.actor_id.is_none() {
            self.actor_id = var("ACTOR_ID");
        }
        if self.apify_token.is_none() {
            self.apify_token = var("APIFY_TOKEN");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[scraper]\noutput_path = \"out/products.csv\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.scraper.output_path, PathBuf::from("out/products.csv"));
        assert_eq!(cfg.scraper.site_origin, "https://www.amazon.com");
        assert_eq!(cfg.jobs.poll_interval_secs, 5);
        assert_eq!(cfg.dashboard.histogram_bins, 10);
    }

    #[test]
    fn test_poll_policy_from_config() {
        let jobs = JobsConfig {
            exponential_backoff: true,
            max_polls: Some(4),
            ..JobsConfig::default()
        };
        let policy = jobs.poll_policy();

        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, Some(4));
        assert_eq!(policy.max_wait, Some(Duration::from_secs(900)));
        assert!(matches!(policy.backoff, Backoff::Exponential { .. }));
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_credentials_filled_from_env() {
        let mut jobs = JobsConfig::default();
        jobs.fill_credentials(env(&[("ACTOR_ID", "acme~indeed"), ("APIFY_TOKEN", "tok")]));

        assert_eq!(jobs.actor_id.as_deref(), Some("acme~indeed"));
        assert_eq!(jobs.apify_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_configured_credentials_win_over_env() {
        let mut jobs = JobsConfig {
            actor_id: Some("from-config".into()),
            ..JobsConfig::default()
        };
        jobs.fill_credentials(env(&[("ACTOR_ID", "from-env"), ("APIFY_TOKEN", "tok")]));

        assert_eq!(jobs.actor_id.as_deref(), Some("from-config"));
        assert_eq!(jobs.apify_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_empty_env_credentials_stay_unset() {
        let mut jobs = JobsConfig::default();
        jobs.fill_credentials(env(&[("ACTOR_ID", ""), ("APIFY_TOKEN", "  ")]));

        assert_eq!(jobs.actor_id, None);
        assert_eq!(jobs.apify_token, None);
    }

    fn sources(toml: &str) -> config::Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
    }

    #[test]
    fn test_invalid_value_fails_the_load() {
        let cfg = sources("[scraper]\noutput_path = \"custom.csv\"\n[jobs]\npoll_interval_secs = \"soon\"\n");

        let err = AppConfig::from_sources(cfg, env(&[])).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_sources_then_env_credentials() {
        let cfg = sources("[jobs]\nactor_id = \"acme~indeed\"\n");

        let app = AppConfig::from_sources(cfg, env(&[("ACTOR_ID", "other"), ("APIFY_TOKEN", "tok")])).unwrap();
        assert_eq!(app.jobs.actor_id.as_deref(), Some("acme~indeed"));
        assert_eq!(app.jobs.apify_token.as_deref(), Some("tok"));
    }
}
