use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use anyhow::Context;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;

/// Single-shot GET client carrying the fixed browser-like header set.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .context("Invalid Accept-Language header")?,
        );

        let mut builder = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true);

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let inner = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { inner })
    }

    /// Fetch a URL as raw bytes. Transport errors and non-success statuses
    /// both come back as `ScrapeError::Transport`; nothing is retried.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScrapeError::transport(url, e))?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ScrapeError::transport(url, e))?;

        debug!("GET {} -> {} bytes", url, bytes.len());
        Ok(bytes.to_vec())
    }
}
