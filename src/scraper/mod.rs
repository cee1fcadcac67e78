pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ScraperConfig;
use crate::models::ListingRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use self::http_client::HttpClient;
use self::parsers::{ListingParser, parse_listing_page};

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable listing source abstraction.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// One bounded fetch + parse pass. A failed fetch yields an empty list.
    async fn scrape(&self) -> Result<Vec<ListingRecord>>;

    fn source_name(&self) -> &'static str;
}

// ── Amazon search page scraper ────────────────────────────────────────────────

pub struct AmazonScraper {
    client: HttpClient,
    parser: ListingParser,
    target_url: String,
}

impl AmazonScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            parser: ListingParser::new(config.site_origin.trim_end_matches('/'))
                .context("Failed to compile listing selectors")?,
            target_url: config.target_url.clone(),
        })
    }
}

#[async_trait]
impl ListingSource for AmazonScraper {
    async fn scrape(&self) -> Result<Vec<ListingRecord>> {
        info!("Fetching listing page {}", self.target_url);

        let bytes = match self.client.get_bytes(&self.target_url).await {
            Ok(b) => b,
            Err(e) => {
                warn!("Error fetching {}: {}", self.target_url, e);
                return Ok(vec![]);
            }
        };

        let records = parse_listing_page(&self.parser, &bytes);
        info!("{} listings extracted", records.len());
        Ok(records)
    }

    fn source_name(&self) -> &'static str {
        "amazon"
    }
}
