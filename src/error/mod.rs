use std::path::PathBuf;
use thiserror::Error;

use crate::jobs::poll::RunState;

/// Failures surfaced by the scrape, remote job and storage layers.
///
/// A selector that finds nothing is not an error: the affected field falls
/// back to its default instead.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("remote run {run_id} ended as {state}")]
    RemoteJob { run_id: String, state: RunState },

    #[error("unexpected response from remote API: {0}")]
    Protocol(String),

    #[error("unsupported output format for {0:?} (expected .csv or .xlsx)")]
    UnsupportedFormat(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Excel read error: {0}")]
    XlsxRead(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ScrapeError {
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
