//! Reads a persisted listing table back for the dashboard.

use crate::error::{Result, ScrapeError};
use crate::models::{ListingRecord, PRICE_NOT_LISTED};
use crate::storage::OutputFormat;
use calamine::{Data, Reader, open_workbook_auto};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Load every row of a CSV or Excel listing file. A missing file is an empty
/// table, not an error.
pub fn load_table(path: &Path) -> Result<Vec<ListingRecord>> {
    if !path.exists() {
        warn!("{:?} does not exist", path);
        return Ok(vec![]);
    }

    let rows = match OutputFormat::from_path(path)? {
        OutputFormat::Csv => load_csv(path)?,
        OutputFormat::Xlsx => load_xlsx(path)?,
    };
    info!("{:?}: {} rows loaded", path, rows.len());
    Ok(rows)
}

fn load_csv(path: &Path) -> Result<Vec<ListingRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<ListingRecord>().enumerate() {
        match result {
            Ok(r) => rows.push(r),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }
    Ok(rows)
}

fn load_xlsx(path: &Path) -> Result<Vec<ListingRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ScrapeError::Protocol(format!("{:?} has no worksheets", path)))??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(vec![]);
    };
    let column = |name: &str| {
        header
            .iter()
            .position(|c| cell_text(c).is_some_and(|h| h.eq_ignore_ascii_case(name)))
    };
    let (title, price, rating, url) = (column("title"), column("price"), column("rating"), column("url"));

    let get = |row: &[Data], idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(cell_text);

    Ok(rows
        .map(|row| ListingRecord {
            title: get(row, title),
            price: get(row, price).unwrap_or_else(|| PRICE_NOT_LISTED.to_string()),
            rating: get(row, rating),
            url: get(row, url),
        })
        .collect())
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.trim().is_empty() => None,
        other => Some(other.to_string()),
    }
}

// ── Cache ─────────────────────────────────────────────────────────────────────

struct CachedTable {
    modified: Option<SystemTime>,
    rows: Arc<Vec<ListingRecord>>,
}

/// Memoised `load_table`, keyed by path and invalidated when the file's
/// modification time changes.
#[derive(Default)]
pub struct DataCache {
    entries: HashMap<PathBuf, CachedTable>,
}

impl DataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<Vec<ListingRecord>>> {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();

        if let Some(entry) = self.entries.get(path) {
            if entry.modified == modified {
                debug!("cache hit for {:?}", path);
                return Ok(Arc::clone(&entry.rows));
            }
            debug!("{:?} changed on disk, reloading", path);
        }

        let rows = Arc::new(load_table(path)?);
        self.entries.insert(
            path.to_path_buf(),
            CachedTable {
                modified,
                rows: Arc::clone(&rows),
            },
        );
        Ok(rows)
    }
}
