//! Flat-file output: CSV or Excel, picked by extension, always overwritten.

use crate::error::{Result, ScrapeError};
use crate::models::Tabular;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::{info, warn};

/// Excel refuses longer strings in a single cell.
const XLSX_MAX_CELL_CHARS: usize = 32_767;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(ScrapeError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Write `rows` under a header row, replacing whatever is at `path`.
/// Returns the number of data rows written.
pub fn write_table<T: Tabular>(rows: &[T], path: &Path) -> Result<usize> {
    let format = OutputFormat::from_path(path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        OutputFormat::Csv => write_csv(rows, path)?,
        OutputFormat::Xlsx => write_xlsx(rows, path)?,
    }

    info!("{} rows saved to {:?}", rows.len(), path);
    Ok(rows.len())
}

fn write_csv<T: Tabular>(rows: &[T], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(T::HEADERS)?;
    for row in rows {
        wtr.write_record(row.cells().iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_xlsx<T: Tabular>(rows: &[T], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, header) in T::HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.cells().iter().enumerate() {
            // Empty cells stay blank.
            if let Some(v) = cell {
                let column = T::HEADERS.get(col).copied().unwrap_or_default();
                sheet.write_string(r, col as u16, fit_cell(v, i + 1, column))?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Truncate on a char boundary so one oversized value cannot sink the sheet.
fn fit_cell<'a>(value: &'a str, row: usize, column: &str) -> &'a str {
    match value.char_indices().nth(XLSX_MAX_CELL_CHARS) {
        Some((cut, _)) => {
            warn!(
                "Row {} {:?}: {} chars truncated to {}",
                row,
                column,
                value.chars().count(),
                XLSX_MAX_CELL_CHARS
            );
            &value[..cut]
        }
        None => value,
    }
}
