//! Wide CSV ingest.
//!
//! Expected layout: one date column (`date`, case-insensitive) and one column
//! per series, e.g.
//!
//! ```text
//! date,10Y_Treasury_Yield,CPI,USD_EUR_Exchange_Rate
//! 2023-01-01,3.53,300.5,1.08
//! 2023-02-01,3.75,.,1.07
//! ```
//!
//! Cells are kept as raw text; the cleaning policy decides later what an
//! invalid cell means. Rows whose date cannot be parsed are skipped and
//! reported, the same way other row-level problems are.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::align::RawSeries;
use crate::error::AppError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: one raw series per non-date column.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: Vec<RawSeries>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a wide CSV file.
pub fn load_series_csv(path: &Path) -> Result<IngestedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_series_csv(file)
}

/// Read a wide CSV from any reader.
pub fn read_series_csv<R: std::io::Read>(reader: R) -> Result<IngestedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let (date_idx, series_cols) = resolve_columns(&headers)?;

    let mut series: Vec<RawSeries> = series_cols
        .iter()
        .map(|(_, name)| RawSeries::new(name.clone(), Vec::new()))
        .collect();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1, records are 1-based after it.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let raw_date = record.get(date_idx).unwrap_or("");
        let Some(date) = parse_date(raw_date) else {
            row_errors.push(RowError {
                line,
                message: format!("invalid date '{raw_date}'"),
            });
            continue;
        };

        for (out, (col, _)) in series.iter_mut().zip(&series_cols) {
            let cell = record.get(*col).unwrap_or("").to_string();
            out.observations.push((date, cell));
        }
    }

    for err in &row_errors {
        tracing::warn!(line = err.line, "skipped CSV row: {}", err.message);
    }

    if rows_read == row_errors.len() {
        return Err(AppError::usage("CSV contains no usable rows."));
    }

    Ok(IngestedSeries {
        series,
        row_errors,
        rows_read,
    })
}

fn resolve_columns(headers: &StringRecord) -> Result<(usize, Vec<(usize, String)>), AppError> {
    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();

    let date_idx = names
        .iter()
        .position(|n| n.eq_ignore_ascii_case("date"))
        .ok_or_else(|| AppError::usage("Missing required column: `date`"))?;

    let mut seen = HashSet::new();
    let mut cols = Vec::new();
    for (i, name) in names.into_iter().enumerate() {
        if i == date_idx || name.is_empty() {
            continue;
        }
        if !seen.insert(name.clone()) {
            return Err(AppError::usage(format!("Duplicate CSV column: `{name}`")));
        }
        cols.push((i, name));
    }

    if cols.is_empty() {
        return Err(AppError::usage("CSV has no series columns besides `date`."));
    }
    Ok((date_idx, cols))
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, the date column is not found.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok())
}
