//! Series alignment: outer join → gap fill → returns.
//!
//! Given any number of monthly series with different spans and holes, build a
//! single [`AlignedTable`] with one level column and one return column per
//! series and no missing cells.
//!
//! Steps:
//! 1. outer join on month (the table spans the union of observed months)
//! 2. per column: linear interpolation, then back-fill of leading gaps
//! 3. per column: percentage-change return column
//! 4. drop the first row (no prior period) and any row with a missing or
//!    non-finite cell

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::domain::{AlignedTable, Column, ColumnId, TimeSeries};
use crate::error::{PipelineError, Result};

pub mod clean;
pub mod fill;

pub use clean::{RawSeries, clean_all, clean_series, parse_value};

/// Minimum observations per series needed to compute a return.
const MIN_POINTS: usize = 2;

/// Align `series` onto a common monthly index and derive return columns.
pub fn align_series(series: &[TimeSeries]) -> Result<AlignedTable> {
    if series.is_empty() {
        return Err(PipelineError::InsufficientData {
            name: "input series".to_string(),
            count: 0,
            required: 1,
        });
    }

    let mut seen = HashSet::new();
    for s in series {
        if !seen.insert(s.name()) {
            return Err(PipelineError::DuplicateSeries(s.name().to_string()));
        }
    }

    // 1) Outer join over every observed month, including months whose value
    // was coerced to missing.
    let months: Vec<NaiveDate> = series
        .iter()
        .flat_map(|s| s.months())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut grid: Vec<Vec<Option<f64>>> = series
        .iter()
        .map(|s| months.iter().map(|m| s.get(*m)).collect())
        .collect();

    for (s, col) in series.iter().zip(&grid) {
        let known = fill::known_count(col);
        if known < MIN_POINTS {
            return Err(PipelineError::InsufficientData {
                name: s.name().to_string(),
                count: known,
                required: MIN_POINTS,
            });
        }
    }

    // 2) Gap fill. Columns are independent.
    grid.par_iter_mut().for_each(|col| {
        fill::interpolate(col);
        fill::backfill(col);
    });

    // 3) Returns.
    let returns: Vec<Vec<Option<f64>>> = grid.par_iter().map(|col| fill::pct_change(col)).collect();

    // 4) Keep complete rows only (row 0 never has a return). Levels are fully
    // filled at this point, so a later row can only fail on a return.
    let mut dropped_by: Vec<usize> = vec![0; series.len()];
    let keep: Vec<usize> = (0..months.len())
        .filter(|&row| {
            if row == 0 {
                return false;
            }
            let mut complete = true;
            for (i, (lv, ret)) in grid.iter().zip(&returns).enumerate() {
                if lv[row].is_none() || ret[row].is_none() {
                    dropped_by[i] += 1;
                    complete = false;
                }
            }
            complete
        })
        .collect();

    let culprits: Vec<String> = series
        .iter()
        .zip(&dropped_by)
        .filter(|(_, n)| **n > 0)
        .map(|(s, &n)| {
            tracing::warn!(
                series = s.name(),
                rows = n,
                "dropped rows with undefined returns (zero or non-finite level)"
            );
            ColumnId::returns(s.name()).name()
        })
        .collect();

    if keep.is_empty() {
        let name = if culprits.is_empty() {
            "aligned table".to_string()
        } else {
            culprits.join(", ")
        };
        return Err(PipelineError::InsufficientData {
            name,
            count: 0,
            required: 1,
        });
    }

    let pick = |col: &[Option<f64>]| -> Vec<f64> {
        keep.iter().map(|&row| col[row].unwrap_or(f64::NAN)).collect()
    };

    let mut columns = Vec::with_capacity(series.len() * 2);
    for (s, col) in series.iter().zip(&grid) {
        columns.push(Column {
            id: ColumnId::level(s.name()),
            values: pick(col),
        });
    }
    for (s, col) in series.iter().zip(&returns) {
        columns.push(Column {
            id: ColumnId::returns(s.name()),
            values: pick(col),
        });
    }

    let dates = keep.iter().map(|&row| months[row]).collect();
    let table = AlignedTable::new(dates, columns)?;

    tracing::info!(
        series = series.len(),
        months = months.len(),
        rows = table.n_rows(),
        "aligned series"
    );

    Ok(table)
}
