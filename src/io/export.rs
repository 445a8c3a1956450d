//! Export tables to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. Result and mispriced tables share one schema:
//!
//! `date, <level columns…>, <return columns…>, predicted_returns, residuals`

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{MispricedSet, RegressionResult, TimeSeries};
use crate::error::AppError;

pub const FITTED_COLUMN: &str = "predicted_returns";
pub const RESIDUAL_COLUMN: &str = "residuals";

/// Write every row of the regression result.
pub fn write_results_csv(path: &Path, result: &RegressionResult) -> Result<(), AppError> {
    let rows: Vec<usize> = (0..result.len()).collect();
    write_rows(path, result, &rows)
}

/// Write only the flagged rows (same schema as [`write_results_csv`]).
pub fn write_mispriced_csv(
    path: &Path,
    result: &RegressionResult,
    mispriced: &MispricedSet,
) -> Result<(), AppError> {
    write_rows(path, result, mispriced.indices())
}

/// Write the regression table for `rows` to any writer.
pub fn write_table<W: Write>(out: W, result: &RegressionResult, rows: &[usize]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let table = result.table();

    let mut header = vec!["date".to_string()];
    header.extend(table.columns().iter().map(|c| c.id.name()));
    header.push(FITTED_COLUMN.to_string());
    header.push(RESIDUAL_COLUMN.to_string());
    writer
        .write_record(&header)
        .map_err(|e| AppError::usage(format!("Failed to write export CSV header: {e}")))?;

    for &row in rows {
        let mut record = Vec::with_capacity(header.len());
        record.push(table.dates()[row].to_string());
        record.extend(table.columns().iter().map(|c| format!("{:.10}", c.values[row])));
        record.push(format!("{:.10}", result.fitted()[row]));
        record.push(format!("{:.10}", result.residuals()[row]));
        writer
            .write_record(&record)
            .map_err(|e| AppError::usage(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn write_rows(path: &Path, result: &RegressionResult, rows: &[usize]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::usage(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_table(file, result, rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

/// Write monthly series side by side (outer join; missing cells left empty).
pub fn write_series_csv(path: &Path, series: &[TimeSeries]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::usage(format!("Failed to create series CSV '{}': {e}", path.display())))?;
    write_series(file, series)?;
    tracing::info!(path = %path.display(), series = series.len(), "wrote raw series");
    Ok(())
}

pub fn write_series<W: Write>(out: W, series: &[TimeSeries]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["date".to_string()];
    header.extend(series.iter().map(|s| s.name().to_string()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::usage(format!("Failed to write series CSV header: {e}")))?;

    let months: BTreeSet<_> = series.iter().flat_map(|s| s.iter().map(|(d, _)| d)).collect();
    for month in months {
        let mut record = vec![month.to_string()];
        record.extend(
            series
                .iter()
                .map(|s| s.get(month).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(&record)
            .map_err(|e| AppError::usage(format!("Failed to write series CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush series CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{AlignedTable, Column, ColumnId};
    use crate::regress::fit_factor_model;

    fn month(i: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, i + 1, 1).unwrap()
    }

    fn result() -> RegressionResult {
        let table = AlignedTable::new(
            (0..4).map(month).collect(),
            vec![
                Column {
                    id: ColumnId::level("Y"),
                    values: vec![1.0, 2.0, 3.0, 4.0],
                },
                Column {
                    id: ColumnId::returns("Y"),
                    values: vec![0.1, 0.2, 0.4, 0.3],
                },
            ],
        )
        .unwrap();
        fit_factor_model(table, "Y_returns", &[], 1e-10).unwrap()
    }

    #[test]
    fn table_has_value_return_fitted_and_residual_columns() {
        let mut buf = Vec::new();
        write_table(&mut buf, &result(), &[0, 2]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "date,Y,Y_returns,predicted_returns,residuals");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2024-01-01,1.0000000000,0.1000000000,0.2500000000,"));
        assert!(lines[2].starts_with("2024-03-01,"));
    }

    #[test]
    fn series_csv_leaves_gaps_empty() {
        let a = TimeSeries::from_observations("A", vec![(month(0), 1.0), (month(1), 2.0)]);
        let b = TimeSeries::from_observations("B", vec![(month(1), 5.5)]);
        let mut buf = Vec::new();
        write_series(&mut buf, &[a, b]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "date,A,B\n2024-01-01,1,\n2024-02-01,2,5.5\n");
    }
}
