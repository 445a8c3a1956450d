//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements (x = month, y = residual):
//! - residuals: `o`
//! - flagged (mispriced) residuals: `X`
//! - zero line: `-`
//! - ±threshold band: `.`

use crate::domain::{MispricedSet, RegressionResult};

/// Render residuals over time with the mispricing band.
pub fn render_residual_plot(
    result: &RegressionResult,
    mispriced: &MispricedSet,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let residuals = result.residuals();
    let threshold = mispriced.threshold();

    let extent = residuals
        .iter()
        .map(|r| r.abs())
        .fold(threshold.abs(), f64::max);
    let (y_min, y_max) = pad_range(-extent, extent, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Reference lines first so points overlay them.
    let zero = map_y(0.0, y_min, y_max, height);
    grid[zero].fill('-');
    if threshold > 0.0 {
        for y in [threshold, -threshold] {
            let row = map_y(y, y_min, y_max, height);
            if row != zero {
                grid[row].fill('.');
            }
        }
    }

    let n = residuals.len();
    for (i, &r) in residuals.iter().enumerate() {
        let x = map_x(i, n, width);
        let y = map_y(r, y_min, y_max, height);
        // A flagged point always wins its cell.
        if mispriced.contains(i) {
            grid[y][x] = 'X';
        } else if grid[y][x] != 'X' {
            grid[y][x] = 'o';
        }
    }

    let mut out = String::new();
    let dates = result.dates();
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => out.push_str(&format!(
            "Plot: months=[{}, {}] | residual=[{y_min:.4}, {y_max:.4}] | band=±{threshold:.4}\n",
            first.format("%Y-%m"),
            last.format("%Y-%m"),
        )),
        _ => out.push_str("Plot: (no rows)\n"),
    }

    for row in grid {
        let line: String = row.into_iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    if !(min.is_finite() && max.is_finite()) || max <= min {
        return (-1.0, 1.0);
    }
    let pad = (max - min) * frac;
    (min - pad, max + pad)
}

fn map_x(i: usize, n: usize, width: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let u = i as f64 / (n - 1) as f64;
    ((u * (width - 1) as f64).round() as usize).min(width - 1)
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the plot.
    let row = ((1.0 - u) * (height - 1) as f64).round() as usize;
    row.min(height - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{AlignedTable, Column, ColumnId};
    use crate::rank::identify_mispricing;
    use crate::regress::fit_factor_model;

    #[test]
    fn plot_marks_flagged_point_and_has_fixed_height() {
        let values = vec![0.01, -0.02, 0.0, 0.015, 0.4, -0.01, 0.005, 0.0, -0.005, 0.02];
        let table = AlignedTable::new(
            (1..=10).map(|m| NaiveDate::from_ymd_opt(2020, m, 1).unwrap()).collect(),
            vec![Column {
                id: ColumnId::returns("Y"),
                values,
            }],
        )
        .unwrap();
        let result = fit_factor_model(table, "Y_returns", &[], 1e-10).unwrap();
        let mispriced = identify_mispricing(&result, 0.95).unwrap();
        assert_eq!(mispriced.indices(), &[4]);

        let plot = render_residual_plot(&result, &mispriced, 40, 12);
        let lines: Vec<&str> = plot.lines().collect();
        assert_eq!(lines.len(), 13);
        assert!(lines[0].starts_with("Plot: months=[2020-01, 2020-10]"));
        assert_eq!(plot.matches('X').count(), 1);
        assert!(lines.iter().skip(1).any(|l| l.contains('-')));
    }

    #[test]
    fn map_y_is_clamped() {
        assert_eq!(map_y(10.0, -1.0, 1.0, 5), 0);
        assert_eq!(map_y(-10.0, -1.0, 1.0, 5), 4);
    }
}
