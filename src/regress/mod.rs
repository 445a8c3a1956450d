//! Factor regression of one return column on a set of explanatory return
//! columns.
//!
//! The model is
//!
//! ```text
//! target_t = β₀ + Σ_i β_i · factor_{i,t} + ε_t
//! ```
//!
//! fitted by OLS (see [`crate::math::solve_least_squares`]). The output keeps
//! the aligned table and adds fitted values and residuals (actual − fitted).

use nalgebra::{DMatrix, DVector};

use crate::domain::{AlignedTable, Coefficients, FactorWeight, FitQuality, RegressionResult};
use crate::error::{PipelineError, Result};
use crate::math::solve_least_squares;

/// Residuals within this fraction of the target's scale are rounding noise
/// and are stored as exact zeros.
const RESIDUAL_ZERO_TOL: f64 = 1e-12;

/// Fit `target` on `factors` (plus intercept) over every row of `table`.
///
/// `target` and every entry of `factors` must name return columns
/// (`<series>_returns`); level column names are a `MissingColumn` error.
pub fn fit_factor_model(
    table: AlignedTable,
    target: &str,
    factors: &[String],
    rank_tolerance: f64,
) -> Result<RegressionResult> {
    if !(rank_tolerance.is_finite() && rank_tolerance > 0.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "rank tolerance must be a positive number, got {rank_tolerance}"
        )));
    }

    let y_values = table.return_column(target)?.to_vec();
    let factor_values = factors
        .iter()
        .map(|f| table.return_column(f))
        .collect::<Result<Vec<_>>>()?;

    let n = table.n_rows();
    let k = factors.len() + 1;
    if n < k {
        return Err(PipelineError::InsufficientData {
            name: target.to_string(),
            count: n,
            required: k,
        });
    }

    let x = DMatrix::from_fn(n, k, |row, col| {
        if col == 0 { 1.0 } else { factor_values[col - 1][row] }
    });
    let y = DVector::from_column_slice(&y_values);

    let beta = solve_least_squares(&x, &y, rank_tolerance).map_err(|d| {
        PipelineError::DegenerateModel {
            rank: d.rank,
            columns: d.columns,
            ratio: d.ratio,
            factors: factors.join(", "),
        }
    })?;

    let fitted_vec = &x * &beta;
    let mut fitted: Vec<f64> = fitted_vec.iter().copied().collect();
    let scale = y_values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let zero_tol = RESIDUAL_ZERO_TOL * scale;
    let residuals: Vec<f64> = y_values
        .iter()
        .zip(fitted.iter_mut())
        .map(|(a, f)| {
            let r = a - *f;
            if r.abs() <= zero_tol {
                *f = *a;
                0.0
            } else {
                r
            }
        })
        .collect();

    let quality = fit_quality(&y_values, &residuals, k);
    let coefficients = Coefficients {
        intercept: beta[0],
        weights: factors
            .iter()
            .zip(beta.iter().skip(1))
            .map(|(f, &b)| FactorWeight {
                factor: f.clone(),
                beta: b,
            })
            .collect(),
    };

    tracing::info!(
        target = %target,
        factors = factors.len(),
        n = quality.n,
        rmse = quality.rmse,
        r_squared = ?quality.r_squared,
        "fitted factor model"
    );

    Ok(RegressionResult::new(
        table,
        target.to_string(),
        factors.to_vec(),
        coefficients,
        quality,
        y_values,
        fitted,
        residuals,
    ))
}

fn fit_quality(actual: &[f64], residuals: &[f64], k: usize) -> FitQuality {
    let n = actual.len();
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let rmse = if n > 0 { (sse / n as f64).sqrt() } else { 0.0 };

    let mean = actual.iter().sum::<f64>() / n.max(1) as f64;
    let sst: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let r_squared = if sst > 0.0 { Some(1.0 - sse / sst) } else { None };

    FitQuality {
        n,
        k,
        sse,
        rmse,
        r_squared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use crate::align::align_series;
    use crate::domain::{Column, ColumnId, TimeSeries};

    fn month(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2010 + (i / 12) as i32, (i % 12) as u32 + 1, 1).unwrap()
    }

    /// Table with only return columns, straight from vectors.
    fn returns_table(cols: &[(&str, Vec<f64>)]) -> AlignedTable {
        let n = cols[0].1.len();
        AlignedTable::new(
            (0..n).map(month).collect(),
            cols.iter()
                .map(|(name, values)| Column {
                    id: ColumnId::returns(*name),
                    values: values.clone(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scenario_coefficients_match_closed_form() {
        let a = TimeSeries::from_observations(
            "A",
            [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate().map(|(i, v)| (month(i), v)),
        );
        let b = TimeSeries::from_observations(
            "B",
            [10.0, 20.0, 15.0, 25.0, 30.0].into_iter().enumerate().map(|(i, v)| (month(i), v)),
        );
        let table = align_series(&[a, b]).unwrap();

        let result = fit_factor_model(table, "A_returns", &names(&["B_returns"]), 1e-10).unwrap();
        let beta = result.coefficients().to_vec();

        // Closed form: slope = cov(x, y) / var(x), intercept = ȳ − slope·x̄.
        assert_abs_diff_eq!(beta[0], 0.382_781_534_157_146_1, epsilon = 1e-6);
        assert_abs_diff_eq!(beta[1], 0.341_571_461_879_225_9, epsilon = 1e-6);
        assert_eq!(result.coefficients().weights[0].factor, "B_returns");
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn residuals_are_orthogonal_to_factors_and_sum_to_zero() {
        let x1 = vec![0.01, -0.02, 0.015, 0.03, -0.01, 0.005, 0.02, -0.025];
        let x2 = vec![0.002, 0.004, -0.003, 0.001, 0.006, -0.002, 0.0, 0.003];
        let y = vec![0.011, -0.018, 0.02, 0.027, -0.004, 0.003, 0.025, -0.02];
        let table = returns_table(&[("Y", y), ("X1", x1.clone()), ("X2", x2.clone())]);

        let result = fit_factor_model(table, "Y_returns", &names(&["X1_returns", "X2_returns"]), 1e-10).unwrap();
        let r = result.residuals();

        assert_abs_diff_eq!(r.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        let dot = |x: &[f64]| x.iter().zip(r).map(|(a, b)| a * b).sum::<f64>();
        assert_abs_diff_eq!(dot(&x1), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dot(&x2), 0.0, epsilon = 1e-12);

        for ((a, f), e) in result.actual().iter().zip(result.fitted()).zip(r) {
            assert_abs_diff_eq!(a - f, *e, epsilon = 1e-15);
        }
        assert!(result.quality().r_squared.unwrap() > 0.5);
    }

    #[test]
    fn collinear_factors_are_degenerate() {
        let x1 = vec![0.01, -0.02, 0.015, 0.03, -0.01];
        let x2: Vec<f64> = x1.iter().map(|v| 3.0 * v - 0.5 * v).collect();
        let y = vec![0.02, 0.01, -0.01, 0.0, 0.03];
        let table = returns_table(&[("Y", y), ("X1", x1), ("X2", x2)]);

        let err = fit_factor_model(table, "Y_returns", &names(&["X1_returns", "X2_returns"]), 1e-10).unwrap_err();
        match err {
            PipelineError::DegenerateModel { rank, columns, factors, .. } => {
                assert_eq!(columns, 3);
                assert_eq!(rank, 2);
                assert_eq!(factors, "X1_returns, X2_returns");
            }
            other => panic!("expected DegenerateModel, got {other:?}"),
        }
    }

    #[test]
    fn constant_factor_is_collinear_with_intercept() {
        let table = returns_table(&[
            ("Y", vec![0.1, 0.2, 0.3, 0.4]),
            ("C", vec![0.05, 0.05, 0.05, 0.05]),
        ]);
        let err = fit_factor_model(table, "Y_returns", &names(&["C_returns"]), 1e-10).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateModel { .. }));
    }

    #[test]
    fn unknown_factor_is_missing_column() {
        let table = returns_table(&[("Y", vec![0.1, 0.2, 0.3])]);
        let err = fit_factor_model(table, "Y_returns", &names(&["CPI_returns"]), 1e-10).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "CPI_returns"));
    }

    #[test]
    fn level_column_is_not_accepted_as_target() {
        let table = AlignedTable::new(
            vec![month(0), month(1)],
            vec![Column {
                id: ColumnId::level("Y"),
                values: vec![1.0, 2.0],
            }],
        )
        .unwrap();
        let err = fit_factor_model(table, "Y", &[], 1e-10).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }

    #[test]
    fn level_names_are_not_resolved_to_return_columns() {
        let y = TimeSeries::from_observations(
            "Y",
            [4.0, 4.2, 4.1, 4.5, 4.4].into_iter().enumerate().map(|(i, v)| (month(i), v)),
        );
        let cpi = TimeSeries::from_observations(
            "CPI",
            [100.0, 101.0, 101.5, 103.0, 102.0].into_iter().enumerate().map(|(i, v)| (month(i), v)),
        );
        let table = align_series(&[y, cpi]).unwrap();
        assert!(table.column(&ColumnId::level("CPI")).is_some());

        let err = fit_factor_model(table.clone(), "Y", &names(&["CPI_returns"]), 1e-10).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "Y"));

        let err = fit_factor_model(table, "Y_returns", &names(&["CPI"]), 1e-10).unwrap_err();
        match err {
            PipelineError::MissingColumn { column, known, .. } => {
                assert_eq!(column, "CPI");
                assert_eq!(known, "Y_returns, CPI_returns");
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn too_few_rows_is_insufficient() {
        let table = returns_table(&[("Y", vec![0.1, 0.2]), ("X1", vec![0.3, 0.1]), ("X2", vec![0.0, 0.2])]);
        let err = fit_factor_model(table, "Y_returns", &names(&["X1_returns", "X2_returns"]), 1e-10).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InsufficientData {
                name: "Y".to_string(),
                count: 2,
                required: 3,
            }
        );
    }

    #[test]
    fn exactly_determined_fit_has_zero_residuals_and_flags_nothing() {
        let table = returns_table(&[
            ("Y", vec![0.1, 0.25, 0.7]),
            ("X1", vec![0.01, 0.03, -0.02]),
            ("X2", vec![0.2, -0.1, 0.05]),
        ]);
        let result = fit_factor_model(table, "Y_returns", &names(&["X1_returns", "X2_returns"]), 1e-10).unwrap();

        assert!(result.residuals().iter().all(|r| *r == 0.0), "{:?}", result.residuals());
        assert_eq!(result.fitted(), result.actual());
        let flagged = crate::rank::identify_mispricing(&result, 0.95).unwrap();
        assert!(flagged.is_empty());
    }

    #[test]
    fn intercept_only_model_fits_the_mean() {
        let table = returns_table(&[("Y", vec![1.0, 2.0, 6.0])]);
        let result = fit_factor_model(table, "Y_returns", &[], 1e-10).unwrap();
        assert_abs_diff_eq!(result.coefficients().intercept, 3.0, epsilon = 1e-12);
        assert!(result.coefficients().weights.is_empty());
    }
}
