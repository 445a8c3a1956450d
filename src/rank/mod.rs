//! Mispricing ranker.
//!
//! A row is flagged when its absolute residual is strictly greater than the
//! `quantile` of all absolute residuals. With the usual 0.95 this flags roughly
//! the top 5%; ties at the threshold are never flagged, so a constant residual
//! column flags nothing.

use crate::domain::{MispricedSet, RegressionResult};
use crate::error::{PipelineError, Result};
use crate::math::quantile_linear;

/// Default tail quantile.
pub const DEFAULT_QUANTILE: f64 = 0.95;

/// Threshold and flagged rows for a residual vector.
///
/// Pure function of `residuals`: the threshold depends only on the multiset
/// of values and the returned indices are ascending.
pub fn flag_residuals(residuals: &[f64], quantile: f64) -> Result<(f64, Vec<usize>)> {
    if !(quantile.is_finite() && (0.0..=1.0).contains(&quantile)) {
        return Err(PipelineError::InvalidConfig(format!(
            "mispricing quantile must be within [0, 1], got {quantile}"
        )));
    }
    if residuals.is_empty() {
        return Err(PipelineError::EmptyResult {
            context: "no regression rows".to_string(),
        });
    }

    let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let threshold = quantile_linear(&abs, quantile).ok_or_else(|| PipelineError::EmptyResult {
        context: format!("non-finite residuals among {} rows", abs.len()),
    })?;

    let rows = abs
        .iter()
        .enumerate()
        .filter(|(_, a)| **a > threshold)
        .map(|(i, _)| i)
        .collect();

    Ok((threshold, rows))
}

/// Select the rows of `result` whose |residual| exceeds the `quantile`.
pub fn identify_mispricing(result: &RegressionResult, quantile: f64) -> Result<MispricedSet> {
    let (threshold, rows) = flag_residuals(result.residuals(), quantile)?;

    tracing::info!(
        quantile,
        threshold,
        flagged = rows.len(),
        rows = result.len(),
        "identified mispriced observations"
    );

    Ok(MispricedSet::new(quantile, threshold, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn flags_only_the_tail() {
        let residuals: Vec<f64> = (1..=100).map(|i| if i % 2 == 0 { i as f64 } else { -(i as f64) }).collect();
        let (threshold, rows) = flag_residuals(&residuals, 0.95).unwrap();
        // |r| = 1..=100, h = 99 × 0.95 = 94.05 → 95.05.
        assert_relative_eq!(threshold, 95.05, epsilon = 1e-9);
        assert_eq!(rows, vec![95, 96, 97, 98, 99]);
    }

    #[test]
    fn identical_residuals_flag_nothing() {
        let (threshold, rows) = flag_residuals(&[0.25; 30], 0.95).unwrap();
        assert_relative_eq!(threshold, 0.25);
        assert!(rows.is_empty());

        let (threshold, rows) = flag_residuals(&[0.0; 5], 0.95).unwrap();
        assert_eq!(threshold, 0.0);
        assert!(rows.is_empty());
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    #[case(19)]
    #[case(20)]
    fn small_samples_flag_at_most_one_row(#[case] n: usize) {
        let residuals: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
        let (_, rows) = flag_residuals(&residuals, 0.95).unwrap();
        assert!(rows.len() <= 1, "n={n} flagged {rows:?}");
    }

    #[test]
    fn twenty_distinct_rows_flag_the_maximum() {
        let residuals: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let (threshold, rows) = flag_residuals(&residuals, 0.95).unwrap();
        assert!(threshold > 1.8 && threshold < 1.9);
        assert_eq!(rows, vec![19]);
    }

    #[test]
    fn selection_ignores_row_order() {
        let a = [0.1, -3.0, 0.2, 0.05, 2.0, -0.3, 0.0, 0.4, -0.15, 0.25];
        let mut b = a;
        b.reverse();
        let (ta, ra) = flag_residuals(&a, 0.8).unwrap();
        let (tb, rb) = flag_residuals(&b, 0.8).unwrap();
        assert_eq!(ta, tb);
        let flagged_a: Vec<f64> = ra.iter().map(|&i| a[i]).collect();
        let mut flagged_b: Vec<f64> = rb.iter().map(|&i| b[i]).collect();
        flagged_b.reverse();
        assert_eq!(flagged_a, flagged_b);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let residuals = [0.3, -0.1, 0.9, -1.2, 0.05, 0.0, 0.7];
        assert_eq!(
            flag_residuals(&residuals, 0.9).unwrap(),
            flag_residuals(&residuals, 0.9).unwrap()
        );
    }

    #[test]
    fn empty_residuals_are_an_error() {
        assert!(matches!(
            flag_residuals(&[], 0.95),
            Err(PipelineError::EmptyResult { .. })
        ));
    }

    #[test]
    fn out_of_range_quantile_is_rejected() {
        assert!(matches!(
            flag_residuals(&[1.0], 1.2),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
