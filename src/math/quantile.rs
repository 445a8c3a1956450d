//! Sample quantiles.

/// Quantile `q ∈ [0, 1]` with linear interpolation between order statistics.
///
/// With the values sorted ascending as `x_0 ≤ … ≤ x_{n-1}` and `h = (n - 1) q`,
/// the result is `x_⌊h⌋ + (h - ⌊h⌋)(x_⌊h⌋+1 - x_⌊h⌋)`. This is the default
/// convention of most statistics packages.
///
/// Returns `None` for an empty input, a `q` outside `[0, 1]`, or any non-finite
/// value.
pub fn quantile_linear(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) || values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = h - lo as f64;

    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}
