//! Gap filling on a single column of the monthly grid.
//!
//! Positions are consecutive calendar months, so interpolation is linear in
//! the row index.

/// Number of known (non-missing) cells.
pub fn known_count(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_some()).count()
}

/// Fill missing cells after the first known value.
///
/// Interior gaps are linearly interpolated between the nearest known values on
/// either side. Trailing gaps are held at the last known value. Leading gaps
/// are left untouched (see [`backfill`]).
pub fn interpolate(values: &mut [Option<f64>]) {
    let mut prev: Option<(usize, f64)> = None;

    for i in 0..values.len() {
        let Some(current) = values[i] else {
            continue;
        };
        if let Some((j, left)) = prev {
            let span = (i - j) as f64;
            for (step, cell) in values[j + 1..i].iter_mut().enumerate() {
                let u = (step + 1) as f64 / span;
                *cell = Some(left + u * (current - left));
            }
        }
        prev = Some((i, current));
    }

    if let Some((last, value)) = prev {
        for cell in &mut values[last + 1..] {
            *cell = Some(value);
        }
    }
}

/// Fill leading gaps with the first known value.
pub fn backfill(values: &mut [Option<f64>]) {
    let Some(first) = values.iter().position(|v| v.is_some()) else {
        return;
    };
    let value = values[first];
    for cell in &mut values[..first] {
        *cell = value;
    }
}

/// Period-over-period percentage change.
///
/// Element `t` is `(v[t] - v[t-1]) / v[t-1]`; element 0 is always `None`, as
/// is any element whose inputs are missing or whose result is not finite
/// (e.g. a zero prior value).
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    for w in values.windows(2) {
        let r = match (w[0], w[1]) {
            (Some(prev), Some(curr)) => Some((curr - prev) / prev).filter(|r| r.is_finite()),
            _ => None,
        };
        out.push(r);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interior_gaps_are_linear() {
        let mut v = vec![Some(1.0), None, None, Some(4.0), None, Some(2.0)];
        interpolate(&mut v);
        let filled: Vec<f64> = v.into_iter().map(Option::unwrap).collect();
        assert_relative_eq!(filled[1], 2.0);
        assert_relative_eq!(filled[2], 3.0);
        assert_relative_eq!(filled[4], 3.0);
    }

    #[test]
    fn trailing_gaps_hold_last_value_and_leading_gaps_wait_for_backfill() {
        let mut v = vec![None, None, Some(5.0), Some(6.0), None];
        interpolate(&mut v);
        assert_eq!(v, vec![None, None, Some(5.0), Some(6.0), Some(6.0)]);

        backfill(&mut v);
        assert_eq!(v, vec![Some(5.0), Some(5.0), Some(5.0), Some(6.0), Some(6.0)]);
    }

    #[test]
    fn gapless_column_is_unchanged() {
        let original = vec![Some(3.0), Some(1.5), Some(-2.0), Some(8.25)];
        let mut v = original.clone();
        interpolate(&mut v);
        backfill(&mut v);
        assert_eq!(v, original);
    }

    #[test]
    fn all_missing_column_stays_missing() {
        let mut v: Vec<Option<f64>> = vec![None; 3];
        interpolate(&mut v);
        backfill(&mut v);
        assert_eq!(known_count(&v), 0);
    }

    #[test]
    fn pct_change_drops_first_row_and_zero_denominators() {
        let r = pct_change(&[Some(2.0), Some(3.0), Some(0.0), Some(1.0)]);
        assert_eq!(r[0], None);
        assert_relative_eq!(r[1].unwrap(), 0.5);
        assert_relative_eq!(r[2].unwrap(), -1.0);
        assert_eq!(r[3], None);
    }
}
