//! Raw value cleaning.
//!
//! Acquisition hands us strings (FRED uses `"."` for "no observation", CSV
//! cells can be blank or garbage). The [`CleaningPolicy`] decides what happens
//! to anything that is not a finite number.

use chrono::NaiveDate;

use crate::domain::{CleaningPolicy, TimeSeries};
use crate::error::{PipelineError, Result};

/// A series exactly as acquired: dated raw text values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSeries {
    pub name: String,
    pub observations: Vec<(NaiveDate, String)>,
}

impl RawSeries {
    pub fn new(name: impl Into<String>, observations: Vec<(NaiveDate, String)>) -> Self {
        Self {
            name: name.into(),
            observations,
        }
    }
}

/// Parse a raw cell into a finite number.
///
/// `"."` (FRED's missing marker), blanks, unparsable text and non-finite
/// values all yield `None`.
pub fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Convert a raw series into a monthly [`TimeSeries`] under `policy`.
pub fn clean_series(raw: &RawSeries, policy: CleaningPolicy) -> Result<TimeSeries> {
    let mut values = Vec::with_capacity(raw.observations.len());
    let mut coerced = Vec::new();

    for (date, text) in &raw.observations {
        match (parse_value(text), policy) {
            (Some(v), _) => values.push((*date, v)),
            (None, CleaningPolicy::CoerceInvalidToMissing) => coerced.push(*date),
            (None, CleaningPolicy::Reject) => {
                return Err(PipelineError::InvalidValue {
                    series: raw.name.clone(),
                    date: *date,
                    raw: text.clone(),
                });
            }
        }
    }

    if !coerced.is_empty() {
        tracing::debug!(series = %raw.name, coerced = coerced.len(), "coerced invalid values to missing");
    }

    let mut series = TimeSeries::from_observations(raw.name.clone(), values);
    for date in coerced {
        series.mark_missing(date);
    }
    Ok(series)
}

/// Clean every raw series with the same policy.
pub fn clean_all(raw: &[RawSeries], policy: CleaningPolicy) -> Result<Vec<TimeSeries>> {
    raw.iter().map(|r| clean_series(r, policy)).collect()
}
