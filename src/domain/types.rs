//! Shared domain types.
//!
//! These types are intentionally small and owned so that each pipeline stage
//! can hand a complete, immutable value to the next one:
//!
//! - raw inputs (`TimeSeries`, `CleaningPolicy`)
//! - the aligned table (`ColumnId`, `Column`, `AlignedTable`)
//! - regression and ranking outputs (`RegressionResult`, `MispricedSet`)
//! - the run configuration (`PipelineConfig`)

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Suffix appended to a series name to form its return column name.
pub const RETURN_SUFFIX: &str = "_returns";

/// Normalize a date to the first day of its calendar month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// A named monthly series: calendar month (first day) → value.
///
/// Only finite values are stored. A month that was observed but held no
/// usable value (a coerced `"."`, say) is remembered separately so it still
/// takes part in the monthly index; months never observed are simply absent.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    points: BTreeMap<NaiveDate, f64>,
    missing: BTreeSet<NaiveDate>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: BTreeMap::new(),
            missing: BTreeSet::new(),
        }
    }

    /// Build a monthly series from dated observations.
    ///
    /// Observations are resampled to one value per calendar month: the
    /// observation with the latest date inside a month wins. Non-finite values
    /// are skipped.
    pub fn from_observations(
        name: impl Into<String>,
        observations: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        let mut sorted: Vec<(NaiveDate, f64)> = observations
            .into_iter()
            .filter(|(_, v)| v.is_finite())
            .collect();
        // Stable sort keeps input order for same-day duplicates (last one wins).
        sorted.sort_by_key(|(d, _)| *d);

        let mut series = Self::new(name);
        for (date, value) in sorted {
            series.points.insert(month_start(date), value);
        }
        series
    }

    /// Insert (or overwrite) the value for the month containing `date`.
    pub fn insert(&mut self, date: NaiveDate, value: f64) {
        if value.is_finite() {
            self.points.insert(month_start(date), value);
        }
    }

    /// Record that the month containing `date` was observed without a value.
    pub fn mark_missing(&mut self, date: NaiveDate) {
        self.missing.insert(month_start(date));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, month: NaiveDate) -> Option<f64> {
        self.points.get(&month_start(month)).copied()
    }

    /// Iterate `(month, value)` in ascending month order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, v)| (*d, *v))
    }

    /// Every observed month, with or without a value, ascending.
    pub fn months(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points
            .keys()
            .chain(&self.missing)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
    }

    pub fn first_month(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_month(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }
}

/// How raw values that are not valid numbers are handled during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CleaningPolicy {
    /// Treat unparsable, empty, `"."` or non-finite values as missing.
    #[value(name = "coerce")]
    #[serde(rename = "coerce")]
    CoerceInvalidToMissing,
    /// Fail the run on the first invalid value.
    Reject,
}

/// Whether a column holds series levels or period-over-period returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Level,
    Return,
}

/// Typed column identifier.
///
/// The display form is the column name used in tables and exports:
/// `CPI` for the level column and `CPI_returns` for its return column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId {
    pub series: String,
    pub kind: ColumnKind,
}

impl ColumnId {
    pub fn level(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            kind: ColumnKind::Level,
        }
    }

    pub fn returns(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            kind: ColumnKind::Return,
        }
    }

    /// Parse a display name back into an id.
    pub fn parse(name: &str) -> Self {
        match name.strip_suffix(RETURN_SUFFIX) {
            Some(series) if !series.is_empty() => Self::returns(series),
            _ => Self::level(name),
        }
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ColumnKind::Level => write!(f, "{}", self.series),
            ColumnKind::Return => write!(f, "{}{RETURN_SUFFIX}", self.series),
        }
    }
}

/// A single numeric table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: ColumnId,
    pub values: Vec<f64>,
}

/// Monthly table with level and return columns and no missing values.
///
/// Invariants (checked by [`AlignedTable::new`]):
/// - dates are strictly ascending (hence unique)
/// - every column has one value per date and all values are finite
/// - column ids are unique
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
    index: HashMap<ColumnId, usize>,
}

impl AlignedTable {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self> {
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PipelineError::InvalidTable(format!(
                "dates must be strictly ascending ({} then {})",
                w[0], w[1]
            )));
        }

        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if col.values.len() != dates.len() {
                return Err(PipelineError::InvalidTable(format!(
                    "column '{}' has {} values for {} dates",
                    col.id,
                    col.values.len(),
                    dates.len()
                )));
            }
            if let Some(row) = col.values.iter().position(|v| !v.is_finite()) {
                return Err(PipelineError::InvalidTable(format!(
                    "column '{}' has a missing value at {}",
                    col.id, dates[row]
                )));
            }
            if index.insert(col.id.clone(), i).is_some() {
                return Err(PipelineError::InvalidTable(format!(
                    "duplicate column '{}'",
                    col.id
                )));
            }
        }

        Ok(Self {
            dates,
            columns,
            index,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, id: &ColumnId) -> Option<&[f64]> {
        self.index.get(id).map(|&i| self.columns[i].values.as_slice())
    }

    /// Resolve a return column by its display name (`<series>_returns`).
    ///
    /// Level column names are rejected even when the level column exists.
    pub fn return_column(&self, name: &str) -> Result<&[f64]> {
        let id = ColumnId::parse(name);
        let found = match id.kind {
            ColumnKind::Return => self.column(&id),
            ColumnKind::Level => None,
        };
        found.ok_or_else(|| {
            let known: Vec<String> = self.return_names();
            PipelineError::MissingColumn {
                column: name.to_string(),
                available: known.len(),
                known: known.join(", "),
            }
        })
    }

    /// Display names of all return columns, in table order.
    pub fn return_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.id.kind == ColumnKind::Return)
            .map(|c| c.id.name())
            .collect()
    }
}

/// One estimated factor loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeight {
    pub factor: String,
    pub beta: f64,
}

/// Fitted coefficient vector: intercept plus one weight per factor, in the
/// order the factors were requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub intercept: f64,
    pub weights: Vec<FactorWeight>,
}

impl Coefficients {
    /// Coefficients as a flat vector `[β₀, β₁, …]`.
    pub fn to_vec(&self) -> Vec<f64> {
        std::iter::once(self.intercept)
            .chain(self.weights.iter().map(|w| w.beta))
            .collect()
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Number of observations.
    pub n: usize,
    /// Number of coefficients (including the intercept).
    pub k: usize,
    pub sse: f64,
    pub rmse: f64,
    /// Coefficient of determination; `None` when the target has zero variance.
    pub r_squared: Option<f64>,
}

/// Aligned table plus the fitted values and residuals of the factor model.
///
/// Built once by [`crate::regress::fit_factor_model`] and read-only afterward.
#[derive(Debug, Clone)]
pub struct RegressionResult {
    table: AlignedTable,
    target: String,
    factors: Vec<String>,
    coefficients: Coefficients,
    quality: FitQuality,
    actual: Vec<f64>,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
}

impl RegressionResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        table: AlignedTable,
        target: String,
        factors: Vec<String>,
        coefficients: Coefficients,
        quality: FitQuality,
        actual: Vec<f64>,
        fitted: Vec<f64>,
        residuals: Vec<f64>,
    ) -> Self {
        Self {
            table,
            target,
            factors,
            coefficients,
            quality,
            actual,
            fitted,
            residuals,
        }
    }

    pub fn table(&self) -> &AlignedTable {
        &self.table
    }

    pub fn dates(&self) -> &[NaiveDate] {
        self.table.dates()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn quality(&self) -> &FitQuality {
        &self.quality
    }

    pub fn actual(&self) -> &[f64] {
        &self.actual
    }

    pub fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn len(&self) -> usize {
        self.residuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residuals.is_empty()
    }
}

/// Rows of a [`RegressionResult`] whose absolute residual is in the tail.
#[derive(Debug, Clone, PartialEq)]
pub struct MispricedSet {
    quantile: f64,
    threshold: f64,
    /// Row indices into the regression result, ascending.
    indices: Vec<usize>,
}

impl MispricedSet {
    pub(crate) fn new(quantile: f64, threshold: f64, indices: Vec<usize>) -> Self {
        Self {
            quantile,
            threshold,
            indices,
        }
    }

    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.indices.binary_search(&row).is_ok()
    }

    /// Flagged row indices ordered by |residual| descending (ties by date).
    pub fn by_magnitude(&self, result: &RegressionResult) -> Vec<usize> {
        let residuals = result.residuals();
        let mut rows = self.indices.clone();
        rows.sort_by(|&a, &b| {
            residuals[b]
                .abs()
                .total_cmp(&residuals[a].abs())
                .then(a.cmp(&b))
        });
        rows
    }
}

/// Where the raw series come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// FRED observations API (requires `FRED_API_KEY`).
    Fred,
    /// Wide CSV file: `date` column plus one column per series.
    Csv,
    /// Seeded synthetic series (offline).
    Sample,
}

/// FRED client settings.
#[derive(Debug, Clone)]
pub struct FredConfig {
    pub timeout_secs: u64,
    pub retries: u32,
    pub observation_start: Option<NaiveDate>,
}

impl Default for FredConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 2,
            observation_start: None,
        }
    }
}

/// Bond price client settings.
#[derive(Debug, Clone)]
pub struct BondConfig {
    /// Add every bond ticker to the run, whatever the source.
    pub include: bool,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for BondConfig {
    fn default() -> Self {
        Self {
            include: false,
            timeout_secs: 30,
            retries: 2,
        }
    }
}

/// Synthetic sample settings.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub months: usize,
    pub seed: u64,
    /// Probability that any single monthly observation is missing.
    pub gap_prob: f64,
    /// Probability of a yield shock (the "mispricings" the model should flag).
    pub shock_prob: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            months: 240,
            seed: 42,
            gap_prob: 0.03,
            shock_prob: 0.04,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: DataSource,
    pub input: Option<PathBuf>,
    pub policy: CleaningPolicy,
    /// Fetch the whole FRED catalogue rather than only the model's series.
    pub all_series: bool,

    /// Target return column, e.g. `10Y_Treasury_Yield_returns`.
    pub target: String,
    /// Explanatory return columns, in coefficient order.
    pub factors: Vec<String>,

    /// Quantile of |residual| used as the mispricing threshold.
    pub quantile: f64,
    /// Smallest accepted singular value ratio before the model is degenerate.
    pub rank_tolerance: f64,

    pub top_n: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_mispriced: Option<PathBuf>,
    pub export_model: Option<PathBuf>,

    pub fred: FredConfig,
    pub bonds: BondConfig,
    pub sample: SampleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Sample,
            input: None,
            policy: CleaningPolicy::CoerceInvalidToMissing,
            all_series: false,
            target: "10Y_Treasury_Yield_returns".to_string(),
            factors: vec![
                "CPI_returns".to_string(),
                "USD_EUR_Exchange_Rate_returns".to_string(),
            ],
            quantile: 0.95,
            rank_tolerance: 1e-10,
            top_n: 20,
            plot: false,
            plot_width: 100,
            plot_height: 20,
            export_results: None,
            export_mispriced: None,
            export_model: None,
            fred: FredConfig::default(),
            bonds: BondConfig::default(),
            sample: SampleConfig::default(),
        }
    }
}
