//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! acquire → clean → align → regress → rank
//!
//! Acquisition is the only step that touches the outside world; `analyze` is
//! the pure core and takes/returns plain values.

use crate::align::{RawSeries, align_series, clean_all};
use crate::data::{BOND_TICKERS, BondClient, FredClient, MACRO_SERIES, SeriesSpec, catalog, generate_sample};
use crate::domain::{DataSource, MispricedSet, PipelineConfig, RegressionResult, TimeSeries};
use crate::error::{AppError, Result};
use crate::io::ingest::load_series_csv;
use crate::rank::identify_mispricing;
use crate::regress::fit_factor_model;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub source: DataSource,
    pub series: Vec<TimeSeries>,
    pub result: RegressionResult,
    pub mispriced: MispricedSet,
}

/// Execute the full pipeline: acquire, clean, analyze.
pub fn run_pipeline(config: &PipelineConfig) -> std::result::Result<RunOutput, AppError> {
    let series = load_series(config)?;
    let (result, mispriced) = analyze(&series, config)?;
    Ok(RunOutput {
        source: config.source,
        series,
        result,
        mispriced,
    })
}

/// Align → regress → rank over already-cleaned series.
///
/// Either every stage succeeds and both outputs are returned, or the first
/// failure is returned and nothing else is produced.
pub fn analyze(series: &[TimeSeries], config: &PipelineConfig) -> Result<(RegressionResult, MispricedSet)> {
    let table = align_series(series)?;
    let result = fit_factor_model(table, &config.target, &config.factors, config.rank_tolerance)?;
    let mispriced = identify_mispricing(&result, config.quantile)?;
    Ok((result, mispriced))
}

/// Acquire raw series from the configured source and clean them.
pub fn load_series(config: &PipelineConfig) -> std::result::Result<Vec<TimeSeries>, AppError> {
    let raw = acquire(config)?;
    let series = clean_all(&raw, config.policy)?;
    tracing::info!(source = ?config.source, series = series.len(), "loaded series");
    Ok(series)
}

fn acquire(config: &PipelineConfig) -> std::result::Result<Vec<RawSeries>, AppError> {
    let (mut raw, mut bonds) = match config.source {
        DataSource::Fred => {
            let (fred, bonds) = if config.all_series {
                (MACRO_SERIES.to_vec(), Vec::new())
            } else {
                let columns = std::iter::once(config.target.as_str())
                    .chain(config.factors.iter().map(String::as_str));
                let resolved = catalog::resolve_columns(columns);
                if !resolved.unknown.is_empty() {
                    return Err(AppError::usage(format!(
                        "No FRED series or bond ticker known for column(s): {}. Use --source csv for custom series.",
                        resolved.unknown.join(", ")
                    )));
                }
                (resolved.fred, resolved.bonds)
            };
            let raw = if fred.is_empty() {
                Vec::new()
            } else {
                FredClient::from_env(config.fred.clone())?.fetch_all(&fred)?
            };
            (raw, bonds)
        }
        DataSource::Csv => {
            let path = config
                .input
                .as_deref()
                .ok_or_else(|| AppError::usage("`--source csv` requires `--input <file.csv>`."))?;
            (load_series_csv(path)?.series, Vec::new())
        }
        DataSource::Sample => (generate_sample(&config.sample)?.series, Vec::new()),
    };

    if config.bonds.include {
        merge_specs(&mut bonds, BOND_TICKERS);
    }
    // Series already supplied by the source take precedence over a download.
    bonds.retain(|spec| !raw.iter().any(|r| r.name == spec.label));
    if !bonds.is_empty() {
        raw.extend(BondClient::new(config.bonds.clone())?.fetch_all(&bonds)?);
    }
    Ok(raw)
}

fn merge_specs(into: &mut Vec<SeriesSpec>, extra: &[SeriesSpec]) {
    for spec in extra {
        if !into.contains(spec) {
            into.push(*spec);
        }
    }
}
