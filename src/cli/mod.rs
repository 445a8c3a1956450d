//! Command-line parsing for the macro factor yield model.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. Everything here is turned into a `PipelineConfig` by
//! `app::config_from_args`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{CleaningPolicy, DataSource};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rvf", version, about = "Macro factor model for Treasury yields with mispricing flags")]
pub struct Cli {
    /// Log at debug level (default is info). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Align series, fit the factor model, print diagnostics and flagged months.
    Fit(FitArgs),
    /// Print the mispriced months only (useful for scripting).
    Rank(FitArgs),
    /// Download/generate the raw monthly series and write them as CSV.
    Fetch(FetchArgs),
}

/// Where the series come from and how they are cleaned.
#[derive(Debug, Parser, Clone)]
pub struct SourceArgs {
    /// Data source.
    #[arg(short = 's', long, value_enum, default_value_t = DataSource::Fred)]
    pub source: DataSource,

    /// Input CSV for `--source csv` (a `date` column plus one column per series).
    #[arg(short = 'f', long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// What to do with values that are not valid numbers.
    #[arg(long, value_enum, default_value_t = CleaningPolicy::CoerceInvalidToMissing)]
    pub policy: CleaningPolicy,

    /// Fetch the full FRED catalogue instead of only the model's series.
    #[arg(long)]
    pub all_series: bool,

    /// Also download monthly closes for the bond ETFs and the 10Y yield index.
    #[arg(long)]
    pub bonds: bool,

    /// First observation date requested from FRED (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// HTTP request timeout in seconds (FRED and bond prices).
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Retries per series on transient HTTP failures.
    #[arg(long, default_value_t = 2)]
    pub retries: u32,

    /// Months of synthetic data for `--source sample`.
    #[arg(long, default_value_t = 240)]
    pub months: usize,

    /// Random seed for `--source sample`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Probability of a missing monthly observation in the synthetic sample.
    #[arg(long, default_value_t = 0.03)]
    pub gap_prob: f64,

    /// Probability of a planted yield shock in the synthetic sample.
    #[arg(long, default_value_t = 0.04)]
    pub shock_prob: f64,
}

/// Common options for fitting and ranking.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Target return column.
    #[arg(short = 't', long, default_value = "10Y_Treasury_Yield_returns")]
    pub target: String,

    /// Explanatory return columns (repeat or comma-separate).
    #[arg(
        long = "factor",
        value_delimiter = ',',
        default_values_t = ["CPI_returns".to_string(), "USD_EUR_Exchange_Rate_returns".to_string()]
    )]
    pub factors: Vec<String>,

    /// Quantile of |residual| above which a month is flagged.
    #[arg(short = 'q', long, default_value_t = 0.95)]
    pub quantile: f64,

    /// Smallest singular value ratio accepted before the model is degenerate.
    #[arg(long, default_value_t = 1e-10)]
    pub rank_tol: f64,

    /// Show at most N flagged months.
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Render an ASCII residual plot.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the full result table (values, returns, fitted, residuals) to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the mispriced rows to CSV.
    #[arg(long = "export-mispriced")]
    pub export_mispriced: Option<PathBuf>,

    /// Export coefficients, diagnostics and threshold to JSON.
    #[arg(long = "export-model")]
    pub export_model: Option<PathBuf>,
}

/// Options for writing raw series.
#[derive(Debug, Parser)]
pub struct FetchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub out: PathBuf,
}
