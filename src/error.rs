//! Error types.
//!
//! Two layers:
//! - `PipelineError`: typed failures of the core (align → regress → rank) and
//!   of the data collaborators. Every variant carries enough context (series or
//!   column name, row count) to diagnose the run.
//! - `AppError`: what the binary reports. It pairs a message with a process
//!   exit code (2 = usage/config/IO, 3 = data/model, 4 = acquisition).

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for core pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the alignment, regression and ranking stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A series or table has too few points for the requested computation.
    #[error("insufficient data for '{name}': {count} usable point(s), need at least {required}")]
    InsufficientData {
        name: String,
        count: usize,
        required: usize,
    },

    /// A requested column is not present in the aligned table.
    #[error("missing column '{column}' (table has {available} return column(s): {known})")]
    MissingColumn {
        column: String,
        available: usize,
        known: String,
    },

    /// The explanatory matrix is rank-deficient.
    #[error(
        "degenerate model: design matrix is rank-deficient \
         (rank {rank} of {columns}, condition ratio {ratio:.3e}) for factors [{factors}]"
    )]
    DegenerateModel {
        rank: usize,
        columns: usize,
        ratio: f64,
        factors: String,
    },

    /// Quantile computation on an empty residual set.
    #[error("empty result: no residuals to rank ({context})")]
    EmptyResult { context: String },

    /// A raw value rejected by the `reject` cleaning policy.
    #[error("invalid value '{raw}' in series '{series}' at {date}")]
    InvalidValue {
        series: String,
        date: NaiveDate,
        raw: String,
    },

    /// Two input series share a name.
    #[error("duplicate series name '{0}'")]
    DuplicateSeries(String),

    /// A table failed its construction invariants.
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// A configuration parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error reported by the binary, with an exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Usage, configuration or filesystem error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Data acquisition (network/API) error.
    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let code = match err {
            PipelineError::InvalidConfig(_) => 2,
            _ => 3,
        };
        Self::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_exit_codes() {
        let data: AppError = PipelineError::EmptyResult {
            context: "residuals".to_string(),
        }
        .into();
        assert_eq!(data.exit_code(), 3);

        let config: AppError = PipelineError::InvalidConfig("quantile".to_string()).into();
        assert_eq!(config.exit_code(), 2);
    }

    #[test]
    fn insufficient_data_message_names_series() {
        let err = PipelineError::InsufficientData {
            name: "CPI".to_string(),
            count: 1,
            required: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("CPI"), "{msg}");
        assert!(msg.contains("1 usable"), "{msg}");
    }
}
