//! Model JSON export.
//!
//! The model file is the portable summary of a run: which columns were used,
//! the coefficient vector, fit diagnostics and the mispricing threshold.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Coefficients, FitQuality, MispricedSet, RegressionResult};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub target: String,
    pub factors: Vec<String>,
    pub first_month: Option<NaiveDate>,
    pub last_month: Option<NaiveDate>,
    pub coefficients: Coefficients,
    pub fit_quality: FitQuality,
    pub quantile: f64,
    pub threshold: f64,
    pub flagged: Vec<NaiveDate>,
}

impl ModelFile {
    pub fn new(result: &RegressionResult, mispriced: &MispricedSet) -> Self {
        let dates = result.dates();
        Self {
            tool: "rvf".to_string(),
            target: result.target().to_string(),
            factors: result.factors().to_vec(),
            first_month: dates.first().copied(),
            last_month: dates.last().copied(),
            coefficients: result.coefficients().clone(),
            fit_quality: result.quality().clone(),
            quantile: mispriced.quantile(),
            threshold: mispriced.threshold(),
            flagged: mispriced.indices().iter().map(|&i| dates[i]).collect(),
        }
    }
}

/// Write a model JSON file.
pub fn write_model_json(
    path: &Path,
    result: &RegressionResult,
    mispriced: &MispricedSet,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::usage(format!("Failed to create model JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &ModelFile::new(result, mispriced))
        .map_err(|e| AppError::usage(format!("Failed to write model JSON: {e}")))?;

    tracing::info!(path = %path.display(), "wrote model");
    Ok(())
}
