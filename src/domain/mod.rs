//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - monthly input series (`TimeSeries`) and the cleaning policy
//! - the aligned table and its typed column ids
//! - regression and mispricing outputs
//! - the run configuration (`PipelineConfig`)

pub mod types;

pub use types::*;
