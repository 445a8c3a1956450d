//! Input/output helpers.
//!
//! - wide CSV ingest (`ingest`)
//! - table and series exports (`export`)
//! - model JSON (`model`)

pub mod export;
pub mod ingest;
pub mod model;

pub use export::*;
pub use ingest::*;
pub use model::*;
