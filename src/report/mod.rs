//! Reporting utilities: formatted terminal output.
//!
//! We keep formatting code in one place so the pipeline stays free of
//! presentation concerns and output changes are localized.

pub mod format;

pub use format::*;
