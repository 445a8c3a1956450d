//! `rv-factors` library crate.
//!
//! The binary (`rvf`) is a thin wrapper around this library so that:
//!
//! - the core (align → regress → rank) is testable without spawning processes
//! - data sources and exports stay swappable collaborators
//! - code stays easy to navigate as the project grows

pub mod align;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod rank;
pub mod regress;
pub mod report;
