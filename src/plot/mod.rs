//! Terminal plots.

pub mod ascii;

pub use ascii::render_residual_plot;
