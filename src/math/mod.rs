//! Mathematical utilities: least squares and quantiles.

pub mod ols;
pub mod quantile;

pub use ols::*;
pub use quantile::*;
