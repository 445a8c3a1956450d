//! Data acquisition collaborators: FRED, bond prices, synthetic sample,
//! series catalogues.

pub mod bonds;
pub mod catalog;
pub mod fred;
mod http;
pub mod sample;

pub use bonds::BondClient;
pub use catalog::{BOND_TICKERS, MACRO_SERIES, SeriesSpec};
pub use fred::FredClient;
pub use sample::{SampleData, generate_sample};
