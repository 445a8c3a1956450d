//! Synthetic monthly macro/yield sample.
//!
//! Produces the same shape of input FRED would (raw text values, `"."` for
//! missing months, series with different start dates) from a seeded RNG, so
//! the pipeline can run offline and tests can plant known mispricings.
//!
//! The 10Y yield's monthly return is generated from the CPI and EUR/USD
//! returns plus noise; a few months receive an extra shock of several noise
//! standard deviations. Those shock months are what the ranker should find.

use chrono::{Months, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::align::RawSeries;
use crate::domain::SampleConfig;
use crate::error::AppError;

/// Loadings used to generate the 10Y yield return.
pub const TRUE_INTERCEPT: f64 = 0.001;
pub const TRUE_BETA_CPI: f64 = 2.0;
pub const TRUE_BETA_FX: f64 = -0.4;

const NOISE_SD: f64 = 0.01;
const SHOCK_MIN_SD: f64 = 6.0;
const SHOCK_MAX_SD: f64 = 9.0;
/// The FX series starts this many months after the others.
const FX_START_OFFSET: usize = 6;

#[derive(Debug, Clone)]
pub struct SampleData {
    pub series: Vec<RawSeries>,
    /// Months whose yield return received a planted shock.
    pub shocks: Vec<NaiveDate>,
}

pub fn generate_sample(config: &SampleConfig) -> Result<SampleData, AppError> {
    if config.months < 3 {
        return Err(AppError::usage("Sample must span at least 3 months."));
    }
    if !(0.0..0.5).contains(&config.gap_prob) {
        return Err(AppError::usage("Sample gap probability must be within [0, 0.5)."));
    }
    if !(0.0..0.5).contains(&config.shock_prob) {
        return Err(AppError::usage("Sample shock probability must be within [0, 0.5)."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::usage(format!("Noise distribution error: {e}")))?;

    let start = NaiveDate::from_ymd_opt(2000, 1, 1)
        .ok_or_else(|| AppError::usage("Invalid sample start date."))?;
    let months: Vec<NaiveDate> = (0..config.months)
        .map(|i| start.checked_add_months(Months::new(i as u32)).unwrap_or(start))
        .collect();

    let mut cpi = Vec::with_capacity(config.months);
    let mut fx = Vec::with_capacity(config.months);
    let mut y10 = Vec::with_capacity(config.months);
    let mut fed = Vec::with_capacity(config.months);
    let mut shocks = Vec::new();

    let (mut cpi_level, mut fx_level, mut y_level, mut fed_level) = (170.0_f64, 1.10_f64, 5.0_f64, 4.0_f64);
    for (i, month) in months.iter().enumerate() {
        if i > 0 {
            let cpi_ret = 0.002 + 0.003 * normal.sample(&mut rng);
            let fx_ret = 0.02 * normal.sample(&mut rng);
            let mut y_ret = TRUE_INTERCEPT + TRUE_BETA_CPI * cpi_ret + TRUE_BETA_FX * fx_ret
                + NOISE_SD * normal.sample(&mut rng);

            if rng.gen_bool(config.shock_prob) {
                let size = rng.gen_range(SHOCK_MIN_SD..SHOCK_MAX_SD) * NOISE_SD;
                y_ret += if rng.gen_bool(0.5) { size } else { -size };
                shocks.push(*month);
            }

            cpi_level *= 1.0 + cpi_ret;
            fx_level *= 1.0 + fx_ret;
            y_level *= 1.0 + y_ret;
            fed_level = (fed_level + 0.1 * normal.sample(&mut rng)).max(0.05);
        }
        cpi.push(cpi_level);
        fx.push(fx_level);
        y10.push(y_level);
        fed.push(fed_level);
    }

    // Only the target carries no gaps: a gap there would smear a planted shock
    // across the interpolated months.
    let series = vec![
        to_raw("10Y_Treasury_Yield", &months, &y10, 0.0, 0, &mut rng),
        to_raw("CPI", &months, &cpi, config.gap_prob, 0, &mut rng),
        to_raw("USD_EUR_Exchange_Rate", &months, &fx, config.gap_prob, FX_START_OFFSET, &mut rng),
        to_raw("Fed_Funds_Rate", &months, &fed, config.gap_prob, 0, &mut rng),
    ];

    tracing::debug!(months = config.months, shocks = shocks.len(), seed = config.seed, "generated sample");

    Ok(SampleData { series, shocks })
}

fn to_raw(
    name: &str,
    months: &[NaiveDate],
    values: &[f64],
    gap_prob: f64,
    skip: usize,
    rng: &mut StdRng,
) -> RawSeries {
    let last = months.len() - 1;
    let observations = months
        .iter()
        .zip(values)
        .enumerate()
        .skip(skip)
        .map(|(i, (month, v))| {
            // Endpoints are always observed so every series spans its range.
            let text = if i != skip && i != last && rng.gen_bool(gap_prob) {
                ".".to_string()
            } else {
                format!("{v:.6}")
            };
            (*month, text)
        })
        .collect();
    RawSeries::new(name, observations)
}
