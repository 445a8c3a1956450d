//! FRED API integration for macro and Treasury series.
//!
//! Only transport lives here: observations come back as raw `(date, text)`
//! pairs and cleaning is left to [`crate::align::clean`]. The client owns its
//! timeout/retry policy; the core never retries.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::align::RawSeries;
use crate::data::catalog::SeriesSpec;
use crate::data::http::{FetchError, USER_AGENT, build_client, with_retries};
use crate::domain::FredConfig;
use crate::error::AppError;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const OBS_LIMIT: usize = 100_000;

pub struct FredClient {
    client: Client,
    api_key: String,
    config: FredConfig,
}

impl FredClient {
    /// Read `FRED_API_KEY` from the environment (`.env` is loaded by `app::run`).
    pub fn from_env(config: FredConfig) -> Result<Self, AppError> {
        let api_key = std::env::var("FRED_API_KEY")
            .map_err(|_| AppError::usage("Missing FRED_API_KEY in environment (.env)."))?;
        Self::new(api_key, config)
    }

    pub fn new(api_key: impl Into<String>, config: FredConfig) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.timeout_secs, USER_AGENT)?,
            api_key: api_key.into(),
            config,
        })
    }

    /// Fetch every series in `specs`, stored under its label.
    ///
    /// Series that come back empty are skipped with a warning; it is an error
    /// only if nothing at all was retrieved.
    pub fn fetch_all(&self, specs: &[SeriesSpec]) -> Result<Vec<RawSeries>, AppError> {
        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            let observations = self.fetch_series(spec.id)?;
            if observations.is_empty() {
                tracing::warn!(series = spec.id, label = spec.label, "no observations, skipping");
                continue;
            }
            tracing::info!(series = spec.id, n = observations.len(), "fetched FRED series");
            out.push(RawSeries::new(spec.label, observations));
        }

        if out.is_empty() {
            return Err(AppError::acquisition(
                "No series were retrieved from FRED. Check the series ids and API key.",
            ));
        }
        Ok(out)
    }

    /// Fetch one series, retrying transient failures.
    pub fn fetch_series(&self, series_id: &str) -> Result<Vec<(NaiveDate, String)>, AppError> {
        with_retries(series_id, self.config.retries, || self.fetch_once(series_id))
    }

    fn fetch_once(&self, series_id: &str) -> Result<Vec<(NaiveDate, String)>, FetchError> {
        let mut req = self.client.get(BASE_URL).query(&[
            ("series_id", series_id),
            ("api_key", &self.api_key),
            ("file_type", "json"),
            ("sort_order", "asc"),
            ("limit", &OBS_LIMIT.to_string()),
        ]);

        if let Some(start) = self.config.observation_start {
            req = req.query(&[("observation_start", &start.to_string())]);
        }

        let resp = req.send().map_err(|e| {
            FetchError::Transient(AppError::acquisition(format!(
                "FRED request for {series_id} failed: {e}"
            )))
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(&format!("FRED request for {series_id}"), status));
        }

        let body: ObservationsResponse = resp.json().map_err(|e| {
            FetchError::Permanent(AppError::acquisition(format!(
                "Failed to parse FRED response for {series_id}: {e}"
            )))
        })?;

        parse_observations(series_id, body).map_err(FetchError::Permanent)
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

fn parse_observations(
    series_id: &str,
    body: ObservationsResponse,
) -> Result<Vec<(NaiveDate, String)>, AppError> {
    body.observations
        .into_iter()
        .map(|obs| {
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").map_err(|e| {
                AppError::acquisition(format!(
                    "Invalid FRED date '{}' for {series_id}: {e}",
                    obs.date
                ))
            })?;
            Ok((date, obs.value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_observation_payload_keeping_raw_values() {
        let body: ObservationsResponse = serde_json::from_str(
            r#"{"observations":[
                {"realtime_start":"2024-01-01","realtime_end":"2024-01-01","date":"2024-01-02","value":"3.95"},
                {"realtime_start":"2024-01-01","realtime_end":"2024-01-01","date":"2024-01-15","value":"."}
            ]}"#,
        )
        .unwrap();

        let obs = parse_observations("DGS10", body).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0], (NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "3.95".to_string()));
        assert_eq!(obs[1].1, ".");
    }

    #[test]
    fn missing_observations_key_is_empty() {
        let body: ObservationsResponse =
            serde_json::from_str(r#"{"error_code":400,"error_message":"Bad Request."}"#).unwrap();
        assert!(parse_observations("BOGUS", body).unwrap().is_empty());
    }

    #[test]
    fn bad_date_is_an_acquisition_error() {
        let body: ObservationsResponse =
            serde_json::from_str(r#"{"observations":[{"date":"01/02/2024","value":"1"}]}"#).unwrap();
        let err = parse_observations("DGS10", body).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
