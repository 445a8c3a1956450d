//! Bond ETF and yield-index prices from the Yahoo Finance chart API.
//!
//! Monthly bars are requested over the full history; the close of each bar is
//! the month's value. Closes come back as raw text like FRED values do
//! (`"."` when the bar has no close), so the cleaning policy applies to them.

use chrono::{DateTime, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::align::RawSeries;
use crate::data::catalog::SeriesSpec;
use crate::data::http::{FetchError, build_client, with_retries};
use crate::domain::BondConfig;
use crate::error::AppError;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
/// The chart endpoint throttles requests that do not look like a browser.
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub struct BondClient {
    client: Client,
    config: BondConfig,
}

impl BondClient {
    pub fn new(config: BondConfig) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.timeout_secs, BROWSER_AGENT)?,
            config,
        })
    }

    /// Fetch monthly closes for every ticker in `specs`, stored under its label.
    pub fn fetch_all(&self, specs: &[SeriesSpec]) -> Result<Vec<RawSeries>, AppError> {
        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            let observations = self.fetch_series(spec.id)?;
            if observations.is_empty() {
                tracing::warn!(ticker = spec.id, "no price history, skipping");
                continue;
            }
            tracing::info!(ticker = spec.id, n = observations.len(), "fetched bond prices");
            out.push(RawSeries::new(spec.label, observations));
        }

        if out.is_empty() && !specs.is_empty() {
            return Err(AppError::acquisition("No bond price history was retrieved."));
        }
        Ok(out)
    }

    /// Monthly closes for one ticker, retrying transient failures.
    pub fn fetch_series(&self, ticker: &str) -> Result<Vec<(NaiveDate, String)>, AppError> {
        with_retries(ticker, self.config.retries, || self.fetch_once(ticker))
    }

    fn fetch_once(&self, ticker: &str) -> Result<Vec<(NaiveDate, String)>, FetchError> {
        let resp = self
            .client
            .get(format!("{BASE_URL}/{ticker}"))
            .query(&[("range", "max"), ("interval", "1mo")])
            .send()
            .map_err(|e| {
                FetchError::Transient(AppError::acquisition(format!(
                    "Price request for {ticker} failed: {e}"
                )))
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(&format!("Price request for {ticker}"), status));
        }

        let body: ChartResponse = resp.json().map_err(|e| {
            FetchError::Permanent(AppError::acquisition(format!(
                "Failed to parse price response for {ticker}: {e}"
            )))
        })?;

        parse_chart(ticker, body).map_err(FetchError::Permanent)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn parse_chart(ticker: &str, body: ChartResponse) -> Result<Vec<(NaiveDate, String)>, AppError> {
    if let Some(err) = body.chart.error {
        return Err(AppError::acquisition(format!(
            "Price API error for {ticker}: {} {}",
            err.code, err.description
        )));
    }

    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if closes.len() != result.timestamp.len() {
        return Err(AppError::acquisition(format!(
            "Price response for {ticker} has {} timestamps but {} closes",
            result.timestamp.len(),
            closes.len()
        )));
    }

    result
        .timestamp
        .iter()
        .zip(closes)
        .map(|(&ts, close)| {
            let date = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| AppError::acquisition(format!("Invalid timestamp {ts} for {ticker}")))?
                .date_naive();
            let text = close.map_or_else(|| ".".to_string(), |v| v.to_string());
            Ok((date, text))
        })
        .collect()
}
