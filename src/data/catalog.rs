//! Series catalogues: FRED series id or bond ticker → column label.
//!
//! Labels are the series names used throughout the pipeline (and therefore
//! the column names in the aligned table: `CPI`, `CPI_returns`, ...).

/// One remote series (FRED id or market ticker) and the label it is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesSpec {
    pub id: &'static str,
    pub label: &'static str,
}

const fn spec(id: &'static str, label: &'static str) -> SeriesSpec {
    SeriesSpec { id, label }
}

/// Treasury yields, policy rates, inflation, money, credit, activity and FX.
pub const MACRO_SERIES: &[SeriesSpec] = &[
    spec("DGS2", "2Y_Treasury_Yield"),
    spec("DGS5", "5Y_Treasury_Yield"),
    spec("DGS10", "10Y_Treasury_Yield"),
    spec("DGS30", "30Y_Treasury_Yield"),
    spec("FEDFUNDS", "Fed_Funds_Rate"),
    spec("RPONTSYD", "Overnight_Repo_Rate"),
    spec("CPIAUCSL", "CPI"),
    spec("CPILFESL", "Core_CPI"),
    spec("PCEPI", "PCE_Inflation"),
    spec("T5YIFR", "5Y_Inflation_Expectation"),
    spec("M2SL", "M2_Money_Supply"),
    spec("TEDRATE", "TED_Spread"),
    spec("BAMLH0A0HYM2", "High_Yield_Spread"),
    spec("A191RL1Q225SBEA", "GDP_Growth"),
    spec("UNRATE", "Unemployment_Rate"),
    spec("INDPRO", "Industrial_Production"),
    spec("RSAFS", "Retail_Sales"),
    spec("DEXUSEU", "USD_EUR_Exchange_Rate"),
];

/// Bond ETFs and the 10Y yield index, as monthly closes.
pub const BOND_TICKERS: &[SeriesSpec] = &[
    spec("^TNX", "TNX"),
    spec("BND", "BND"),
    spec("TLT", "TLT"),
    spec("BIL", "BIL"),
    spec("SHY", "SHY"),
    spec("IEF", "IEF"),
    spec("LQD", "LQD"),
];

fn lookup(catalogue: &[SeriesSpec], name: &str) -> Option<SeriesSpec> {
    catalogue
        .iter()
        .copied()
        .find(|s| s.label == name || s.id.eq_ignore_ascii_case(name))
}

/// Look up a FRED catalogue entry by label or by FRED id.
pub fn find(name: &str) -> Option<SeriesSpec> {
    lookup(MACRO_SERIES, name)
}

/// Look up a bond entry by label or ticker.
pub fn find_bond(name: &str) -> Option<SeriesSpec> {
    lookup(BOND_TICKERS, name)
}

/// Remote series needed for a set of column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub fred: Vec<SeriesSpec>,
    pub bonds: Vec<SeriesSpec>,
    /// Column names found in neither catalogue.
    pub unknown: Vec<String>,
}

/// Catalogue entries needed for the given column names (in order, deduplicated).
///
/// Column names may carry the `_returns` suffix. Unknown names are collected
/// so the caller can report them together.
pub fn resolve_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Resolved {
    let mut out = Resolved::default();
    for col in columns {
        let series = crate::domain::ColumnId::parse(col).series;
        if let Some(s) = find(&series) {
            if !out.fred.contains(&s) {
                out.fred.push(s);
            }
        } else if let Some(s) = find_bond(&series) {
            if !out.bonds.contains(&s) {
                out.bonds.push(s);
            }
        } else {
            out.unknown.push(col.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique_across_catalogues() {
        let mut labels: Vec<&str> = MACRO_SERIES.iter().chain(BOND_TICKERS).map(|s| s.label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), MACRO_SERIES.len() + BOND_TICKERS.len());
    }

    #[test]
    fn resolves_default_model_columns() {
        let resolved = resolve_columns([
            "10Y_Treasury_Yield_returns",
            "CPI_returns",
            "USD_EUR_Exchange_Rate_returns",
            "CPI",
        ]);
        assert!(resolved.unknown.is_empty());
        assert!(resolved.bonds.is_empty());
        let ids: Vec<&str> = resolved.fred.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["DGS10", "CPIAUCSL", "DEXUSEU"]);
    }

    #[test]
    fn bond_columns_resolve_to_tickers() {
        let resolved = resolve_columns(["TLT_returns", "CPI_returns", "TNX_returns"]);
        let tickers: Vec<&str> = resolved.bonds.iter().map(|s| s.id).collect();
        assert_eq!(tickers, vec!["TLT", "^TNX"]);
        assert_eq!(resolved.fred.len(), 1);
    }

    #[test]
    fn reports_unknown_columns() {
        let resolved = resolve_columns(["Gold_returns"]);
        assert_eq!(resolved.unknown, vec!["Gold_returns".to_string()]);
    }

    #[test]
    fn finds_by_fred_id() {
        assert_eq!(find("dgs10").map(|s| s.label), Some("10Y_Treasury_Yield"));
    }
}
