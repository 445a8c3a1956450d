//! Terminal output: run summary and mispriced table.

use crate::app::pipeline::RunOutput;
use crate::domain::{MispricedSet, RegressionResult};

/// Format the full run summary (dataset stats + fit diagnostics + threshold).
pub fn format_run_summary(run: &RunOutput) -> String {
    let result = &run.result;
    let table = result.table();
    let quality = result.quality();
    let mut out = String::new();

    out.push_str("=== rvf - Macro Factor Yield Model ===\n");
    out.push_str(&format!("Source: {:?}\n", run.source));
    out.push_str(&format!(
        "Series: n={} | columns={} | rows={}",
        run.series.len(),
        table.columns().len(),
        table.n_rows()
    ));
    if let (Some(first), Some(last)) = (table.dates().first(), table.dates().last()) {
        out.push_str(&format!(" | months=[{first}, {last}]"));
    }
    out.push('\n');

    out.push_str("\nModel:\n");
    out.push_str(&format!("- target : {}\n", result.target()));
    out.push_str(&format!("- factors: [{}]\n", result.factors().join(", ")));
    out.push_str(&format!(
        "- n={} k={} SSE={:.6} RMSE={:.6} R2={}\n",
        quality.n,
        quality.k,
        quality.sse,
        quality.rmse,
        quality
            .r_squared
            .map(|r| format!("{r:.4}"))
            .unwrap_or_else(|| "n/a".to_string())
    ));

    out.push_str("\nCoefficients:\n");
    let coefs = result.coefficients();
    out.push_str(&format!("  {:<36} {:>14.8}\n", "intercept", coefs.intercept));
    for w in &coefs.weights {
        out.push_str(&format!("  {:<36} {:>14.8}\n", truncate(&w.factor, 36), w.beta));
    }

    out.push_str(&format!(
        "\nMispricing: |residual| > q{:.2} = {:.6} → {} of {} months flagged\n",
        run.mispriced.quantile(),
        run.mispriced.threshold(),
        run.mispriced.len(),
        result.len()
    ));

    out
}

/// Format the flagged months, largest |residual| first, at most `top_n` rows.
pub fn format_mispriced(result: &RegressionResult, mispriced: &MispricedSet, top_n: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!("Mispriced months ({}):\n", result.target()));
    out.push_str(
        format!(
            "{:<10} {:>14} {:>14} {:>14} {:<5}\n",
            "month", "actual", "fitted", "residual", "side"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<14} {:-<14} {:-<14} {:-<5}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    if mispriced.is_empty() {
        out.push_str("(none)\n");
        return out;
    }

    for row in mispriced.by_magnitude(result).into_iter().take(top_n) {
        let residual = result.residuals()[row];
        // Actual return above the model means yields rose more than explained.
        let side = if residual > 0.0 { "high" } else { "low" };
        out.push_str(
            format!(
                "{:<10} {:>14.6} {:>14.6} {:>14.6} {:<5}",
                result.dates()[row].format("%Y-%m"),
                result.actual()[row],
                result.fitted()[row],
                residual,
                side
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{AlignedTable, Column, ColumnId};
    use crate::rank::identify_mispricing;
    use crate::regress::fit_factor_model;

    fn fixture() -> (RegressionResult, MispricedSet) {
        let table = AlignedTable::new(
            (1..=5).map(|m| NaiveDate::from_ymd_opt(2021, m, 1).unwrap()).collect(),
            vec![Column {
                id: ColumnId::returns("Y"),
                values: vec![0.0, 0.0, 0.0, -1.0, 0.0],
            }],
        )
        .unwrap();
        let result = fit_factor_model(table, "Y_returns", &[], 1e-10).unwrap();
        let mispriced = identify_mispricing(&result, 0.95).unwrap();
        (result, mispriced)
    }

    #[test]
    fn mispriced_table_lists_flagged_month() {
        let (result, mispriced) = fixture();
        let text = format_mispriced(&result, &mispriced, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("2021-04"), "{text}");
        assert!(lines[3].ends_with("low"), "{text}");
    }

    #[test]
    fn empty_set_prints_none() {
        let (result, _) = fixture();
        let none = MispricedSet::new(0.95, 10.0, Vec::new());
        assert!(format_mispriced(&result, &none, 10).ends_with("(none)\n"));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
