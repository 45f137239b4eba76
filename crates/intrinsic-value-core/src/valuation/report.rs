//! Markdown rendering of a completed valuation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::types::{round_money, round_percent, to_percent};

use super::dcf::{ValuationInputs, ValuationResult};

/// Descriptive context printed in the report header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportMeta {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    /// Unit of the money columns, e.g. "INR Cr"
    #[serde(default)]
    pub unit_label: Option<String>,
}

fn money(v: Decimal) -> String {
    format!("{:.2}", round_money(v))
}

fn pct(rate: Decimal) -> String {
    format!("{:.1}%", round_percent(to_percent(rate)))
}

/// Render the projection, terminal value, equity bridge, value band and (if
/// present) recommendation as a markdown document.
pub fn render_markdown(
    result: &ValuationResult,
    inputs: &ValuationInputs,
    meta: &ReportMeta,
) -> String {
    let mut md = String::new();
    let company = meta.company.as_deref().unwrap_or("Company");
    let unit = meta.unit_label.as_deref().unwrap_or("currency units");

    // Writing to a String cannot fail.
    let _ = writeln!(md, "# {company}: DCF Intrinsic Value");
    if let Some(date) = meta.as_of {
        let _ = writeln!(md, "\n_Valuation date: {date}_");
    }
    let _ = writeln!(md, "\nAll values in {unit} unless noted.\n");

    let _ = writeln!(md, "## Free Cash Flow Projection\n");
    let _ = writeln!(
        md,
        "| Year | Growth | Projected FCF | Discount Factor | Present Value |"
    );
    let _ = writeln!(md, "|------|--------|---------------|-----------------|---------------|");
    let rows = result
        .projected_fcf
        .iter()
        .zip(&result.discount_factors)
        .zip(&result.present_value_per_year);
    for (year, ((fcf, factor), pv)) in (1u32..).zip(rows) {
        let growth = inputs
            .growth_rate_for_year(year)
            .map(pct)
            .unwrap_or_default();
        let _ = writeln!(
            md,
            "| {year} | {growth} | {} | {:.4} | {} |",
            money(*fcf),
            factor,
            money(*pv),
        );
    }

    let n = result.projection_years();
    let _ = writeln!(md, "\n## Terminal Value\n");
    let _ = writeln!(md, "| Metric | Value | Formula |");
    let _ = writeln!(md, "|--------|-------|---------|");
    let _ = writeln!(
        md,
        "| Terminal Year Cash Flow | {} | Last projected FCF |",
        money(result.terminal_year_fcf)
    );
    let _ = writeln!(
        md,
        "| Terminal Value | {} | = Terminal CF × (1 + g) / (r - g) |",
        money(result.terminal_value)
    );
    let _ = writeln!(
        md,
        "| Present Value of Terminal Value | {} | = Terminal Value / (1 + r)^{n} |",
        money(result.present_value_of_terminal_value)
    );
    let _ = writeln!(
        md,
        "\n- g = terminal growth rate ({})\n- r = discount rate ({})\n- n = projection years ({n})",
        pct(inputs.terminal_growth_rate),
        pct(inputs.discount_rate),
    );

    let _ = writeln!(md, "\n## Intrinsic Value\n");
    let _ = writeln!(md, "| Item | Value | Formula |");
    let _ = writeln!(md, "|------|-------|---------|");
    let rows = [
        ("Total PV of Cash Flows", money(result.sum_of_present_values), "Sum of yearly PVs"),
        ("PV of Terminal Value", money(result.present_value_of_terminal_value), "From above"),
        ("Enterprise Value", money(result.enterprise_value), "= PV of Cash Flows + PV of Terminal Value"),
        ("Total Debt", money(inputs.total_debt), "Balance sheet"),
        ("Cash & Equivalents", money(inputs.cash_and_equivalents), "Balance sheet"),
        ("Net Debt", money(result.net_debt), "= Total Debt - Cash"),
        ("Equity Value", money(result.equity_value), "= Enterprise Value - Net Debt"),
        ("Shares Outstanding", result.shares_outstanding.normalize().to_string(), "Fully diluted"),
        ("Intrinsic Value per Share", money(result.intrinsic_value_per_share), "= Equity Value / Shares"),
    ];
    for (item, value, formula) in rows {
        let _ = writeln!(md, "| {item} | {value} | {formula} |");
    }
    let _ = writeln!(
        md,
        "\nTerminal value is {} of enterprise value.",
        pct(result.terminal_value_share)
    );

    let _ = writeln!(md, "\n## Intrinsic Value Band\n");
    let _ = writeln!(md, "| Metric | Value |");
    let _ = writeln!(md, "|--------|-------|");
    let _ = writeln!(md, "| Model Error Leeway | {} |", pct(inputs.model_error_leeway));
    let _ = writeln!(md, "| Lower Band | {} |", money(result.lower_band));
    let _ = writeln!(md, "| Upper Band | {} |", money(result.upper_band));
    let _ = writeln!(md, "| Margin of Safety | {} |", pct(inputs.margin_of_safety));
    let _ = writeln!(md, "| Buy Below | {} |", money(result.buy_target_price));

    if let Some(rec) = &result.recommendation {
        let _ = writeln!(md, "\n## Recommendation\n");
        let _ = writeln!(md, "**Recommendation:** {}", rec.recommendation);
        let _ = writeln!(md, "**Confidence:** {}", rec.confidence);
        let _ = writeln!(md, "**Current Price:** {}", money(rec.current_price));
        let _ = writeln!(
            md,
            "**Upside Potential:** {:.1}%",
            round_percent(rec.upside_percent)
        );
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::dcf::compute;
    use rust_decimal_macros::dec;

    fn sample() -> (ValuationResult, ValuationInputs) {
        let inputs = ValuationInputs::new(dec!(1000), dec!(0.02), dec!(0.12), dec!(100))
            .with_balance_sheet(dec!(300), dec!(100));
        (compute(&inputs).unwrap(), inputs)
    }

    #[test]
    fn test_report_sections() {
        let (result, inputs) = sample();
        let meta = ReportMeta {
            company: Some("Acme".into()),
            as_of: NaiveDate::from_ymd_opt(2024, 3, 31),
            unit_label: Some("INR Cr".into()),
        };
        let md = render_markdown(&result, &inputs, &meta);

        assert!(md.starts_with("# Acme: DCF Intrinsic Value"));
        assert!(md.contains("_Valuation date: 2024-03-31_"));
        assert!(md.contains("All values in INR Cr"));
        assert!(md.contains("| 1 | 10.0% | 1100.00 |"));
        assert!(md.contains("| 6 | 5.0% |"));
        assert!(md.contains("| Net Debt | 200.00 |"));
        assert!(md.contains("r = discount rate (12.0%)"));
        assert!(!md.contains("## Recommendation"));
    }

    #[test]
    fn test_report_includes_recommendation() {
        let (result, inputs) = sample();
        let result = result.with_recommendation(dec!(100));
        let md = render_markdown(&result, &inputs, &ReportMeta::default());
        assert!(md.starts_with("# Company: DCF Intrinsic Value"));
        assert!(md.contains("**Recommendation:** STRONG BUY"));
        assert!(md.contains("**Confidence:** HIGH"));
    }

    #[test]
    fn test_report_tolerates_mismatched_series() {
        let (mut result, inputs) = sample();
        result.discount_factors.truncate(3);
        let md = render_markdown(&result, &inputs, &ReportMeta::default());
        assert!(md.contains("| 3 | 10.0% |"));
        assert!(!md.contains("| 4 | 10.0% |"));
    }

    #[test]
    fn test_report_extreme_rates_render() {
        let (mut result, mut inputs) = sample();
        inputs.model_error_leeway = Decimal::MAX;
        result.terminal_value_share = Decimal::MIN;
        let md = render_markdown(&result, &inputs, &ReportMeta::default());
        assert!(md.contains(&format!("| Model Error Leeway | {:.1}% |", Decimal::MAX)));
    }
}
