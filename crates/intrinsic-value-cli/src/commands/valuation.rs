use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use intrinsic_value_core::valuation::dcf::{default_growth_schedule, GrowthStage};
use intrinsic_value_core::valuation::recommendation;
use intrinsic_value_core::valuation::report::{render_markdown, ReportMeta};
use intrinsic_value_core::valuation::request::{self, ValuationRequest};

use crate::input;
use crate::output;

/// Arguments for a DCF valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcfArgs {
    /// Path to JSON input file with valuation parameters (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Company name for reports and summaries
    #[arg(long)]
    pub company: Option<String>,

    /// Valuation date (YYYY-MM-DD)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Most recent free cash flow
    #[arg(long, alias = "fcf")]
    pub base_fcf: Option<Decimal>,

    /// Growth stage as YEARS:RATE, repeatable in order (default 5:0.10 then 5:0.05)
    #[arg(long = "stage", value_parser = parse_stage)]
    pub stages: Vec<GrowthStage>,

    /// Perpetual growth rate after the projection window
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Discount rate (e.g. 0.12 for 12%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Total debt, same unit as free cash flow
    #[arg(long)]
    pub total_debt: Option<Decimal>,

    /// Cash and cash equivalents, same unit as free cash flow
    #[arg(long)]
    pub cash: Option<Decimal>,

    /// Shares outstanding
    #[arg(long)]
    pub shares: Option<Decimal>,

    /// Share capital (used with --face-value when --shares is not given)
    #[arg(long)]
    pub share_capital: Option<Decimal>,

    /// Face value of one share
    #[arg(long)]
    pub face_value: Option<Decimal>,

    /// Model error leeway for the value band (default 0.10)
    #[arg(long)]
    pub leeway: Option<Decimal>,

    /// Margin of safety for the buy target (default 0.30)
    #[arg(long)]
    pub margin_of_safety: Option<Decimal>,

    /// Reject per-share values above this ceiling
    #[arg(long)]
    pub max_value_per_share: Option<Decimal>,

    /// Current market price; enables the recommendation (overrides input file)
    #[arg(long)]
    pub current_price: Option<Decimal>,

    /// Emit the flat rounded summary instead of the full result envelope
    #[arg(long)]
    pub summary: bool,

    /// Write a markdown valuation report to this path
    #[arg(long)]
    pub report: Option<String>,

    /// Unit label for money columns in the report (e.g. "INR Cr")
    #[arg(long)]
    pub unit_label: Option<String>,
}

/// Arguments for classifying a price against a known intrinsic value
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct RecommendArgs {
    /// Intrinsic value per share
    #[arg(long)]
    pub intrinsic_value: Decimal,

    /// Current market price
    #[arg(long)]
    pub current_price: Decimal,
}

fn parse_stage(raw: &str) -> Result<GrowthStage, String> {
    let (years, rate) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected YEARS:RATE, got '{raw}'"))?;
    let years: u32 = years
        .trim()
        .parse()
        .map_err(|e| format!("invalid years in '{raw}': {e}"))?;
    let rate: Decimal = rate
        .trim()
        .parse()
        .map_err(|e| format!("invalid rate in '{raw}': {e}"))?;
    Ok(GrowthStage::new(years, rate))
}

fn request_from_flags(args: &DcfArgs) -> Result<ValuationRequest, Box<dyn std::error::Error>> {
    let growth_schedule = if args.stages.is_empty() {
        default_growth_schedule()
    } else {
        args.stages.clone()
    };

    Ok(ValuationRequest {
        company: args.company.clone(),
        as_of: args.as_of,
        base_free_cash_flow: args
            .base_fcf
            .ok_or("--base-fcf is required (or provide --input)")?,
        growth_schedule,
        terminal_growth_rate: args
            .terminal_growth
            .ok_or("--terminal-growth is required (or provide --input)")?,
        discount_rate: args.discount_rate,
        wacc: None,
        total_debt: args.total_debt.unwrap_or(Decimal::ZERO),
        cash_and_equivalents: args.cash.unwrap_or(Decimal::ZERO),
        shares_outstanding: args.shares,
        share_capital: args.share_capital,
        face_value: args.face_value,
        model_error_leeway: args
            .leeway
            .unwrap_or(intrinsic_value_core::valuation::dcf::DEFAULT_MODEL_ERROR_LEEWAY),
        margin_of_safety: args
            .margin_of_safety
            .unwrap_or(intrinsic_value_core::valuation::dcf::DEFAULT_MARGIN_OF_SAFETY),
        max_value_per_share: args.max_value_per_share,
        current_price: args.current_price,
    })
}

pub fn run_dcf(args: DcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut req: ValuationRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        request_from_flags(&args)?
    };

    if args.current_price.is_some() {
        req.current_price = args.current_price;
    }
    if args.company.is_some() {
        req.company = args.company.clone();
    }

    info!(
        company = req.company.as_deref().unwrap_or("-"),
        stages = req.growth_schedule.len(),
        "running DCF valuation"
    );
    let valuation = request::value_stock(&req)?;
    for w in &valuation.warnings {
        info!(warning = %w, "valuation warning");
    }

    if args.report.is_some() || args.summary {
        let inputs = req.prepare()?.inputs;

        if let Some(ref path) = args.report {
            let meta = ReportMeta {
                company: req.company.clone(),
                as_of: req.as_of.or(args.as_of),
                unit_label: args.unit_label.clone(),
            };
            let md = render_markdown(&valuation.result, &inputs, &meta);
            output::markdown::write_report(path, &md)?;
        }

        if args.summary {
            let summary = request::summarize(&valuation.result, &inputs, req.company.as_deref());
            return Ok(serde_json::to_value(summary)?);
        }
    }

    Ok(serde_json::to_value(valuation)?)
}

pub fn run_recommend(args: RecommendArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let out = recommendation::recommend_from_value(args.intrinsic_value, args.current_price);
    info!(signal = %out.recommendation, "classified market price");
    Ok(serde_json::to_value(out)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_stage() {
        assert_eq!(parse_stage("5:0.10").unwrap(), GrowthStage::new(5, dec!(0.10)));
        assert_eq!(parse_stage(" 3 : -0.05 ").unwrap(), GrowthStage::new(3, dec!(-0.05)));
        assert!(parse_stage("5").is_err());
        assert!(parse_stage("x:0.1").is_err());
        assert!(parse_stage("5:ten").is_err());
    }
}
