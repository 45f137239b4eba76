use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use intrinsic_value_core::valuation::multiples::{
    self, PbValuationInput, PeValuationInput, DEFAULT_PB_MARGIN_OF_SAFETY,
    DEFAULT_PE_MARGIN_OF_SAFETY,
};

use crate::input;

/// Arguments for a growth-adjusted P/E valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Earnings per share
    #[arg(long)]
    pub eps: Option<Decimal>,

    /// Industry or peer P/E ratio
    #[arg(long)]
    pub industry_pe: Option<Decimal>,

    /// Expected earnings growth (e.g. 0.12 for 12%)
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// Margin of safety for the buy target (default 0.10)
    #[arg(long)]
    pub margin_of_safety: Option<Decimal>,

    /// Current market price; enables the recommendation
    #[arg(long)]
    pub current_price: Option<Decimal>,
}

/// Arguments for a P/B valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PbArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Book value per share
    #[arg(long)]
    pub bvps: Option<Decimal>,

    /// Industry or peer P/B ratio
    #[arg(long)]
    pub industry_pb: Option<Decimal>,

    /// Margin of safety for the buy target (default 0.20)
    #[arg(long)]
    pub margin_of_safety: Option<Decimal>,

    /// Current market price; enables the recommendation
    #[arg(long)]
    pub current_price: Option<Decimal>,
}

pub fn run_pe(args: PeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pe_input: PeValuationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        PeValuationInput {
            earnings_per_share: args.eps.ok_or("--eps is required (or provide --input)")?,
            industry_pe: args
                .industry_pe
                .ok_or("--industry-pe is required (or provide --input)")?,
            growth_rate: args.growth_rate.unwrap_or(Decimal::ZERO),
            margin_of_safety: args.margin_of_safety.unwrap_or(DEFAULT_PE_MARGIN_OF_SAFETY),
            current_price: args.current_price,
        }
    };

    let result = multiples::pe_valuation(&pe_input)?;
    info!(
        value = %result.result.intrinsic_value_per_share,
        multiple = %result.result.applied_multiple,
        "P/E valuation"
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_pb(args: PbArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pb_input: PbValuationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        PbValuationInput {
            book_value_per_share: args.bvps.ok_or("--bvps is required (or provide --input)")?,
            industry_pb: args
                .industry_pb
                .ok_or("--industry-pb is required (or provide --input)")?,
            margin_of_safety: args.margin_of_safety.unwrap_or(DEFAULT_PB_MARGIN_OF_SAFETY),
            current_price: args.current_price,
        }
    };

    let result = multiples::pb_valuation(&pb_input)?;
    info!(value = %result.result.intrinsic_value_per_share, "P/B valuation");
    Ok(serde_json::to_value(result)?)
}
