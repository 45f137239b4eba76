use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::error::IntrinsicError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::IntrinsicResult;

use super::recommendation::{recommend_from_value, RecommendationOutput};

/// Default haircuts from intrinsic value to the buy target.
pub const DEFAULT_PE_MARGIN_OF_SAFETY: Rate = dec!(0.10);
pub const DEFAULT_PB_MARGIN_OF_SAFETY: Rate = dec!(0.20);

const HIGH_MULTIPLE: Decimal = dec!(50);

fn default_pe_margin() -> Rate {
    DEFAULT_PE_MARGIN_OF_SAFETY
}

fn default_pb_margin() -> Rate {
    DEFAULT_PB_MARGIN_OF_SAFETY
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleMethod {
    PriceEarnings,
    PriceBook,
}

impl fmt::Display for MultipleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultipleMethod::PriceEarnings => write!(f, "P/E"),
            MultipleMethod::PriceBook => write!(f, "P/B"),
        }
    }
}

/// Input for a growth-adjusted P/E valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeValuationInput {
    pub earnings_per_share: Money,
    /// Peer or sector P/E ratio
    pub industry_pe: Decimal,
    /// Expected earnings growth as a decimal (0.12 = 12%); scales the multiple
    #[serde(default)]
    pub growth_rate: Rate,
    #[serde(default = "default_pe_margin")]
    pub margin_of_safety: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
}

/// Input for a P/B valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PbValuationInput {
    pub book_value_per_share: Money,
    /// Peer or sector P/B ratio
    pub industry_pb: Decimal,
    #[serde(default = "default_pb_margin")]
    pub margin_of_safety: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleValuationOutput {
    pub method: MultipleMethod,
    /// Multiple actually applied after any growth adjustment
    pub applied_multiple: Decimal,
    /// EPS or book value per share
    pub per_share_metric: Money,
    pub intrinsic_value_per_share: Money,
    pub buy_target_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendationOutput>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Intrinsic value as EPS times the industry P/E scaled by `(1 + growth)`.
pub fn pe_valuation(
    input: &PeValuationInput,
) -> IntrinsicResult<ComputationOutput<MultipleValuationOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    check_multiple("industry_pe", input.industry_pe)?;
    check_margin(input.margin_of_safety)?;
    if input.growth_rate < dec!(-1) {
        return Err(IntrinsicError::InvalidInput {
            field: "growth_rate".into(),
            reason: format!("growth_rate ({}) is below -100%", input.growth_rate),
        });
    }

    let applied_multiple = checked(
        Decimal::ONE
            .checked_add(input.growth_rate)
            .and_then(|g| input.industry_pe.checked_mul(g)),
        "growth-adjusted P/E",
        input.industry_pe,
    )?;
    if input.earnings_per_share <= Decimal::ZERO {
        warnings.push(format!(
            "Earnings per share is {}; a P/E multiple gives no positive value",
            input.earnings_per_share
        ));
    }

    let output = value_from_multiple(
        MultipleMethod::PriceEarnings,
        input.earnings_per_share,
        applied_multiple,
        input.margin_of_safety,
        input.current_price,
        &mut warnings,
    )?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "P/E multiple adjusted for expected growth",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Intrinsic value as book value per share times the industry P/B.
pub fn pb_valuation(
    input: &PbValuationInput,
) -> IntrinsicResult<ComputationOutput<MultipleValuationOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    check_multiple("industry_pb", input.industry_pb)?;
    check_margin(input.margin_of_safety)?;
    if input.book_value_per_share <= Decimal::ZERO {
        warnings.push(format!(
            "Book value per share is {}; equity is negative or nil on the balance sheet",
            input.book_value_per_share
        ));
    }

    let output = value_from_multiple(
        MultipleMethod::PriceBook,
        input.book_value_per_share,
        input.industry_pb,
        input.margin_of_safety,
        input.current_price,
        &mut warnings,
    )?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "P/B multiple",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn value_from_multiple(
    method: MultipleMethod,
    per_share_metric: Money,
    applied_multiple: Decimal,
    margin_of_safety: Rate,
    current_price: Option<Money>,
    warnings: &mut Vec<String>,
) -> IntrinsicResult<MultipleValuationOutput> {
    if applied_multiple > HIGH_MULTIPLE {
        warnings.push(format!(
            "Applied {method} of {} is above {HIGH_MULTIPLE}; verify the peer multiple",
            applied_multiple.round_dp(2)
        ));
    }

    let intrinsic_value_per_share = checked(
        per_share_metric.checked_mul(applied_multiple),
        "intrinsic value per share",
        per_share_metric,
    )?;
    let buy_target_price = checked(
        intrinsic_value_per_share.checked_mul(Decimal::ONE - margin_of_safety),
        "buy target price",
        intrinsic_value_per_share,
    )?;

    let recommendation = match current_price {
        Some(price) => Some(recommend_from_value(intrinsic_value_per_share, price)),
        None => {
            warnings.push("No market price supplied; recommendation omitted".into());
            None
        }
    };

    Ok(MultipleValuationOutput {
        method,
        applied_multiple,
        per_share_metric,
        intrinsic_value_per_share,
        buy_target_price,
        recommendation,
    })
}

fn check_multiple(field: &str, multiple: Decimal) -> IntrinsicResult<()> {
    if multiple <= Decimal::ZERO {
        return Err(IntrinsicError::InvalidInput {
            field: field.into(),
            reason: format!("{field} ({multiple}) must be positive"),
        });
    }
    Ok(())
}

fn check_margin(margin_of_safety: Rate) -> IntrinsicResult<()> {
    if margin_of_safety < Decimal::ZERO || margin_of_safety > Decimal::ONE {
        return Err(IntrinsicError::InvalidInput {
            field: "margin_of_safety".into(),
            reason: format!("margin_of_safety ({margin_of_safety}) must be between 0 and 1"),
        });
    }
    Ok(())
}

fn checked(value: Option<Decimal>, context: &str, last_value: Decimal) -> IntrinsicResult<Decimal> {
    value.ok_or_else(|| IntrinsicError::Overflow {
        context: context.into(),
        last_value,
    })
}
