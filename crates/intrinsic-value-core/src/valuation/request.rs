//! Flat request/response boundary around the DCF engine, used by the CLI and
//! the Node bindings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::IntrinsicError;
use crate::types::{
    round_money, round_percent, to_percent, with_metadata, ComputationOutput, Money, Rate, Shares,
};
use crate::IntrinsicResult;

use super::dcf::{
    compute, default_growth_schedule, GrowthStage, ValuationInputs, ValuationResult,
    DEFAULT_MARGIN_OF_SAFETY, DEFAULT_MODEL_ERROR_LEEWAY,
};
use super::recommendation::{Confidence, Recommendation};
use super::wacc::{calculate_wacc, WaccInput};

const TERMINAL_VALUE_WARNING_SHARE: Rate = dec!(0.75);

fn default_model_error_leeway() -> Rate {
    DEFAULT_MODEL_ERROR_LEEWAY
}

fn default_margin_of_safety() -> Rate {
    DEFAULT_MARGIN_OF_SAFETY
}

/// How the share count was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareCount {
    Outstanding(Shares),
    /// Balance-sheet share capital divided by the face value of one share
    FromCapital { share_capital: Money, face_value: Money },
}

impl ShareCount {
    pub fn shares(&self) -> IntrinsicResult<Shares> {
        match *self {
            ShareCount::Outstanding(shares) => Ok(shares),
            ShareCount::FromCapital {
                share_capital,
                face_value,
            } => {
                if face_value <= Decimal::ZERO {
                    return Err(IntrinsicError::assumption(
                        "face_value",
                        format!("face_value ({face_value}) must be positive"),
                    ));
                }
                share_capital
                    .checked_div(face_value)
                    .ok_or_else(|| IntrinsicError::Overflow {
                        context: "share_capital / face_value".into(),
                        last_value: share_capital,
                    })
            }
        }
    }
}

/// One valuation request as it arrives from JSON or CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    pub base_free_cash_flow: Money,
    #[serde(default = "default_growth_schedule")]
    pub growth_schedule: Vec<GrowthStage>,
    pub terminal_growth_rate: Rate,
    /// Explicit discount rate; takes precedence over `wacc`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    /// Derive the discount rate via CAPM when `discount_rate` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wacc: Option<WaccInput>,
    #[serde(default)]
    pub total_debt: Money,
    #[serde(default)]
    pub cash_and_equivalents: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Shares>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_capital: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_value: Option<Money>,
    #[serde(default = "default_model_error_leeway")]
    pub model_error_leeway: Rate,
    #[serde(default = "default_margin_of_safety")]
    pub margin_of_safety: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_per_share: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
}

/// Engine inputs resolved from a request, with the warnings raised on the way.
#[derive(Debug, Clone)]
pub struct PreparedValuation {
    pub inputs: ValuationInputs,
    pub warnings: Vec<String>,
}

impl ValuationRequest {
    /// Resolve the share count. A direct count wins over share capital.
    pub fn share_count(&self) -> IntrinsicResult<ShareCount> {
        match (self.shares_outstanding, self.share_capital, self.face_value) {
            (Some(shares), _, _) => Ok(ShareCount::Outstanding(shares)),
            (None, Some(share_capital), Some(face_value)) => Ok(ShareCount::FromCapital {
                share_capital,
                face_value,
            }),
            _ => Err(IntrinsicError::assumption(
                "shares_outstanding",
                "provide shares_outstanding, or share_capital together with face_value",
            )),
        }
    }

    /// Resolve share count and discount rate into engine inputs.
    pub fn prepare(&self) -> IntrinsicResult<PreparedValuation> {
        let mut warnings = Vec::new();

        let shares_outstanding = self.share_count()?.shares()?;
        let discount_rate = self.resolve_discount_rate(&mut warnings)?;

        let inputs = ValuationInputs {
            base_free_cash_flow: self.base_free_cash_flow,
            growth_schedule: self.growth_schedule.clone(),
            terminal_growth_rate: self.terminal_growth_rate,
            discount_rate,
            total_debt: self.total_debt,
            cash_and_equivalents: self.cash_and_equivalents,
            shares_outstanding,
            model_error_leeway: self.model_error_leeway,
            margin_of_safety: self.margin_of_safety,
            max_value_per_share: self.max_value_per_share,
        };

        Ok(PreparedValuation { inputs, warnings })
    }

    fn resolve_discount_rate(&self, warnings: &mut Vec<String>) -> IntrinsicResult<Rate> {
        match (self.discount_rate, &self.wacc) {
            (Some(rate), Some(_)) => {
                warnings.push(format!(
                    "Explicit discount_rate ({rate}) used; wacc inputs ignored"
                ));
                Ok(rate)
            }
            (Some(rate), None) => Ok(rate),
            (None, Some(wacc_input)) => {
                let wacc_out = calculate_wacc(wacc_input)?;
                for w in &wacc_out.warnings {
                    warnings.push(format!("[WACC] {w}"));
                }
                let rate = wacc_out.result.wacc;
                warnings.push(format!("Discount rate derived from WACC: {}", rate.round_dp(4)));
                Ok(rate)
            }
            (None, None) => Err(IntrinsicError::assumption(
                "discount_rate",
                "provide discount_rate or wacc inputs",
            )),
        }
    }
}

/// Resolve, validate and value a request, attaching a recommendation when a
/// market price is supplied.
pub fn value_stock(
    request: &ValuationRequest,
) -> IntrinsicResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let PreparedValuation {
        inputs,
        mut warnings,
    } = request.prepare()?;

    let mut result = compute(&inputs)?;
    collect_result_warnings(&inputs, &result, &mut warnings);

    match request.current_price {
        Some(price) if price > Decimal::ZERO => {
            result = result.with_recommendation(price);
        }
        Some(price) => {
            warnings.push(format!(
                "Market price ({price}) is not positive; recommendation is UNKNOWN"
            ));
            result = result.with_recommendation(price);
        }
        None => {
            warnings.push("No market price supplied; recommendation omitted".into());
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Multi-stage FCF DCF (Gordon growth terminal value)",
        &inputs,
        warnings,
        elapsed,
        result,
    ))
}

fn collect_result_warnings(
    inputs: &ValuationInputs,
    result: &ValuationResult,
    warnings: &mut Vec<String>,
) {
    if inputs.base_free_cash_flow <= Decimal::ZERO {
        warnings.push(format!(
            "Base free cash flow is {}; growth projects it further from zero each year, so the value is low-confidence",
            inputs.base_free_cash_flow
        ));
    }
    if result.terminal_value_share > TERMINAL_VALUE_WARNING_SHARE {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            to_percent(result.terminal_value_share)
        ));
    }
    if result.intrinsic_value_per_share <= Decimal::ZERO {
        warnings.push(format!(
            "Intrinsic value per share is {}; equity has no positive DCF value",
            result.intrinsic_value_per_share.round_dp(2)
        ));
    }
}

/// Flat, display-rounded view of a valuation: currency to 2 dp, percentages
/// to 1 dp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub projection_years: usize,
    pub projected_fcf: Vec<Money>,
    pub present_value_per_year: Vec<Money>,
    pub terminal_value: Money,
    pub present_value_of_terminal_value: Money,
    pub terminal_value_percent: Decimal,
    pub enterprise_value: Money,
    pub net_debt: Money,
    pub equity_value: Money,
    pub shares_outstanding: Shares,
    pub intrinsic_value_per_share: Money,
    pub model_error_leeway_percent: Decimal,
    pub lower_band: Money,
    pub upper_band: Money,
    pub margin_of_safety_percent: Decimal,
    pub buy_target_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside_percent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

pub fn summarize(
    result: &ValuationResult,
    inputs: &ValuationInputs,
    company: Option<&str>,
) -> ValuationSummary {
    let rec = result.recommendation.as_ref();
    ValuationSummary {
        company: company.map(str::to_string),
        projection_years: result.projection_years(),
        projected_fcf: result.projected_fcf.iter().copied().map(round_money).collect(),
        present_value_per_year: result
            .present_value_per_year
            .iter()
            .copied()
            .map(round_money)
            .collect(),
        terminal_value: round_money(result.terminal_value),
        present_value_of_terminal_value: round_money(result.present_value_of_terminal_value),
        terminal_value_percent: round_percent(to_percent(result.terminal_value_share)),
        enterprise_value: round_money(result.enterprise_value),
        net_debt: round_money(result.net_debt),
        equity_value: round_money(result.equity_value),
        shares_outstanding: result.shares_outstanding,
        intrinsic_value_per_share: round_money(result.intrinsic_value_per_share),
        model_error_leeway_percent: round_percent(to_percent(inputs.model_error_leeway)),
        lower_band: round_money(result.lower_band),
        upper_band: round_money(result.upper_band),
        margin_of_safety_percent: round_percent(to_percent(inputs.margin_of_safety)),
        buy_target_price: round_money(result.buy_target_price),
        current_price: rec.map(|r| round_money(r.current_price)),
        upside_percent: rec.map(|r| round_percent(r.upside_percent)),
        recommendation: rec.map(|r| r.recommendation),
        confidence: rec.map(|r| r.confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_request() -> ValuationRequest {
        serde_json::from_value(serde_json::json!({
            "company": "Acme Industries",
            "base_free_cash_flow": 1000,
            "terminal_growth_rate": 0.02,
            "discount_rate": 0.12,
            "shares_outstanding": 100,
            "current_price": 100
        }))
        .unwrap()
    }

    #[test]
    fn test_request_defaults() {
        let req = sample_request();
        assert_eq!(req.growth_schedule, default_growth_schedule());
        assert_eq!(req.model_error_leeway, dec!(0.10));
        assert_eq!(req.margin_of_safety, dec!(0.30));
        assert_eq!(req.total_debt, Decimal::ZERO);
    }

    #[test]
    fn test_value_stock_attaches_recommendation() {
        let out = value_stock(&sample_request()).unwrap();
        let rec = out.result.recommendation.as_ref().unwrap();
        // Intrinsic ≈ 152.69 against a price of 100
        assert_eq!(rec.recommendation, Recommendation::StrongBuy);
        assert_eq!(out.methodology, "Multi-stage FCF DCF (Gordon growth terminal value)");
    }

    #[test]
    fn test_value_stock_without_price_warns() {
        let mut req = sample_request();
        req.current_price = None;
        let out = value_stock(&req).unwrap();
        assert!(out.result.recommendation.is_none());
        assert!(out.warnings.iter().any(|w| w.contains("No market price")));
    }

    #[test]
    fn test_zero_price_gives_unknown() {
        let mut req = sample_request();
        req.current_price = Some(Decimal::ZERO);
        let out = value_stock(&req).unwrap();
        let rec = out.result.recommendation.unwrap();
        assert_eq!(rec.recommendation, Recommendation::Unknown);
    }

    #[test]
    fn test_shares_from_share_capital() {
        let mut req = sample_request();
        req.shares_outstanding = None;
        req.share_capital = Some(dec!(1000));
        req.face_value = Some(dec!(10));
        let prepared = req.prepare().unwrap();
        assert_eq!(prepared.inputs.shares_outstanding, dec!(100));
    }

    #[test]
    fn test_zero_face_value_rejected() {
        let mut req = sample_request();
        req.shares_outstanding = None;
        req.share_capital = Some(dec!(1000));
        req.face_value = Some(Decimal::ZERO);
        let err = req.prepare().unwrap_err();
        assert!(matches!(err, IntrinsicError::InvalidAssumption { ref field, .. } if field == "face_value"));
    }

    #[test]
    fn test_missing_share_count_rejected() {
        let mut req = sample_request();
        req.shares_outstanding = None;
        assert!(req.prepare().is_err());
    }

    #[test]
    fn test_discount_rate_from_wacc() {
        let mut req = sample_request();
        req.discount_rate = None;
        req.wacc = Some(WaccInput {
            beta: dec!(1.25),
            ..WaccInput::default()
        });
        let prepared = req.prepare().unwrap();
        // 0.045 + 1.25 * 0.06
        assert_eq!(prepared.inputs.discount_rate, dec!(0.12));
        assert!(prepared.warnings.iter().any(|w| w.contains("derived from WACC")));
    }

    #[test]
    fn test_missing_discount_rate_rejected() {
        let mut req = sample_request();
        req.discount_rate = None;
        let err = req.prepare().unwrap_err();
        assert!(err.to_string().contains("discount_rate"));
    }

    #[test]
    fn test_negative_fcf_warns() {
        let mut req = sample_request();
        req.base_free_cash_flow = dec!(-500);
        let out = value_stock(&req).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Base free cash flow")));
        assert!(out.warnings.iter().any(|w| w.contains("no positive DCF value")));
    }

    #[test]
    fn test_summary_rounding() {
        let out = value_stock(&sample_request()).unwrap();
        let req = sample_request();
        let inputs = req.prepare().unwrap().inputs;
        let summary = summarize(&out.result, &inputs, req.company.as_deref());

        assert_eq!(summary.company.as_deref(), Some("Acme Industries"));
        assert_eq!(summary.projection_years, 10);
        assert_eq!(summary.projected_fcf[0], dec!(1100.00));
        assert_eq!(summary.intrinsic_value_per_share, dec!(152.69));
        assert_eq!(summary.upside_percent, Some(dec!(52.7)));
        assert_eq!(summary.model_error_leeway_percent, dec!(10.0));
        assert_eq!(summary.margin_of_safety_percent, dec!(30.0));
        assert_eq!(summary.recommendation, Some(Recommendation::StrongBuy));
    }

    #[test]
    fn test_summary_saturates_extreme_percentages() {
        let req = sample_request();
        let mut result = value_stock(&req).unwrap().result;
        let mut inputs = req.prepare().unwrap().inputs;
        result.terminal_value_share = Decimal::MAX;
        inputs.margin_of_safety = Decimal::MIN;
        let summary = summarize(&result, &inputs, None);
        assert_eq!(summary.terminal_value_percent, Decimal::MAX);
        assert_eq!(summary.margin_of_safety_percent, Decimal::MIN);
    }
}
