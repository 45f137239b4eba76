use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::IntrinsicError;
use crate::time_value::{compound_factors, discount_factors};
use crate::types::{Money, Rate, Shares};
use crate::IntrinsicResult;

use super::recommendation::{recommend, RecommendationOutput};

pub const DEFAULT_MODEL_ERROR_LEEWAY: Rate = dec!(0.10);
pub const DEFAULT_MARGIN_OF_SAFETY: Rate = dec!(0.30);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One segment of the growth schedule: `years` consecutive years growing at `rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthStage {
    pub years: u32,
    pub rate: Rate,
}

impl GrowthStage {
    pub fn new(years: u32, rate: Rate) -> Self {
        Self { years, rate }
    }
}

/// Reference two-stage schedule: 5 years at 10%, then 5 years at 5%.
pub fn default_growth_schedule() -> Vec<GrowthStage> {
    vec![
        GrowthStage::new(5, dec!(0.10)),
        GrowthStage::new(5, dec!(0.05)),
    ]
}

fn default_model_error_leeway() -> Rate {
    DEFAULT_MODEL_ERROR_LEEWAY
}

fn default_margin_of_safety() -> Rate {
    DEFAULT_MARGIN_OF_SAFETY
}

/// Financial assumptions for a single DCF valuation.
///
/// Every money field must already be in the same unit as
/// `base_free_cash_flow`; the engine performs no unit conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInputs {
    /// Most recent period's free cash flow. Zero or negative is accepted.
    pub base_free_cash_flow: Money,
    /// Ordered growth segments; total projection years is the sum of their lengths
    #[serde(default = "default_growth_schedule")]
    pub growth_schedule: Vec<GrowthStage>,
    /// Perpetual growth after the explicit window (Gordon growth `g`)
    pub terminal_growth_rate: Rate,
    /// Rate used to discount every future cash flow (`r`)
    pub discount_rate: Rate,
    #[serde(default)]
    pub total_debt: Money,
    #[serde(default)]
    pub cash_and_equivalents: Money,
    pub shares_outstanding: Shares,
    /// Symmetric band width around intrinsic value
    #[serde(default = "default_model_error_leeway")]
    pub model_error_leeway: Rate,
    /// Haircut applied to intrinsic value for the buy target
    #[serde(default = "default_margin_of_safety")]
    pub margin_of_safety: Rate,
    /// Optional ceiling on |intrinsic value per share|. Exceeding it usually
    /// means the share count and money fields are in different units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_per_share: Option<Money>,
}

impl ValuationInputs {
    /// Inputs with the reference growth schedule, no debt or cash, and the
    /// default leeway and margin of safety.
    pub fn new(
        base_free_cash_flow: Money,
        terminal_growth_rate: Rate,
        discount_rate: Rate,
        shares_outstanding: Shares,
    ) -> Self {
        Self {
            base_free_cash_flow,
            growth_schedule: default_growth_schedule(),
            terminal_growth_rate,
            discount_rate,
            total_debt: Decimal::ZERO,
            cash_and_equivalents: Decimal::ZERO,
            shares_outstanding,
            model_error_leeway: DEFAULT_MODEL_ERROR_LEEWAY,
            margin_of_safety: DEFAULT_MARGIN_OF_SAFETY,
            max_value_per_share: None,
        }
    }

    pub fn with_growth_schedule(mut self, schedule: Vec<GrowthStage>) -> Self {
        self.growth_schedule = schedule;
        self
    }

    pub fn with_balance_sheet(mut self, total_debt: Money, cash_and_equivalents: Money) -> Self {
        self.total_debt = total_debt;
        self.cash_and_equivalents = cash_and_equivalents;
        self
    }

    /// Total explicit projection years. Saturates rather than wrapping;
    /// `validate` rejects schedules whose sum does not fit in a `u32`.
    pub fn total_years(&self) -> u32 {
        self.growth_schedule
            .iter()
            .fold(0u32, |acc, stage| acc.saturating_add(stage.years))
    }

    /// Growth rate applied in `year` (1-indexed), or `None` past the schedule.
    pub fn growth_rate_for_year(&self, year: u32) -> Option<Rate> {
        let mut upper = 0u32;
        for stage in &self.growth_schedule {
            upper = upper.saturating_add(stage.years);
            if year >= 1 && year <= upper {
                return Some(stage.rate);
            }
        }
        None
    }

    /// Check every assumption the model depends on.
    pub fn validate(&self) -> IntrinsicResult<()> {
        if self.discount_rate <= Decimal::ZERO {
            return Err(IntrinsicError::assumption(
                "discount_rate",
                format!("discount_rate ({}) must be positive", self.discount_rate),
            ));
        }
        if self.discount_rate <= self.terminal_growth_rate {
            return Err(IntrinsicError::assumption(
                "discount_rate",
                format!(
                    "discount_rate ({}) must exceed terminal_growth_rate ({})",
                    self.discount_rate, self.terminal_growth_rate
                ),
            ));
        }
        if self.terminal_growth_rate < dec!(-1) {
            return Err(IntrinsicError::assumption(
                "terminal_growth_rate",
                format!(
                    "terminal_growth_rate ({}) is below -100%",
                    self.terminal_growth_rate
                ),
            ));
        }
        if self.shares_outstanding <= Decimal::ZERO {
            return Err(IntrinsicError::assumption(
                "shares_outstanding",
                format!(
                    "shares_outstanding ({}) must be positive",
                    self.shares_outstanding
                ),
            ));
        }
        if self.growth_schedule.is_empty() {
            return Err(IntrinsicError::assumption(
                "growth_schedule",
                "at least one growth stage is required",
            ));
        }

        let mut total: u32 = 0;
        for (idx, stage) in self.growth_schedule.iter().enumerate() {
            if stage.years == 0 {
                return Err(IntrinsicError::assumption(
                    "growth_schedule",
                    format!("stage {} has non-positive length (years = 0)", idx + 1),
                ));
            }
            if stage.rate < dec!(-1) {
                return Err(IntrinsicError::assumption(
                    "growth_schedule",
                    format!(
                        "stage {} growth rate ({}) is below -100%",
                        idx + 1,
                        stage.rate
                    ),
                ));
            }
            total = total.checked_add(stage.years).ok_or_else(|| {
                IntrinsicError::assumption("growth_schedule", "total projection years overflow")
            })?;
        }

        if self.model_error_leeway < Decimal::ZERO {
            return Err(IntrinsicError::assumption(
                "model_error_leeway",
                format!(
                    "model_error_leeway ({}) cannot be negative",
                    self.model_error_leeway
                ),
            ));
        }
        if self.margin_of_safety < Decimal::ZERO || self.margin_of_safety > Decimal::ONE {
            return Err(IntrinsicError::assumption(
                "margin_of_safety",
                format!(
                    "margin_of_safety ({}) must be between 0 and 1",
                    self.margin_of_safety
                ),
            ));
        }
        if let Some(ceiling) = self.max_value_per_share {
            if ceiling <= Decimal::ZERO {
                return Err(IntrinsicError::assumption(
                    "max_value_per_share",
                    format!("max_value_per_share ({ceiling}) must be positive"),
                ));
            }
        }

        Ok(())
    }
}

/// Output of a DCF valuation. Vectors are indexed by projection year - 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub projected_fcf: Vec<Money>,
    pub discount_factors: Vec<Rate>,
    pub present_value_per_year: Vec<Money>,
    pub sum_of_present_values: Money,
    /// Last projected FCF, the base of the Gordon growth terminal value
    pub terminal_year_fcf: Money,
    pub terminal_value: Money,
    pub present_value_of_terminal_value: Money,
    /// PV of terminal value as a fraction of enterprise value
    pub terminal_value_share: Rate,
    pub enterprise_value: Money,
    pub net_debt: Money,
    pub equity_value: Money,
    pub shares_outstanding: Shares,
    pub intrinsic_value_per_share: Money,
    pub lower_band: Money,
    pub upper_band: Money,
    pub buy_target_price: Money,
    /// Present only once a market price has been supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendationOutput>,
}

impl ValuationResult {
    pub fn projection_years(&self) -> usize {
        self.projected_fcf.len()
    }

    /// Copy of this result with the recommendation for `current_price` attached.
    pub fn with_recommendation(&self, current_price: Money) -> Self {
        let mut out = self.clone();
        out.recommendation = Some(recommend(self, current_price));
        out
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a multi-stage FCF DCF valuation with a Gordon growth terminal value.
///
/// Deterministic and side-effect free. Fails with `InvalidAssumption` from
/// validation, or `Overflow` when checked Decimal arithmetic runs out of range.
pub fn compute(inputs: &ValuationInputs) -> IntrinsicResult<ValuationResult> {
    inputs.validate()?;

    let n_years = inputs.total_years();
    let projected_fcf = project_free_cash_flows(inputs)?;
    let compounding = compound_factors(inputs.discount_rate, n_years)?;

    let present_value_per_year: Vec<Money> = projected_fcf
        .iter()
        .zip(&compounding)
        .map(|(fcf, c)| fcf / c)
        .collect();
    let discount_factors = discount_factors(&compounding);
    let sum_of_present_values = present_value_per_year
        .iter()
        .try_fold(Decimal::ZERO, |acc, pv| {
            checked(acc.checked_add(*pv), "sum of present values", acc)
        })?;

    let terminal_year_fcf = *projected_fcf.last().ok_or_else(|| {
        IntrinsicError::InsufficientData("No projection years generated".into())
    })?;
    let terminal_value = gordon_terminal_value(
        terminal_year_fcf,
        inputs.terminal_growth_rate,
        inputs.discount_rate,
    )?;
    let final_compounding = compounding.last().copied().unwrap_or(Decimal::ONE);
    let present_value_of_terminal_value = terminal_value / final_compounding;

    let enterprise_value = checked(
        sum_of_present_values.checked_add(present_value_of_terminal_value),
        "enterprise value",
        sum_of_present_values,
    )?;
    let terminal_value_share = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        checked(
            present_value_of_terminal_value.checked_div(enterprise_value),
            "terminal value share",
            present_value_of_terminal_value,
        )?
    };

    let net_debt = checked(
        inputs.total_debt.checked_sub(inputs.cash_and_equivalents),
        "net debt",
        inputs.total_debt,
    )?;
    let equity_value = checked(
        enterprise_value.checked_sub(net_debt),
        "equity value",
        enterprise_value,
    )?;
    let intrinsic_value_per_share = checked(
        equity_value.checked_div(inputs.shares_outstanding),
        "intrinsic value per share",
        equity_value,
    )?;

    if let Some(ceiling) = inputs.max_value_per_share {
        if intrinsic_value_per_share.abs() > ceiling {
            return Err(IntrinsicError::assumption(
                "shares_outstanding",
                format!(
                    "intrinsic value per share ({}) exceeds the ceiling of {ceiling}; \
                     check that shares_outstanding ({}) uses the same unit scale as the money inputs",
                    intrinsic_value_per_share.round_dp(2),
                    inputs.shares_outstanding
                ),
            ));
        }
    }

    let lower_band = scale(
        intrinsic_value_per_share,
        Decimal::ONE.checked_sub(inputs.model_error_leeway),
        "lower band",
    )?;
    let upper_band = scale(
        intrinsic_value_per_share,
        Decimal::ONE.checked_add(inputs.model_error_leeway),
        "upper band",
    )?;
    let buy_target_price = scale(
        intrinsic_value_per_share,
        Decimal::ONE.checked_sub(inputs.margin_of_safety),
        "buy target price",
    )?;

    Ok(ValuationResult {
        projected_fcf,
        discount_factors,
        present_value_per_year,
        sum_of_present_values,
        terminal_year_fcf,
        terminal_value,
        present_value_of_terminal_value,
        terminal_value_share,
        enterprise_value,
        net_debt,
        equity_value,
        shares_outstanding: inputs.shares_outstanding,
        intrinsic_value_per_share,
        lower_band,
        upper_band,
        buy_target_price,
        recommendation: None,
    })
}

/// Gordon growth terminal value: `fcf_last * (1 + g) / (r - g)`.
pub fn gordon_terminal_value(
    terminal_year_fcf: Money,
    terminal_growth_rate: Rate,
    discount_rate: Rate,
) -> IntrinsicResult<Money> {
    let spread = discount_rate - terminal_growth_rate;
    if spread <= Decimal::ZERO {
        return Err(IntrinsicError::assumption(
            "discount_rate",
            format!(
                "discount_rate ({discount_rate}) must exceed terminal_growth_rate ({terminal_growth_rate})"
            ),
        ));
    }
    let grown = checked(
        terminal_year_fcf.checked_mul(Decimal::ONE + terminal_growth_rate),
        "terminal year cash flow",
        terminal_year_fcf,
    )?;
    checked(grown.checked_div(spread), "terminal value", grown)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn project_free_cash_flows(inputs: &ValuationInputs) -> IntrinsicResult<Vec<Money>> {
    let mut projected = Vec::with_capacity(inputs.total_years() as usize);
    let mut fcf = inputs.base_free_cash_flow;

    for stage in &inputs.growth_schedule {
        let growth = Decimal::ONE + stage.rate;
        for _ in 0..stage.years {
            fcf = checked(fcf.checked_mul(growth), "free cash flow projection", fcf)?;
            projected.push(fcf);
        }
    }

    Ok(projected)
}

fn checked(value: Option<Decimal>, context: &str, last_value: Decimal) -> IntrinsicResult<Decimal> {
    value.ok_or_else(|| IntrinsicError::Overflow {
        context: context.into(),
        last_value,
    })
}

/// `value * factor`, where the factor itself may already have overflowed.
fn scale(value: Decimal, factor: Option<Decimal>, context: &str) -> IntrinsicResult<Decimal> {
    checked(factor.and_then(|f| value.checked_mul(f)), context, value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn reference_inputs() -> ValuationInputs {
        ValuationInputs::new(dec!(1000), dec!(0.02), dec!(0.12), dec!(100))
    }

    #[test]
    fn test_projection_follows_schedule() {
        let result = compute(&reference_inputs()).unwrap();

        assert_eq!(result.projection_years(), 10);
        assert_eq!(result.projected_fcf[0], dec!(1100));
        assert_eq!(result.projected_fcf[1], dec!(1210));
        // Year 6 switches to the 5% stage: 1000 * 1.1^5 * 1.05
        assert_eq!(result.projected_fcf[5], dec!(1610.51) * dec!(1.05));
    }

    #[test]
    fn test_vector_lengths_match_total_years() {
        let inputs = reference_inputs().with_growth_schedule(vec![
            GrowthStage::new(3, dec!(0.20)),
            GrowthStage::new(4, dec!(0.08)),
            GrowthStage::new(2, dec!(-0.05)),
        ]);
        let result = compute(&inputs).unwrap();
        assert_eq!(result.projected_fcf.len(), 9);
        assert_eq!(result.present_value_per_year.len(), 9);
        assert_eq!(result.discount_factors.len(), 9);
    }

    #[test]
    fn test_present_value_year_one() {
        let result = compute(&reference_inputs()).unwrap();
        assert_eq!(result.present_value_per_year[0], dec!(1100) / dec!(1.12));
    }

    #[test]
    fn test_terminal_value_gordon() {
        let result = compute(&reference_inputs()).unwrap();
        let expected = result.terminal_year_fcf * dec!(1.02) / dec!(0.10);
        assert_eq!(result.terminal_value, expected);
        assert_eq!(result.terminal_year_fcf, result.projected_fcf[9]);
    }

    #[test]
    fn test_enterprise_value_aggregation() {
        let result = compute(&reference_inputs()).unwrap();
        let sum: Decimal = result.present_value_per_year.iter().sum();
        assert_eq!(result.sum_of_present_values, sum);
        assert_eq!(
            result.enterprise_value,
            sum + result.present_value_of_terminal_value
        );
    }

    #[test]
    fn test_equity_bridge_with_net_debt() {
        let inputs = reference_inputs().with_balance_sheet(dec!(2000), dec!(500));
        let result = compute(&inputs).unwrap();
        assert_eq!(result.net_debt, dec!(1500));
        assert_eq!(result.equity_value, result.enterprise_value - dec!(1500));
        assert_eq!(
            result.intrinsic_value_per_share,
            result.equity_value / dec!(100)
        );
    }

    #[test]
    fn test_bands_and_buy_target() {
        let result = compute(&reference_inputs()).unwrap();
        let iv = result.intrinsic_value_per_share;
        assert_eq!(result.lower_band, iv * dec!(0.90));
        assert_eq!(result.upper_band, iv * dec!(1.10));
        assert_eq!(result.buy_target_price, iv * dec!(0.70));
    }

    #[test]
    fn test_recommendation_unset_after_compute() {
        let result = compute(&reference_inputs()).unwrap();
        assert!(result.recommendation.is_none());
    }

    #[test]
    fn test_growth_rate_for_year_boundaries() {
        let inputs = reference_inputs();
        assert_eq!(inputs.growth_rate_for_year(0), None);
        assert_eq!(inputs.growth_rate_for_year(1), Some(dec!(0.10)));
        assert_eq!(inputs.growth_rate_for_year(5), Some(dec!(0.10)));
        assert_eq!(inputs.growth_rate_for_year(6), Some(dec!(0.05)));
        assert_eq!(inputs.growth_rate_for_year(10), Some(dec!(0.05)));
        assert_eq!(inputs.growth_rate_for_year(11), None);
    }

    #[test]
    fn test_discount_rate_below_terminal_growth_rejected() {
        let mut inputs = reference_inputs();
        inputs.discount_rate = dec!(0.01);
        let err = compute(&inputs).unwrap_err();
        assert!(matches!(err, IntrinsicError::InvalidAssumption { .. }));
    }

    #[test]
    fn test_zero_discount_rate_rejected() {
        let mut inputs = reference_inputs();
        inputs.discount_rate = Decimal::ZERO;
        inputs.terminal_growth_rate = dec!(-0.02);
        assert!(compute(&inputs).is_err());
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let inputs = reference_inputs().with_growth_schedule(vec![]);
        assert!(compute(&inputs).is_err());
    }

    #[test]
    fn test_zero_length_stage_rejected() {
        let inputs = reference_inputs().with_growth_schedule(vec![
            GrowthStage::new(5, dec!(0.10)),
            GrowthStage::new(0, dec!(0.05)),
        ]);
        let err = compute(&inputs).unwrap_err();
        match err {
            IntrinsicError::InvalidAssumption { field, reason } => {
                assert_eq!(field, "growth_schedule");
                assert!(reason.contains("stage 2"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_leeway_rejected() {
        let mut inputs = reference_inputs();
        inputs.model_error_leeway = dec!(-0.1);
        assert!(compute(&inputs).is_err());
    }

    #[test]
    fn test_margin_of_safety_above_one_rejected() {
        let mut inputs = reference_inputs();
        inputs.margin_of_safety = dec!(1.5);
        assert!(compute(&inputs).is_err());
    }

    #[test]
    fn test_negative_growth_stage_allowed() {
        let inputs =
            reference_inputs().with_growth_schedule(vec![GrowthStage::new(4, dec!(-0.10))]);
        let result = compute(&inputs).unwrap();
        assert_eq!(result.projected_fcf[0], dec!(900));
        assert_eq!(result.projected_fcf[3], dec!(656.1));
    }

    #[test]
    fn test_value_per_share_ceiling() {
        let mut inputs = reference_inputs();
        inputs.max_value_per_share = Some(dec!(100));
        let err = compute(&inputs).unwrap_err();
        assert!(err.to_string().contains("shares_outstanding"), "{err}");

        inputs.max_value_per_share = Some(dec!(1000));
        assert!(compute(&inputs).is_ok());
    }

    #[test]
    fn test_zero_base_fcf_accepted() {
        let mut inputs = reference_inputs();
        inputs.base_free_cash_flow = Decimal::ZERO;
        let result = compute(&inputs).unwrap();
        assert_eq!(result.enterprise_value, Decimal::ZERO);
        assert_eq!(result.terminal_value_share, Decimal::ZERO);
    }

    #[test]
    fn test_overflow_surfaces_as_error() {
        let mut inputs = reference_inputs();
        inputs.base_free_cash_flow = Decimal::MAX / dec!(2);
        let err = compute(&inputs).unwrap_err();
        assert!(matches!(err, IntrinsicError::Overflow { .. }));
    }

    fn overflow_context(inputs: &ValuationInputs) -> String {
        match compute(inputs) {
            Err(IntrinsicError::Overflow { context, .. }) => context,
            other => panic!("expected Overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_present_value_sum_overflow() {
        let mut inputs = ValuationInputs::new(
            Decimal::MAX / dec!(3),
            Decimal::ZERO,
            dec!(0.0001),
            dec!(100),
        )
        .with_growth_schedule(vec![GrowthStage::new(10, Decimal::ZERO)]);
        inputs.validate().unwrap();
        assert_eq!(overflow_context(&inputs), "sum of present values");
    }

    #[test]
    fn test_net_debt_overflow() {
        let inputs = reference_inputs().with_balance_sheet(Decimal::MAX, Decimal::MIN);
        inputs.validate().unwrap();
        assert_eq!(overflow_context(&inputs), "net debt");
    }

    #[test]
    fn test_band_overflow() {
        let mut inputs = reference_inputs();
        inputs.model_error_leeway = Decimal::MAX;
        inputs.shares_outstanding = Decimal::new(1, 19);
        inputs.validate().unwrap();
        assert_eq!(overflow_context(&inputs), "lower band");
    }

    #[test]
    fn test_upper_band_factor_overflow() {
        let mut inputs = reference_inputs();
        inputs.model_error_leeway = Decimal::MAX;
        // 1 - MAX fits and a zero per-share value scales to zero.
        inputs.base_free_cash_flow = Decimal::ZERO;
        assert_eq!(overflow_context(&inputs), "upper band");
    }

    #[test]
    fn test_terminal_growth_below_minus_one_rejected() {
        let mut inputs = reference_inputs();
        inputs.terminal_growth_rate = dec!(-1.5);
        inputs.discount_rate = dec!(0.10);
        let err = compute(&inputs).unwrap_err();
        assert!(matches!(
            err,
            IntrinsicError::InvalidAssumption { ref field, .. } if field == "terminal_growth_rate"
        ));
    }

    #[test]
    fn test_terminal_growth_minus_one_gives_zero_terminal_value() {
        let mut inputs = reference_inputs();
        inputs.terminal_growth_rate = dec!(-1);
        let result = compute(&inputs).unwrap();
        assert_eq!(result.terminal_value, Decimal::ZERO);
        assert!(result.enterprise_value > Decimal::ZERO);
    }

    #[test]
    fn test_inputs_deserialize_with_defaults() {
        let json = r#"{
            "base_free_cash_flow": "1000",
            "terminal_growth_rate": "0.02",
            "discount_rate": "0.12",
            "shares_outstanding": 100
        }"#;
        let inputs: ValuationInputs = serde_json::from_str(json).unwrap();
        assert_eq!(inputs, reference_inputs());
    }
}
