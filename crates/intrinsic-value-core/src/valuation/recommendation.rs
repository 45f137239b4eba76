use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Money, Rate};

use super::dcf::ValuationResult;

const STRONG_THRESHOLD: Decimal = dec!(30);
const CONVICTION_THRESHOLD: Decimal = dec!(15);

/// Discrete investment signal derived from upside to intrinsic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Avoid,
    StrongAvoid,
    /// No positive market price was available
    Unknown,
}

impl Recommendation {
    /// Whether the signal is something a caller can act on.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Recommendation::Unknown)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::StrongBuy => "STRONG BUY",
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::Avoid => "AVOID",
            Recommendation::StrongAvoid => "STRONG AVOID",
            Recommendation::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Conviction attached to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationOutput {
    pub recommendation: Recommendation,
    pub confidence: Confidence,
    /// (intrinsic - price) / price * 100; zero when the price is not positive
    pub upside_percent: Rate,
    pub current_price: Money,
}

/// Compare a market price against the intrinsic value in `result`.
pub fn recommend(result: &ValuationResult, current_price: Money) -> RecommendationOutput {
    recommend_from_value(result.intrinsic_value_per_share, current_price)
}

/// Same as [`recommend`] for callers holding only a per-share value.
///
/// Thresholds on upside `u` (percent):
/// `u >= 30` STRONG_BUY, `15 <= u < 30` BUY, `0 <= u < 15` BUY (medium
/// confidence), `-15 <= u < 0` HOLD, `-30 <= u < -15` AVOID, `u < -30`
/// STRONG_AVOID.
pub fn recommend_from_value(
    intrinsic_value_per_share: Money,
    current_price: Money,
) -> RecommendationOutput {
    if current_price <= Decimal::ZERO {
        return RecommendationOutput {
            recommendation: Recommendation::Unknown,
            confidence: Confidence::Low,
            upside_percent: Decimal::ZERO,
            current_price,
        };
    }

    let gap = intrinsic_value_per_share.saturating_sub(current_price);
    // Saturate on overflow; the tier only depends on the sign at that size.
    let upside_percent = gap
        .checked_div(current_price)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .unwrap_or(if gap.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        });
    let (recommendation, confidence) = classify(upside_percent);

    RecommendationOutput {
        recommendation,
        confidence,
        upside_percent,
        current_price,
    }
}

fn classify(upside: Decimal) -> (Recommendation, Confidence) {
    if upside >= STRONG_THRESHOLD {
        (Recommendation::StrongBuy, Confidence::High)
    } else if upside >= CONVICTION_THRESHOLD {
        (Recommendation::Buy, Confidence::High)
    } else if upside >= Decimal::ZERO {
        (Recommendation::Buy, Confidence::Medium)
    } else if upside >= -CONVICTION_THRESHOLD {
        (Recommendation::Hold, Confidence::Medium)
    } else if upside >= -STRONG_THRESHOLD {
        (Recommendation::Avoid, Confidence::High)
    } else {
        (Recommendation::StrongAvoid, Confidence::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn signal(upside: Decimal) -> Recommendation {
        // Price 100 makes intrinsic - 100 the upside in percent.
        recommend_from_value(dec!(100) + upside, dec!(100)).recommendation
    }

    #[test]
    fn test_threshold_tiers() {
        assert_eq!(signal(dec!(45)), Recommendation::StrongBuy);
        assert_eq!(signal(dec!(20)), Recommendation::Buy);
        assert_eq!(signal(dec!(5)), Recommendation::Buy);
        assert_eq!(signal(dec!(-5)), Recommendation::Hold);
        assert_eq!(signal(dec!(-20)), Recommendation::Avoid);
        assert_eq!(signal(dec!(-45)), Recommendation::StrongAvoid);
    }

    #[test]
    fn test_threshold_boundaries_inclusive() {
        assert_eq!(signal(dec!(30)), Recommendation::StrongBuy);
        assert_eq!(signal(dec!(15)), Recommendation::Buy);
        assert_eq!(signal(dec!(0)), Recommendation::Buy);
        assert_eq!(signal(dec!(-15)), Recommendation::Hold);
        assert_eq!(signal(dec!(-30)), Recommendation::Avoid);
        assert_eq!(signal(dec!(-30.0001)), Recommendation::StrongAvoid);
    }

    #[test]
    fn test_confidence_within_buy_band() {
        let strong = recommend_from_value(dec!(120), dec!(100));
        let weak = recommend_from_value(dec!(110), dec!(100));
        assert_eq!(strong.confidence, Confidence::High);
        assert_eq!(weak.recommendation, Recommendation::Buy);
        assert_eq!(weak.confidence, Confidence::Medium);
    }

    #[test]
    fn test_upside_percent() {
        let out = recommend_from_value(dec!(150), dec!(120));
        assert_eq!(out.upside_percent, dec!(25));
        assert_eq!(out.current_price, dec!(120));
    }

    #[test]
    fn test_non_positive_price_is_unknown() {
        for price in [Decimal::ZERO, dec!(-10)] {
            let out = recommend_from_value(dec!(150), price);
            assert_eq!(out.recommendation, Recommendation::Unknown);
            assert_eq!(out.confidence, Confidence::Low);
            assert_eq!(out.upside_percent, Decimal::ZERO);
            assert!(!out.recommendation.is_actionable());
        }
    }

    #[test]
    fn test_extreme_ratio_saturates() {
        let tiny = Decimal::new(1, 28);
        let up = recommend_from_value(dec!(1000000000000), tiny);
        assert_eq!(up.recommendation, Recommendation::StrongBuy);
        assert_eq!(up.upside_percent, Decimal::MAX);

        let down = recommend_from_value(dec!(-1000000000000), tiny);
        assert_eq!(down.recommendation, Recommendation::StrongAvoid);
    }

    #[test]
    fn test_serialized_labels() {
        let json = serde_json::to_string(&Recommendation::StrongAvoid).unwrap();
        assert_eq!(json, "\"STRONG_AVOID\"");
        let json = serde_json::to_string(&Confidence::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(Recommendation::StrongBuy.to_string(), "STRONG BUY");
        assert_eq!(Confidence::High.to_string(), "HIGH");
    }
}
