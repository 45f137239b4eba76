use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::IntrinsicError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::IntrinsicResult;

/// Long-run 10-year government yield used when no live rate is supplied.
pub const DEFAULT_RISK_FREE_RATE: Rate = dec!(0.045);
/// Long-run equity excess return over the risk-free rate.
pub const DEFAULT_MARKET_RISK_PREMIUM: Rate = dec!(0.06);
pub const DEFAULT_TAX_RATE: Rate = dec!(0.25);
pub const DEFAULT_COST_OF_DEBT: Rate = dec!(0.05);

fn default_risk_free_rate() -> Rate {
    DEFAULT_RISK_FREE_RATE
}

fn default_market_risk_premium() -> Rate {
    DEFAULT_MARKET_RISK_PREMIUM
}

fn default_beta() -> Decimal {
    Decimal::ONE
}

fn default_tax_rate() -> Rate {
    DEFAULT_TAX_RATE
}

fn default_cost_of_debt() -> Rate {
    DEFAULT_COST_OF_DEBT
}

/// Inputs for deriving a discount rate from CAPM and capital structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccInput {
    /// Risk-free rate (e.g. 10-year government bond yield)
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: Rate,
    /// Market return minus risk-free rate
    #[serde(default = "default_market_risk_premium")]
    pub market_risk_premium: Rate,
    /// Levered equity beta
    #[serde(default = "default_beta")]
    pub beta: Decimal,
    /// Debt-to-equity ratio; weights are E = 1/(1+D/E), D = (D/E)/(1+D/E)
    #[serde(default)]
    pub debt_to_equity: Decimal,
    /// Marginal corporate tax rate
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Rate,
    /// Pre-tax cost of debt
    #[serde(default = "default_cost_of_debt")]
    pub cost_of_debt: Rate,
}

impl Default for WaccInput {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            market_risk_premium: DEFAULT_MARKET_RISK_PREMIUM,
            beta: Decimal::ONE,
            debt_to_equity: Decimal::ZERO,
            tax_rate: DEFAULT_TAX_RATE,
            cost_of_debt: DEFAULT_COST_OF_DEBT,
        }
    }
}

/// Output of the WACC calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccOutput {
    pub wacc: Rate,
    /// Cost of equity via CAPM
    pub cost_of_equity: Rate,
    pub after_tax_cost_of_debt: Rate,
    pub equity_weight: Rate,
    pub debt_weight: Rate,
}

/// Calculate the Weighted Average Cost of Capital.
///
/// Ke = Rf + Beta * MRP
/// Kd_at = Kd * (1 - t)
/// WACC = Ke * We + Kd_at * Wd, with weights taken from the D/E ratio.
pub fn calculate_wacc(input: &WaccInput) -> IntrinsicResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_wacc_input(input)?;

    let cost_of_equity = input.risk_free_rate + input.beta * input.market_risk_premium;
    let after_tax_cost_of_debt = input.cost_of_debt * (Decimal::ONE - input.tax_rate);

    let total_capital = Decimal::ONE + input.debt_to_equity;
    let equity_weight = Decimal::ONE / total_capital;
    let debt_weight = input.debt_to_equity / total_capital;

    let wacc = cost_of_equity * equity_weight + after_tax_cost_of_debt * debt_weight;

    if input.beta > dec!(3.0) {
        warnings.push(format!(
            "High beta ({}): verify market data; betas above 3.0 are unusual",
            input.beta
        ));
    }
    if input.beta < Decimal::ZERO {
        warnings.push(format!(
            "Negative beta ({}): cost of equity falls below the risk-free rate",
            input.beta
        ));
    }
    if wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {wacc} exceeds 20%; appropriate for high-risk / emerging-market situations only"
        ));
    }

    let output = WaccOutput {
        wacc,
        cost_of_equity,
        after_tax_cost_of_debt,
        equity_weight,
        debt_weight,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "WACC via CAPM with D/E capital weights",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Equity beta from historical returns: sample covariance with the market
/// divided by the market's sample variance.
pub fn regression_beta(stock_returns: &[Rate], market_returns: &[Rate]) -> IntrinsicResult<Decimal> {
    if stock_returns.len() != market_returns.len() {
        return Err(IntrinsicError::InsufficientData(format!(
            "Beta requires paired return series; got {} stock and {} market observations",
            stock_returns.len(),
            market_returns.len()
        )));
    }
    if stock_returns.len() < 2 {
        return Err(IntrinsicError::InsufficientData(
            "Beta requires at least 2 paired observations".into(),
        ));
    }

    let n = Decimal::from(stock_returns.len() as u64);
    let stock_mean = stock_returns.iter().sum::<Decimal>() / n;
    let market_mean = market_returns.iter().sum::<Decimal>() / n;

    let mut covariance = Decimal::ZERO;
    let mut market_variance = Decimal::ZERO;
    for (s, m) in stock_returns.iter().zip(market_returns) {
        let dm = m - market_mean;
        covariance += (s - stock_mean) * dm;
        market_variance += dm * dm;
    }

    // The (n - 1) denominators cancel in the ratio.
    if market_variance.is_zero() {
        return Err(IntrinsicError::DivisionByZero {
            context: "market return variance is zero".into(),
        });
    }

    Ok(covariance / market_variance)
}

fn validate_wacc_input(input: &WaccInput) -> IntrinsicResult<()> {
    if input.risk_free_rate < Decimal::ZERO {
        return Err(IntrinsicError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "Risk-free rate cannot be negative".into(),
        });
    }
    if input.market_risk_premium < Decimal::ZERO {
        return Err(IntrinsicError::InvalidInput {
            field: "market_risk_premium".into(),
            reason: "Market risk premium cannot be negative".into(),
        });
    }
    if input.cost_of_debt < Decimal::ZERO {
        return Err(IntrinsicError::InvalidInput {
            field: "cost_of_debt".into(),
            reason: "Cost of debt cannot be negative".into(),
        });
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(IntrinsicError::InvalidInput {
            field: "tax_rate".into(),
            reason: "Tax rate must be between 0 and 1".into(),
        });
    }
    if input.debt_to_equity < Decimal::ZERO {
        return Err(IntrinsicError::InvalidInput {
            field: "debt_to_equity".into(),
            reason: "Debt-to-equity ratio cannot be negative".into(),
        });
    }
    Ok(())
}
