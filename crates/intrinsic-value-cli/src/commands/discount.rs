use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use intrinsic_value_core::valuation::wacc::{self, WaccInput};

use crate::input;

/// Arguments for a WACC calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Risk-free rate (e.g. 0.045 for 4.5%)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Equity market risk premium
    #[arg(long, alias = "erp")]
    pub market_risk_premium: Option<Decimal>,

    /// Levered equity beta
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Debt-to-equity ratio
    #[arg(long)]
    pub debt_to_equity: Option<Decimal>,

    /// Marginal tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Pre-tax cost of debt
    #[arg(long)]
    pub cost_of_debt: Option<Decimal>,
}

/// Arguments for a regression beta
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct BetaArgs {
    /// Path to JSON input file with `stock_returns` and `market_returns` arrays
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated periodic stock returns
    #[arg(long, value_delimiter = ',')]
    pub stock_returns: Vec<Decimal>,

    /// Comma-separated periodic market returns, paired with the stock returns
    #[arg(long, value_delimiter = ',')]
    pub market_returns: Vec<Decimal>,
}

#[derive(Deserialize)]
struct BetaInput {
    stock_returns: Vec<Decimal>,
    market_returns: Vec<Decimal>,
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let wacc_input: WaccInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let defaults = WaccInput::default();
        WaccInput {
            risk_free_rate: args.risk_free_rate.unwrap_or(defaults.risk_free_rate),
            market_risk_premium: args
                .market_risk_premium
                .unwrap_or(defaults.market_risk_premium),
            beta: args.beta.unwrap_or(defaults.beta),
            debt_to_equity: args.debt_to_equity.unwrap_or(defaults.debt_to_equity),
            tax_rate: args.tax_rate.unwrap_or(defaults.tax_rate),
            cost_of_debt: args.cost_of_debt.unwrap_or(defaults.cost_of_debt),
        }
    };

    let result = wacc::calculate_wacc(&wacc_input)?;
    info!(wacc = %result.result.wacc, "derived discount rate");
    Ok(serde_json::to_value(result)?)
}

pub fn run_beta(args: BetaArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let series: BetaInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        BetaInput {
            stock_returns: args.stock_returns,
            market_returns: args.market_returns,
        }
    };

    let beta = wacc::regression_beta(&series.stock_returns, &series.market_returns)?;
    info!(%beta, observations = series.stock_returns.len(), "estimated beta");
    Ok(json!({
        "beta": beta,
        "observations": series.stock_returns.len(),
    }))
}
