use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::IntrinsicError;
use crate::types::Rate;
use crate::IntrinsicResult;

fn check_rate(rate: Rate) -> IntrinsicResult<()> {
    if rate <= dec!(-1) {
        return Err(IntrinsicError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    Ok(())
}

/// Compounding factors `(1 + rate)^t` for t = 1..=periods.
///
/// Built by repeated multiplication so integer periods stay exact to
/// Decimal precision.
pub fn compound_factors(rate: Rate, periods: u32) -> IntrinsicResult<Vec<Decimal>> {
    check_rate(rate)?;

    let one_plus_r = Decimal::ONE + rate;
    let mut compound = Decimal::ONE;
    let mut factors = Vec::with_capacity(periods as usize);

    for t in 1..=periods {
        compound = compound
            .checked_mul(one_plus_r)
            .ok_or_else(|| IntrinsicError::Overflow {
                context: format!("compounding factor at period {t}"),
                last_value: compound,
            })?;
        if compound.is_zero() {
            return Err(IntrinsicError::DivisionByZero {
                context: format!("compounding factor underflow at period {t}"),
            });
        }
        factors.push(compound);
    }

    Ok(factors)
}

/// End-of-period discount factors `1 / (1 + rate)^t` from compounding factors.
pub fn discount_factors(compounding: &[Decimal]) -> Vec<Rate> {
    compounding.iter().map(|c| Decimal::ONE / c).collect()
}
