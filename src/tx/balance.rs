//! Balance sufficiency check for candidate transactions
//!
//! Sits at a funds-movement boundary: the cost arithmetic widens to 512
//! bits so no 256-bit intermediate can wrap a comparison.

use super::params::TransactionParams;
use crate::error::{PrepError, PrepResult};
use crate::units;

use ethers::types::U512;

/// Maximum amount the transaction can draw from the account:
/// `value + gas * gasPrice`.
///
/// An absent `value` is zero; an absent `gas` or `gasPrice` has no safe
/// default and is rejected.
pub fn max_transaction_cost(params: &TransactionParams) -> PrepResult<U512> {
    let value = units::parse_optional_quantity("value", params.value.as_deref())?;
    let gas = match params.gas.as_deref() {
        Some(gas) => units::parse_quantity("gas", gas)?,
        None => {
            return Err(PrepError::InvalidParameter(
                "missing gas field".to_string(),
            ))
        }
    };
    let gas_price = match params.gas_price.as_deref() {
        Some(price) => units::parse_quantity("gasPrice", price)?,
        None => {
            return Err(PrepError::InvalidParameter(
                "missing gasPrice field".to_string(),
            ))
        }
    };

    // 256x256 -> 512-bit product; adding a 256-bit value cannot wrap 512.
    Ok(gas.full_mul(gas_price) + U512::from(value))
}

/// Decide whether `balance` covers the transaction's maximum cost.
/// Equality is sufficient.
pub fn sufficient_balance(params: &TransactionParams, balance: &str) -> PrepResult<bool> {
    let balance = units::parse_quantity("balance", balance)?;
    let max_cost = max_transaction_cost(params)?;
    Ok(U512::from(balance) >= max_cost)
}
