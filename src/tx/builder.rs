//! Transaction normalization
//!
//! Shape-checks raw parameters and copies them verbatim into the canonical
//! encodable form. Semantic checks (can the account afford it, does the gas
//! fit the block) belong to the balance checker and the preparer.

use super::params::{CanonicalTransaction, TransactionParams};
use crate::error::{PrepError, PrepResult};
use crate::units;

/// Normalize raw parameters into a [`CanonicalTransaction`].
///
/// Every present field must parse in its declared encoding; a transaction
/// with neither a recipient nor a contract-creation payload has no valid
/// shape. Hex fields are carried over verbatim, so repeated normalization
/// is idempotent.
pub fn build_transaction(params: &TransactionParams) -> PrepResult<CanonicalTransaction> {
    units::parse_address("from", &params.from)?;
    if let Some(ref to) = params.to {
        units::parse_address("to", to)?;
    }
    if let Some(ref value) = params.value {
        units::parse_quantity("value", value)?;
    }
    if let Some(ref gas) = params.gas {
        units::parse_quantity("gas", gas)?;
    }
    if let Some(ref gas_price) = params.gas_price {
        units::parse_quantity("gasPrice", gas_price)?;
    }
    if let Some(ref data) = params.data {
        units::parse_data("data", data)?;
    }
    if let Some(ref nonce) = params.nonce {
        units::parse_quantity("nonce", nonce)?;
    }

    if params.to.is_none() && params.data.is_none() {
        return Err(PrepError::InvalidParameter(
            "transaction has neither a recipient nor a payload".to_string(),
        ));
    }

    Ok(CanonicalTransaction {
        from: params.from.clone(),
        to: params.to.clone(),
        value: params.value.clone(),
        gas: params.gas.clone(),
        gas_price: params.gas_price.clone(),
        data: params.data.clone(),
        nonce: params.nonce.clone(),
        chain_id: params.chain_id,
    })
}
