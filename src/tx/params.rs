//! Wire-level and canonical transaction representations
//!
//! Numeric fields are carried as `0x`-prefixed hex strings end to end so the
//! exact byte representation survives normalization; nothing round-trips
//! through a floating or native-width type.

use crate::error::{PrepError, PrepResult};
use crate::units;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::TransactionRequest;
use serde::{Deserialize, Serialize};

/// Raw transaction parameters as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Decimal chain identifier, scoping signatures to one network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// The normalized, encodable form of [`TransactionParams`].
///
/// Fields are copied verbatim from the validated input; when a chain id is
/// present any downstream signature is bound to that network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl CanonicalTransaction {
    /// Chain id this transaction is scoped to, if any.
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// Recover an equivalent parameter set. Normalizing the result again
    /// yields an identical canonical transaction.
    pub fn into_params(self) -> TransactionParams {
        TransactionParams {
            from: self.from,
            to: self.to,
            value: self.value,
            gas: self.gas,
            gas_price: self.gas_price,
            data: self.data,
            nonce: self.nonce,
            chain_id: self.chain_id,
        }
    }

    /// Encode into the signable transaction form. The embedded chain id is
    /// carried into the request so the signature hash is scoped to that
    /// network.
    pub fn to_typed(&self) -> PrepResult<TypedTransaction> {
        let mut request = TransactionRequest::new();
        request = request.from(units::parse_address("from", &self.from)?);
        if let Some(ref to) = self.to {
            request = request.to(units::parse_address("to", to)?);
        }
        if let Some(ref value) = self.value {
            request = request.value(units::parse_quantity("value", value)?);
        }
        if let Some(ref gas) = self.gas {
            request = request.gas(units::parse_quantity("gas", gas)?);
        }
        if let Some(ref gas_price) = self.gas_price {
            request = request.gas_price(units::parse_quantity("gasPrice", gas_price)?);
        }
        if let Some(ref data) = self.data {
            request = request.data(units::parse_data("data", data)?);
        }
        if let Some(ref nonce) = self.nonce {
            request = request.nonce(units::parse_quantity("nonce", nonce)?);
        }
        if let Some(chain_id) = self.chain_id {
            request = request.chain_id(chain_id);
        }
        if self.to.is_none() && self.data.is_none() {
            return Err(PrepError::InvalidParameter(
                "transaction has neither a recipient nor a payload".to_string(),
            ));
        }
        Ok(TypedTransaction::Legacy(request))
    }
}
