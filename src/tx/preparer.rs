//! Preparation pipeline: normalize, buffer gas, check balance
//!
//! Sequences the pure core functions against a chain context. The context
//! is an abstract capability (chain id plus block gas limit) so callers and
//! tests can supply a stub instead of a live network client.

use super::balance::max_transaction_cost;
use super::builder::build_transaction;
use super::gas::GasBufferer;
use super::params::{CanonicalTransaction, TransactionParams};
use crate::chain::ChainContext;
use crate::error::{PrepError, PrepResult};
use crate::units;

use ethers::types::U512;
use tracing::debug;

/// A fully prepared transaction with its derived gas limit attached.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub transaction: CanonicalTransaction,
    /// Buffered gas limit, minimal hex.
    pub gas_limit: String,
    /// Maximum amount the transaction can draw, minimal hex.
    pub max_cost: String,
    /// Whether the gas limit was clamped to the block headroom ceiling.
    pub capped: bool,
}

/// Sequences normalization, gas buffering and the balance check.
pub struct TransactionPreparer {
    bufferer: GasBufferer,
}

impl TransactionPreparer {
    pub fn new(multiplier: f64) -> PrepResult<Self> {
        Ok(Self {
            bufferer: GasBufferer::new(multiplier)?,
        })
    }

    /// The configured gas bufferer.
    pub fn bufferer(&self) -> &GasBufferer {
        &self.bufferer
    }

    /// Prepare `params` for signing: buffer the externally obtained
    /// `estimated_gas` against the context's block gas limit, attach the
    /// result as the gas limit, verify `balance` covers the maximum cost,
    /// and emit the canonical transaction.
    ///
    /// An absent chain id is filled from the context; an explicit one is
    /// left untouched.
    pub fn prepare(
        &self,
        ctx: &dyn ChainContext,
        params: &TransactionParams,
        balance: &str,
        estimated_gas: &str,
    ) -> PrepResult<PreparedTransaction> {
        let mut params = params.clone();
        if params.chain_id.is_none() {
            params.chain_id = ctx.chain_id();
        }

        let block_gas_limit = ctx.block_gas_limit();
        let buffered = self.bufferer.add_gas_buffer(estimated_gas, &block_gas_limit)?;
        if buffered.is_oversized() {
            return Err(PrepError::OversizedEstimate {
                estimated: buffered.to_hex(),
                block_limit: block_gas_limit,
            });
        }

        let capped = !matches!(buffered, super::gas::BufferedGas::Buffered(_));
        params.gas = Some(buffered.to_hex());

        let max_cost = max_transaction_cost(&params)?;
        let have = units::parse_quantity("balance", balance)?;
        if U512::from(have) < max_cost {
            return Err(PrepError::InsufficientBalance {
                have: units::format_quantity(have),
                need: format!("{:#x}", max_cost),
            });
        }

        let transaction = build_transaction(&params)?;
        debug!(
            chain_id = ?transaction.chain_id(),
            gas_limit = %buffered.to_hex(),
            "transaction prepared"
        );

        Ok(PreparedTransaction {
            gas_limit: buffered.to_hex(),
            max_cost: format!("{:#x}", max_cost),
            capped,
            transaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::StaticChainContext;
    use crate::tx::gas::DEFAULT_GAS_BUFFER_MULTIPLIER;

    fn context() -> StaticChainContext {
        StaticChainContext {
            chain_id: Some(42),
            // 4M block gas limit
            block_gas_limit: "0x3d4c52".to_string(),
        }
    }

    fn params() -> TransactionParams {
        TransactionParams {
            from: "0x69ad465e0bab6504002ad58c744ed89c7da38525".to_string(),
            to: Some("0x70ad465e0bab6504002ad58c744ed89c7da38524".to_string()),
            value: Some("0x1".to_string()),
            gas: None,
            gas_price: Some("0x2".to_string()),
            data: None,
            nonce: Some("0x3".to_string()),
            chain_id: None,
        }
    }

    fn preparer() -> TransactionPreparer {
        TransactionPreparer::new(DEFAULT_GAS_BUFFER_MULTIPLIER).unwrap()
    }

    #[test]
    fn prepares_and_fills_chain_id_from_context() {
        // buffered gas: floor(1.5M * 1.5) = 2.25M; cost = 1 + 2.25M * 2
        let prepared = preparer()
            .prepare(&context(), &params(), "0x500000", "0x16e360")
            .unwrap();
        assert_eq!(prepared.gas_limit, "0x225510");
        assert_eq!(prepared.transaction.chain_id(), Some(42));
        assert_eq!(prepared.transaction.gas.as_deref(), Some("0x225510"));
        assert!(!prepared.capped);
        assert_eq!(prepared.max_cost, "0x44aa21");
    }

    #[test]
    fn explicit_chain_id_is_left_untouched() {
        let mut p = params();
        p.chain_id = Some(5);
        let prepared = preparer()
            .prepare(&context(), &p, "0x500000", "0x16e360")
            .unwrap();
        assert_eq!(prepared.transaction.chain_id(), Some(5));
    }

    #[test]
    fn insufficient_balance_is_a_typed_error() {
        // cost = 1 + 2.25M * 2 = 0x44aa21; one short of it
        let err = preparer()
            .prepare(&context(), &params(), "0x44aa20", "0x16e360")
            .unwrap_err();
        match err {
            PrepError::InsufficientBalance { have, need } => {
                assert_eq!(have, "0x44aa20");
                assert_eq!(need, "0x44aa21");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn balance_equal_to_cost_is_admitted() {
        let prepared = preparer()
            .prepare(&context(), &params(), "0x44aa21", "0x16e360")
            .unwrap();
        assert_eq!(prepared.max_cost, "0x44aa21");
    }

    #[test]
    fn oversized_estimate_propagates() {
        let ctx = StaticChainContext {
            chain_id: Some(42),
            block_gas_limit: "0x0f4240".to_string(),
        };
        let err = preparer()
            .prepare(&ctx, &params(), "0x500000", "0x16e360")
            .unwrap_err();
        assert!(matches!(err, PrepError::OversizedEstimate { .. }));
    }

    #[test]
    fn capped_gas_limit_is_reported() {
        let ctx = StaticChainContext {
            chain_id: Some(42),
            // 2M limit: 1.5M buffers past the 1.8M ceiling
            block_gas_limit: "0x1e8480".to_string(),
        };
        let prepared = preparer()
            .prepare(&ctx, &params(), "0x1000000", "0x16e360")
            .unwrap();
        assert!(prepared.capped);
        assert_eq!(prepared.gas_limit, "0x1b7740");
    }
}
