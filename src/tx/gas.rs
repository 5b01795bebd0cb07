//! Gas limit buffering over a naive estimate
//!
//! A buffered limit leaves headroom above the estimate but stays under 90%
//! of the block gas limit, since other pending transactions also need room
//! in the block.

use crate::error::{PrepError, PrepResult};
use crate::units;

use ethers::types::{U256, U512};

/// Default multiplier applied to a naive gas estimate.
pub const DEFAULT_GAS_BUFFER_MULTIPLIER: f64 = 1.5;

/// Share of the block gas limit a single transaction may claim.
const BLOCK_HEADROOM_NUM: u64 = 9;
const BLOCK_HEADROOM_DEN: u64 = 10;

/// Multiplier precision: three decimal places, truncating below that.
const MULTIPLIER_SCALE: f64 = 1000.0;

/// Outcome of buffering a gas estimate.
///
/// `Oversized` carries the untouched estimate: when the estimate alone
/// cannot fit the block there is no safe buffered value, and inventing a
/// smaller one would produce a transaction guaranteed to run out of gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferedGas {
    /// Estimate times the multiplier, comfortably under the ceiling.
    Buffered(U256),
    /// Clamped to 90% of the block gas limit.
    Capped(U256),
    /// Estimate already exceeds the block gas limit; returned unchanged.
    Oversized(U256),
}

impl BufferedGas {
    /// The gas limit value, whichever way it was derived.
    pub fn limit(&self) -> U256 {
        match *self {
            BufferedGas::Buffered(v) | BufferedGas::Capped(v) | BufferedGas::Oversized(v) => v,
        }
    }

    /// Minimal hex encoding of the limit.
    pub fn to_hex(&self) -> String {
        units::format_quantity(self.limit())
    }

    pub fn is_oversized(&self) -> bool {
        matches!(self, BufferedGas::Oversized(_))
    }
}

/// Applies a bounded buffer to naive gas estimates.
pub struct GasBufferer {
    /// Multiplier scaled to thousandths, so buffering stays integer-only.
    multiplier_millis: u64,
}

impl GasBufferer {
    /// Create a bufferer with a custom multiplier.
    ///
    /// Fails fast on a non-finite, zero or negative multiplier: no such
    /// value can ever produce a usable gas limit.
    pub fn new(multiplier: f64) -> PrepResult<Self> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(PrepError::InvalidParameter(format!(
                "gas buffer multiplier must be positive, got {}",
                multiplier
            )));
        }
        let scaled = (multiplier * MULTIPLIER_SCALE).round();
        if scaled < 1.0 || scaled > u64::MAX as f64 {
            return Err(PrepError::InvalidParameter(format!(
                "gas buffer multiplier {} is out of range",
                multiplier
            )));
        }
        Ok(Self {
            multiplier_millis: scaled as u64,
        })
    }

    /// Buffer `estimated_gas` against `block_gas_limit`, both hex quantities.
    ///
    /// In priority order:
    /// - estimate above the block limit: the estimate, unchanged;
    /// - buffered estimate below the 90% ceiling: the buffered estimate;
    /// - otherwise: the ceiling.
    pub fn add_gas_buffer(
        &self,
        estimated_gas: &str,
        block_gas_limit: &str,
    ) -> PrepResult<BufferedGas> {
        let estimate = units::parse_quantity("estimatedGas", estimated_gas)?;
        let limit = units::parse_quantity("blockGasLimit", block_gas_limit)?;

        if estimate > limit {
            return Ok(BufferedGas::Oversized(estimate));
        }

        // floor(estimate * multiplier), no fractional gas
        let buffered = estimate.full_mul(U256::from(self.multiplier_millis))
            / U512::from(MULTIPLIER_SCALE as u64);

        // floor(limit * 9 / 10)
        let ceiling = limit.full_mul(U256::from(BLOCK_HEADROOM_NUM))
            / U512::from(BLOCK_HEADROOM_DEN);

        // compared widened; the winner is below the block limit, so it
        // always narrows back to 256 bits
        if buffered < ceiling {
            Ok(BufferedGas::Buffered(units::narrow(buffered, "buffered gas")?))
        } else {
            Ok(BufferedGas::Capped(units::narrow(ceiling, "gas ceiling")?))
        }
    }
}

impl Default for GasBufferer {
    fn default() -> Self {
        Self {
            multiplier_millis: (DEFAULT_GAS_BUFFER_MULTIPLIER * MULTIPLIER_SCALE) as u64,
        }
    }
}

/// Buffer with the default 1.5x multiplier.
pub fn add_gas_buffer(estimated_gas: &str, block_gas_limit: &str) -> PrepResult<BufferedGas> {
    GasBufferer::default().add_gas_buffer(estimated_gas, block_gas_limit)
}
