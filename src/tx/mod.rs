//! Transaction preparation core: normalization, balance checks, gas buffering
//!
//! Everything in this module is synchronous, pure and free of I/O; the
//! service layer owns all network activity.

mod balance;
mod builder;
mod gas;
mod params;
mod preparer;

pub use balance::{max_transaction_cost, sufficient_balance};
pub use builder::build_transaction;
pub use gas::{add_gas_buffer, BufferedGas, GasBufferer, DEFAULT_GAS_BUFFER_MULTIPLIER};
pub use params::{CanonicalTransaction, TransactionParams};
pub use preparer::{PreparedTransaction, TransactionPreparer};
