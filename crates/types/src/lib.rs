//! TBW Types
//!
//! Typed entities shared by the ledger-replay and reward-allocation engine:
//! forged blocks, vote mutations, wallets and stakes, value-moving
//! transactions, prior payouts, and the final payout artifact.
//!
//! Monetary unit: the chain's smallest unit. 1 coin = 100 000 000 units.

pub mod address;
pub mod amount;
pub mod block;
pub mod payouts;
pub mod transaction;
pub mod wallet;

pub use address::*;
pub use amount::*;
pub use block::*;
pub use payouts::*;
pub use transaction::*;
pub use wallet::*;
