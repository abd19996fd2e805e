//! TBW Replay
//!
//! Reconstructs, for every block forged by the delegate, which wallets were
//! voting for it and what voting weight each of them held. Nothing is stored
//! per height on chain, so both reconstructions walk the forged blocks from
//! newest to oldest and undo the ledger events of each block window.
//!
//! The two replays are independent pure functions of already-fetched data and
//! may run concurrently.

pub mod balance;
pub mod errors;
pub mod mutation;
pub mod timeline;

pub use balance::*;
pub use errors::*;
pub use mutation::*;
pub use timeline::*;
