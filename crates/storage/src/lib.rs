//! TBW Storage
//!
//! Read-only contracts the engine consumes from its collaborators:
//! the ledger database (forged blocks, vote mutations, transactions) and the
//! remote node API (current voters, wallets, network configuration). An
//! optional business-income source feeds auxiliary revenue.
//!
//! [`SnapshotStore`] answers every contract from a single JSON document and
//! backs both the command-line runner and the integration tests.

pub mod errors;
pub mod ledger;
pub mod network;
pub mod snapshot;

pub use errors::StorageError;
pub use ledger::{BusinessIncomeSource, LedgerStore, NodeApi, VoterPage};
pub use network::{NetworkConfig, RewardStage};
pub use snapshot::{LedgerSnapshot, SnapshotStore};
