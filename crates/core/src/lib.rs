//! TBW Core
//!
//! One payout run: fetch everything the run needs from the ledger store and
//! the node API, reconstruct per-block voter sets and balances, distribute
//! every forged block's revenue, and resolve the accruals into a payout
//! proposal. A run either yields a complete [`tbw_types::Payouts`] or fails.

pub mod errors;
pub mod pipeline;
pub mod window;

pub use errors::PipelineError;
pub use pipeline::TrueBlockWeight;
pub use window::RunWindow;
