//! TBW Treasury Module
//!
//! Turns reconstructed per-block voter sets and balances into payouts:
//! the revenue distributor accrues each voter's pro-rata share of every
//! forged block, and the proposal allocator applies the delegate's payout
//! policy (shares, donation, minimums, frequency, fair fees).

pub mod allocator;
pub mod distributor;
pub mod errors;
pub mod fair_fees;
pub mod history;
pub mod policy;

pub use allocator::{split_reward, AllocationInput, ProposalAllocator, RewardSplit};
pub use distributor::{DistributionInput, RevenueDistributor};
pub use errors::TreasuryError;
pub use fair_fees::{apply_fair_fees, fair_fee_total};
pub use history::PayoutHistory;
pub use policy::{AdminShare, FairFeeSchedule, PayoutPolicy, SmallWalletBonus};
