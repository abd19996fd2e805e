//! Proposal Allocator — accrued shares to final payout amounts
//!
//! Applies the delegate policy to the accrual maps produced by the revenue
//! distributor:
//! - frequency gate per address (dropped entirely when not yet due)
//! - share percentage: custom override, small-wallet bonus, or default
//! - donation rounded up, voter portion rounded down, remainder to the delegate
//! - fee and business-income portions added before the minimum-payout check
//! - fair-fee redistribution over the remaining payouts

use crate::fair_fees::{apply_fair_fees, fair_fee_total};
use crate::history::PayoutHistory;
use crate::policy::PayoutPolicy;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tbw_types::{Address, AmountMap, ChainTimestamp, Height, PayoutBalances, Payouts};
use tracing::{debug, info, warn};

/// Per-run inputs of the allocator.
#[derive(Debug, Clone, Copy)]
pub struct AllocationInput<'a> {
    pub balances: &'a PayoutBalances,
    pub small_wallets: &'a BTreeMap<Address, bool>,
    pub history: &'a PayoutHistory,
    /// Latest forged height of the run
    pub current_height: Height,
    pub timestamp: ChainTimestamp,
}

// =============================================================================
// SPLITS
// =============================================================================

/// How one address's reward accrual is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardSplit {
    pub donation: Decimal,
    pub voter: Decimal,
    pub delegate: Decimal,
}

/// Split a reward accrual: donation rounded up, voter portion rounded down.
pub fn split_reward(reward: Decimal, share: Decimal, donation_share: Decimal) -> RewardSplit {
    let donation = (reward * donation_share).ceil().min(reward);
    let voter = (reward * share)
        .floor()
        .min((reward - donation).floor())
        .max(Decimal::ZERO);

    RewardSplit {
        donation,
        voter,
        delegate: reward - donation - voter,
    }
}

/// Voter part of an accrual passed on at `fraction`, rounded down.
fn voter_portion(accrual: Decimal, fraction: Decimal) -> Decimal {
    (accrual * fraction).floor().max(Decimal::ZERO)
}

// =============================================================================
// ALLOCATOR
// =============================================================================

pub struct ProposalAllocator<'a> {
    policy: &'a PayoutPolicy,
}

impl<'a> ProposalAllocator<'a> {
    pub fn new(policy: &'a PayoutPolicy) -> Self {
        Self { policy }
    }

    /// Frequency gate: addresses without history or custom frequency always pass.
    fn is_due(&self, address: &str, history: &PayoutHistory, current_height: Height) -> bool {
        match (
            history.last_height(address),
            self.policy.custom_frequencies.get(address),
        ) {
            (Some(last), Some(frequency)) => last.saturating_add(*frequency) < current_height,
            _ => true,
        }
    }

    /// Small-wallet flags are kept per voter. A booked address is small when
    /// every tracked voter paid through it is.
    fn is_small_wallet(&self, address: &str, flags: &BTreeMap<Address, bool>) -> bool {
        let mut tracked = self
            .policy
            .booked_voters(address)
            .filter_map(|voter| flags.get(voter).copied())
            .peekable();
        tracked.peek().is_some() && tracked.all(|small| small)
    }

    /// Resolve the accrual maps into the final payout artifact.
    pub fn allocate(&self, input: AllocationInput<'_>) -> Payouts {
        let policy = self.policy;
        let mut payouts = AmountMap::new();
        let mut delegate_profit = Decimal::ZERO;
        let mut acf_donation = Decimal::ZERO;
        let mut total_payout = Decimal::ZERO;

        for (address, reward) in &input.balances.rewards {
            if reward.is_zero() {
                continue;
            }

            if !self.is_due(address, input.history, input.current_height) {
                debug!(
                    target: "treasury",
                    address = %address,
                    "Payout frequency not reached, skipping"
                );
                continue;
            }

            let small_wallet = self.is_small_wallet(address, input.small_wallets);
            let share = policy.share_for(address, small_wallet);

            let split = split_reward(*reward, share, policy.donation_share);
            acf_donation += split.donation;
            delegate_profit += split.delegate;
            let mut payout = split.voter;

            let fees = input.balances.fees_of(address);
            if !fees.is_zero() {
                let voter_fees = voter_portion(fees, policy.voter_fee_share);
                delegate_profit += fees - voter_fees;
                payout += voter_fees;
            }

            let business = input.balances.business_of(address);
            if !business.is_zero() {
                let voter_business = voter_portion(business, share);
                delegate_profit += business - voter_business;
                payout += voter_business;
            }

            if payout.is_zero() || payout < policy.min_payout {
                warn!(
                    target: "treasury",
                    address = %address,
                    payout = %payout,
                    min_payout = %policy.min_payout,
                    "Payout below minimum, dropping"
                );
                continue;
            }

            total_payout += payout;
            payouts.insert(address.clone(), payout);
        }

        if policy.fair_fees.enabled && !payouts.is_empty() {
            let total_fees =
                fair_fee_total(payouts.len(), policy.extra_recipients(), &policy.fair_fees);
            let deducted = apply_fair_fees(&mut payouts, total_fees);
            total_payout -= deducted;

            debug!(
                target: "treasury",
                total_fees = %total_fees,
                deducted = %deducted,
                "Applied fair fees"
            );
        }

        info!(
            target: "treasury",
            recipients = payouts.len(),
            total_payout = %total_payout,
            delegate_profit = %delegate_profit,
            acf_donation = %acf_donation,
            "Payout proposal allocated"
        );

        Payouts {
            payouts,
            delegate_profit,
            acf_donation,
            timestamp: input.timestamp,
        }
    }
}
