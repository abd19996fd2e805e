//! Revenue distributor.
//!
//! For every forged block, each eligible voter receives
//! `balance / total eligible balance` of the block reward, the block fees and
//! the block's business income. Shares are truncated to eight decimal places,
//! so the accruals of one block never exceed the block's totals.

use crate::errors::TreasuryError;
use crate::history::PayoutHistory;
use crate::policy::PayoutPolicy;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashSet};
use tbw_replay::{BalancesPerBlock, VotersPerBlock};
use tbw_types::{Address, ChainTimestamp, ForgedBlock, Height, PayoutBalances, ACCRUAL_DECIMALS};
use tracing::{debug, info};

/// Reconstructed state the distributor reads.
#[derive(Debug, Clone, Copy)]
pub struct DistributionInput<'a> {
    pub blocks: &'a [ForgedBlock],
    pub voters_per_block: &'a VotersPerBlock,
    pub eligible_voters: &'a [Address],
    pub balances_per_block: &'a BalancesPerBlock,
    /// Business income per forged block height; absent heights earn nothing
    pub business_income: &'a BTreeMap<Height, Decimal>,
}

pub struct RevenueDistributor<'a> {
    policy: &'a PayoutPolicy,
    history: &'a PayoutHistory,
    /// Replaces per-address payout timestamps when voters get no share
    gate_override: Option<ChainTimestamp>,
}

fn accrual(share: Decimal, amount: Decimal) -> Decimal {
    (share * amount).round_dp_with_strategy(ACCRUAL_DECIMALS, RoundingStrategy::ToZero)
}

impl<'a> RevenueDistributor<'a> {
    /// Create a distributor, validating redirect targets against the network.
    pub fn new(
        policy: &'a PayoutPolicy,
        history: &'a PayoutHistory,
        address_version: u8,
    ) -> Result<Self, TreasuryError> {
        policy.validate_redirects(address_version)?;

        let gate_override = if policy.voter_share.is_zero() {
            history.latest_admin_timestamp(&policy.admins)
        } else {
            None
        };

        Ok(Self {
            policy,
            history,
            gate_override,
        })
    }

    /// Timestamp of the last payout already covering `payout_address`.
    fn paid_until(&self, payout_address: &str) -> Option<ChainTimestamp> {
        self.gate_override
            .or_else(|| self.history.last_timestamp(payout_address))
    }

    /// Accrue every voter's share across the whole block range.
    pub fn distribute(&self, input: DistributionInput<'_>) -> Result<PayoutBalances, TreasuryError> {
        let eligible: HashSet<&str> = input.eligible_voters.iter().map(String::as_str).collect();
        let min_balance = self.policy.min_voter_balance;
        let mut balances = PayoutBalances::new();

        for block in input.blocks {
            let voters = input
                .voters_per_block
                .get(&block.height)
                .ok_or(TreasuryError::MissingVoterSet {
                    height: block.height,
                })?;
            let snapshot = input
                .balances_per_block
                .get(&block.height)
                .ok_or(TreasuryError::MissingBalances {
                    height: block.height,
                })?;

            let counted: Vec<(&str, Decimal)> = voters
                .iter()
                .filter(|voter| eligible.contains(voter.as_str()))
                .filter_map(|voter| snapshot.get(voter).map(|b| (voter.as_str(), *b)))
                .filter(|(_, balance)| *balance >= min_balance)
                .collect();

            let total: Decimal = counted.iter().map(|(_, balance)| *balance).sum();
            if total.is_zero() {
                debug!(target: "treasury", height = block.height, "No eligible voting weight");
                continue;
            }

            let business = input
                .business_income
                .get(&block.height)
                .copied()
                .unwrap_or_default();

            for (voter, balance) in counted {
                let payout_address = self.policy.payout_address(voter);
                if let Some(paid) = self.paid_until(payout_address) {
                    if paid >= block.timestamp {
                        continue;
                    }
                }

                let share = balance / total;
                balances.accrue(
                    payout_address,
                    accrual(share, block.reward),
                    accrual(share, block.fees),
                    accrual(share, business),
                );
            }
        }

        info!(
            target: "treasury",
            blocks = input.blocks.len(),
            recipients = balances.rewards.len(),
            total_rewards = %balances.total_rewards(),
            "Distributed forged block revenue"
        );

        Ok(balances)
    }
}
