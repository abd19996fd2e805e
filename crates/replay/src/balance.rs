//! Balance replay: each voter's weight immediately before each forged block.
//!
//! The walk starts from today's balances (staked power counts when it exceeds
//! the liquid balance) and, window by window, undoes every value-moving event:
//! received amounts are taken back, sent amounts and fees are returned,
//! stake power-ups and redemptions are reversed, and self-forged income is
//! removed. Reconstructed balances are clamped at zero.

use crate::errors::ReplayError;
use crate::timeline::{BlockTimeline, BlockWindow};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use tbw_types::{non_negative, Address, Height, Transaction, Voter, VoterBlock};
use tracing::{debug, info};

/// Address → balance
pub type BalanceMap = BTreeMap<Address, Decimal>;

/// Balance snapshot per forged block height
pub type BalancesPerBlock = BTreeMap<Height, BalanceMap>;

/// Result of replaying the value-moving transaction log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceHistory {
    pub balances_per_block: BalancesPerBlock,
    /// `true` while the wallet never exceeded the small-wallet threshold
    pub small_wallets: BTreeMap<Address, bool>,
}

impl BalanceHistory {
    pub fn balance_at(&self, height: Height, address: &str) -> Option<Decimal> {
        self.balances_per_block
            .get(&height)
            .and_then(|balances| balances.get(address))
            .copied()
    }

    pub fn is_small_wallet(&self, address: &str) -> bool {
        self.small_wallets.get(address).copied().unwrap_or(false)
    }
}

/// Backward replay over the tracked voters' ledger history.
pub struct BalanceReplay<'a> {
    voters: HashMap<&'a str, &'a Voter>,
    balances: BalanceMap,
    small_wallet_threshold: Option<Decimal>,
}

impl<'a> BalanceReplay<'a> {
    /// Seed the working map with every tracked voter's current weight.
    pub fn new(voters: &'a [Voter]) -> Self {
        let balances = voters
            .iter()
            .map(|voter| (voter.address.clone(), voter.voting_weight()))
            .collect();

        Self {
            voters: voters.iter().map(|v| (v.address.as_str(), v)).collect(),
            balances,
            small_wallet_threshold: None,
        }
    }

    pub fn with_small_wallet_threshold(mut self, threshold: Option<Decimal>) -> Self {
        self.small_wallet_threshold = threshold;
        self
    }

    /// Run the replay and return one snapshot per forged block.
    pub fn replay(
        mut self,
        timeline: &BlockTimeline,
        transactions: &[Transaction],
        voter_blocks: &[VoterBlock],
    ) -> Result<BalanceHistory, ReplayError> {
        let mut log: Vec<&Transaction> = transactions.iter().collect();
        log.sort_by_key(|tx| Reverse(tx.height));

        let mut small_wallets: BTreeMap<Address, bool> =
            self.balances.keys().map(|a| (a.clone(), true)).collect();
        let mut balances_per_block = BalancesPerBlock::new();
        let mut cursor = 0;

        for window in timeline.windows() {
            let start = cursor;
            while cursor < log.len() && log[cursor].height >= window.height {
                cursor += 1;
            }

            for tx in log[start..cursor].iter().filter(|tx| window.contains_height(tx.height)) {
                self.undo_transaction(tx)?;
            }
            self.undo_stakes(window);
            self.undo_forging(window, voter_blocks);

            if let Some(threshold) = self.small_wallet_threshold {
                for (address, balance) in &self.balances {
                    if *balance > threshold {
                        small_wallets.insert(address.clone(), false);
                    }
                }
            }

            debug!(
                target: "replay",
                height = window.height,
                transactions = cursor - start,
                "Reconstructed voter balances"
            );

            balances_per_block.insert(window.height, self.balances.clone());
        }

        info!(
            target: "replay",
            blocks = balances_per_block.len(),
            voters = self.balances.len(),
            "Balance replay complete"
        );

        Ok(BalanceHistory {
            balances_per_block,
            small_wallets,
        })
    }

    fn debit(&mut self, address: &str, amount: Decimal) {
        if let Some(balance) = self.balances.get_mut(address) {
            *balance = non_negative(*balance - amount);
        }
    }

    fn credit(&mut self, address: &str, amount: Decimal) {
        if let Some(balance) = self.balances.get_mut(address) {
            *balance += amount;
        }
    }

    fn undo_transaction(&mut self, tx: &Transaction) -> Result<(), ReplayError> {
        let credits = tx.credits();
        for (recipient, amount) in &credits {
            self.debit(recipient, *amount);
        }

        if !self.balances.contains_key(tx.sender_id.as_str()) {
            return Ok(());
        }

        let returned = match &tx.stake_redeem {
            Some(stake_id) => self
                .voters
                .get(tx.sender_id.as_str())
                .and_then(|voter| voter.stake(stake_id))
                .map(|stake| stake.redeemable_value())
                .ok_or_else(|| ReplayError::UnknownStake {
                    address: tx.sender_id.clone(),
                    stake_id: stake_id.clone(),
                })?,
            None => {
                let sent: Decimal = match tx.multi_payment {
                    Some(_) => credits.iter().map(|(_, amount)| *amount).sum(),
                    None => tx.amount,
                };
                sent + tx.fee
            }
        };

        self.credit(&tx.sender_id, returned);
        Ok(())
    }

    fn undo_stakes(&mut self, window: &BlockWindow) {
        let mut adjustments: Vec<(&'a str, Decimal, Decimal)> = Vec::new();

        for (&address, voter) in &self.voters {
            for stake in &voter.processed_stakes {
                if window.contains_time(stake.timestamps.power_up) {
                    adjustments.push((address, stake.power, stake.amount));
                }
                if window.contains_time(stake.timestamps.redeemable) {
                    adjustments.push((address, Decimal::ZERO, stake.redeemable_value()));
                }
            }
        }

        // Sorted so clamping is independent of hash-map iteration order.
        adjustments.sort_by(|a, b| a.0.cmp(b.0));

        for (address, removed, restored) in adjustments {
            if let Some(balance) = self.balances.get_mut(address) {
                *balance = non_negative(*balance - removed + restored);
            }
        }
    }

    fn undo_forging(&mut self, window: &BlockWindow, voter_blocks: &[VoterBlock]) {
        for block in voter_blocks.iter().filter(|b| window.follows_height(b.height)) {
            self.debit(&block.address, block.gains());
        }
    }
}
