//! Payout run orchestration
//!
//! Collaborator I/O happens first and in full; the engine then works on
//! immutable, already-fetched data. The mutation and balance replays are
//! independent and run in parallel, distribution and allocation follow
//! strictly in sequence.

use crate::errors::PipelineError;
use crate::window::RunWindow;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tbw_replay::{replay_voters, BalanceReplay, BlockTimeline};
use tbw_storage::{BusinessIncomeSource, LedgerStore, NetworkConfig, NodeApi};
use tbw_treasury::{
    AllocationInput, DistributionInput, PayoutHistory, PayoutPolicy, ProposalAllocator,
    RevenueDistributor,
};
use tbw_types::{Address, ForgedBlock, Height, Payouts, Voter};
use tracing::{debug, info, warn};

/// The True Block Weight payout engine.
pub struct TrueBlockWeight {
    ledger: Arc<dyn LedgerStore>,
    node: Arc<dyn NodeApi>,
    business: Option<Arc<dyn BusinessIncomeSource>>,
    policy: PayoutPolicy,
}

impl TrueBlockWeight {
    /// Create an engine; the policy is validated once, here.
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        node: Arc<dyn NodeApi>,
        policy: PayoutPolicy,
    ) -> Result<Self, PipelineError> {
        policy.validate()?;
        Ok(Self {
            ledger,
            node,
            business: None,
            policy,
        })
    }

    pub fn with_business_income(mut self, source: Arc<dyn BusinessIncomeSource>) -> Self {
        self.business = Some(source);
        self
    }

    pub fn policy(&self) -> &PayoutPolicy {
        &self.policy
    }

    /// Execute one payout run over `window`.
    pub async fn run(&self, window: &RunWindow) -> Result<Payouts, PipelineError> {
        window.validate()?;

        let network = self.node.network_config().await?;
        self.policy.validate_addresses(network.address_version)?;

        let blocks = self
            .ledger
            .forged_blocks(
                &window.delegate_public_key,
                window.start_height,
                window.end_height,
            )
            .await?;

        let now = window
            .now
            .unwrap_or_else(|| network.current_chain_time());
        let timeline = BlockTimeline::new(&blocks, now)?;
        let (current_height, timestamp) = match timeline.newest() {
            Some(newest) => (newest.height, newest.timestamp),
            None => {
                info!(
                    target: "tbw",
                    start_height = window.start_height,
                    "No forged blocks in range, nothing to pay"
                );
                return Ok(Payouts::default());
            }
        };
        check_reward_schedule(&network, &blocks);

        // ---------------------------------------------------------------------
        // Fetch
        // ---------------------------------------------------------------------
        let current_voters = self.node.voters(&window.delegate_public_key).await?;
        let mutations = self
            .ledger
            .vote_mutations(&window.delegate_public_key, window.start_height)
            .await?;

        let current: Vec<Address> = current_voters.iter().map(|v| v.address.clone()).collect();
        let known: BTreeSet<&str> = current.iter().map(String::as_str).collect();
        let departed: BTreeSet<&str> = mutations
            .iter()
            .map(|m| m.address.as_str())
            .filter(|address| !known.contains(address))
            .collect();

        let mut wallets: Vec<Voter> = current_voters.clone();
        for address in &departed {
            wallets.push(self.node.wallet(address).await?);
        }
        debug!(
            target: "tbw",
            current = current_voters.len(),
            departed = departed.len(),
            "Fetched voter wallets"
        );

        let tracked: Vec<Address> = wallets.iter().map(|w| w.address.clone()).collect();
        let public_keys: Vec<String> = wallets
            .iter()
            .filter(|w| !w.public_key.is_empty())
            .map(|w| w.public_key.clone())
            .collect();

        let transactions = self
            .ledger
            .transactions(&tracked, window.start_height)
            .await?;
        let voter_blocks = self
            .ledger
            .voter_blocks(&public_keys, window.start_height)
            .await?;
        let delegate_transactions = self
            .ledger
            .delegate_transactions(&window.delegate_address, 0)
            .await?;
        let heights: Vec<Height> = blocks.iter().map(|b| b.height).collect();
        let business_income = self.business_income(&heights).await;

        // ---------------------------------------------------------------------
        // Replay
        // ---------------------------------------------------------------------
        let filter = self.policy.voter_filter();
        let threshold = self.policy.small_wallet_threshold();
        let (voter_history, balance_history) = rayon::join(
            || replay_voters(&timeline, &current, &mutations, &filter),
            || {
                BalanceReplay::new(&wallets)
                    .with_small_wallet_threshold(threshold)
                    .replay(&timeline, &transactions, &voter_blocks)
            },
        );
        let balance_history = balance_history?;

        // ---------------------------------------------------------------------
        // Distribute and allocate
        // ---------------------------------------------------------------------
        let history =
            PayoutHistory::from_transactions(&delegate_transactions, &self.policy.vendor_field);

        let accrued = RevenueDistributor::new(&self.policy, &history, network.address_version)?
            .distribute(DistributionInput {
                blocks: &blocks,
                voters_per_block: &voter_history.voters_per_block,
                eligible_voters: &voter_history.eligible_voters,
                balances_per_block: &balance_history.balances_per_block,
                business_income: &business_income,
            })?;

        let payouts = ProposalAllocator::new(&self.policy).allocate(AllocationInput {
            balances: &accrued,
            small_wallets: &balance_history.small_wallets,
            history: &history,
            current_height,
            timestamp,
        });

        info!(
            target: "tbw",
            blocks = blocks.len(),
            voters = voter_history.eligible_voters.len(),
            recipients = payouts.payouts.len(),
            total_payout = %payouts.total_payout(),
            delegate_profit = %payouts.delegate_profit,
            acf_donation = %payouts.acf_donation,
            "Payout run complete"
        );

        Ok(payouts)
    }

    /// Business income is optional; an unavailable source pays nothing.
    async fn business_income(&self, heights: &[Height]) -> BTreeMap<Height, Decimal> {
        let Some(source) = &self.business else {
            return BTreeMap::new();
        };

        match source.income_per_block(heights).await {
            Ok(income) => income,
            Err(err) => {
                warn!(target: "tbw", error = %err, "Business income unavailable, skipping");
                BTreeMap::new()
            }
        }
    }
}

fn check_reward_schedule(network: &NetworkConfig, blocks: &[ForgedBlock]) {
    for block in blocks {
        if let Some(expected) = network.reward_at(block.height) {
            if expected != block.reward {
                warn!(
                    target: "tbw",
                    height = block.height,
                    reward = %block.reward,
                    expected = %expected,
                    "Forged block reward differs from the network schedule"
                );
            }
        }
    }
}
