//! JSON snapshot backend.
//!
//! A [`LedgerSnapshot`] captures every answer the engine needs from the ledger
//! database and the node API at one point in time. Replaying a payout run
//! against the same snapshot reproduces the same artifact.

use crate::errors::StorageError;
use crate::ledger::{BusinessIncomeSource, LedgerStore, NodeApi, VoterPage};
use crate::network::NetworkConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tbw_types::{
    Address, DelegateTransaction, ForgedBlock, Height, Transaction, Voter, VoterBlock,
    VoterMutation,
};
use tracing::{debug, info};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Point-in-time capture of the collaborators' data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub network: NetworkConfig,
    pub delegate_public_key: String,
    pub delegate_address: Address,
    /// Current voters as reported by the node API
    #[serde(default)]
    pub voters: Vec<Voter>,
    /// Wallets that are no longer voting
    #[serde(default)]
    pub wallets: Vec<Voter>,
    #[serde(default)]
    pub forged_blocks: Vec<ForgedBlock>,
    #[serde(default)]
    pub vote_mutations: Vec<VoterMutation>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub voter_blocks: Vec<VoterBlock>,
    #[serde(default)]
    pub delegate_transactions: Vec<DelegateTransaction>,
    #[serde(default)]
    pub nonces: BTreeMap<Address, u64>,
    /// Absent when no business-income source is configured
    #[serde(default)]
    pub business_income: Option<BTreeMap<Height, Decimal>>,
}

impl LedgerSnapshot {
    pub fn new(network: NetworkConfig, delegate_public_key: &str, delegate_address: &str) -> Self {
        Self {
            network,
            delegate_public_key: delegate_public_key.to_string(),
            delegate_address: delegate_address.to_string(),
            voters: Vec::new(),
            wallets: Vec::new(),
            forged_blocks: Vec::new(),
            vote_mutations: Vec::new(),
            transactions: Vec::new(),
            voter_blocks: Vec::new(),
            delegate_transactions: Vec::new(),
            nonces: BTreeMap::new(),
            business_income: None,
        }
    }

    fn known_wallet(&self, address: &str) -> Option<&Voter> {
        self.voters
            .iter()
            .chain(self.wallets.iter())
            .find(|wallet| wallet.address == address)
    }
}

/// Serves every collaborator contract from a [`LedgerSnapshot`].
#[derive(Clone)]
pub struct SnapshotStore {
    snapshot: Arc<RwLock<LedgerSnapshot>>,
    page_size: usize,
}

impl SnapshotStore {
    pub fn new(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Load a snapshot document from disk.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let snapshot: LedgerSnapshot = serde_json::from_slice(&raw)?;

        info!(
            path = %path.display(),
            voters = snapshot.voters.len(),
            forged_blocks = snapshot.forged_blocks.len(),
            transactions = snapshot.transactions.len(),
            "Loaded ledger snapshot"
        );

        Ok(Self::new(snapshot))
    }

    /// Write the current snapshot to disk.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(&*self.snapshot.read())?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// Apply an in-place edit to the snapshot.
    pub fn update<F: FnOnce(&mut LedgerSnapshot)>(&self, edit: F) {
        edit(&mut self.snapshot.write());
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.snapshot.read().clone()
    }
}

#[async_trait]
impl LedgerStore for SnapshotStore {
    async fn forged_blocks(
        &self,
        delegate_public_key: &str,
        start: Height,
        end: Option<Height>,
    ) -> Result<Vec<ForgedBlock>, StorageError> {
        let snapshot = self.snapshot.read();
        if snapshot.delegate_public_key != delegate_public_key {
            return Ok(Vec::new());
        }

        let mut blocks: Vec<ForgedBlock> = snapshot
            .forged_blocks
            .iter()
            .filter(|block| block.height >= start && end.map_or(true, |end| block.height <= end))
            .cloned()
            .collect();
        blocks.sort_by_key(|block| Reverse(block.height));

        debug!(count = blocks.len(), start, "Fetched forged blocks");
        Ok(blocks)
    }

    async fn vote_mutations(
        &self,
        delegate_public_key: &str,
        since: Height,
    ) -> Result<Vec<VoterMutation>, StorageError> {
        let snapshot = self.snapshot.read();
        if snapshot.delegate_public_key != delegate_public_key {
            return Ok(Vec::new());
        }

        Ok(snapshot
            .vote_mutations
            .iter()
            .filter(|mutation| mutation.height >= since)
            .cloned()
            .collect())
    }

    async fn transactions(
        &self,
        addresses: &[Address],
        since: Height,
    ) -> Result<Vec<Transaction>, StorageError> {
        let tracked: HashSet<&str> = addresses.iter().map(String::as_str).collect();
        let snapshot = self.snapshot.read();

        Ok(snapshot
            .transactions
            .iter()
            .filter(|tx| tx.height >= since)
            .filter(|tx| {
                tracked.contains(tx.sender_id.as_str())
                    || tx.credits().iter().any(|(recipient, _)| tracked.contains(recipient))
            })
            .cloned()
            .collect())
    }

    async fn voter_blocks(
        &self,
        public_keys: &[String],
        since: Height,
    ) -> Result<Vec<VoterBlock>, StorageError> {
        let keys: HashSet<&str> = public_keys.iter().map(String::as_str).collect();
        let snapshot = self.snapshot.read();
        let forgers: HashSet<&str> = snapshot
            .voters
            .iter()
            .chain(snapshot.wallets.iter())
            .filter(|wallet| keys.contains(wallet.public_key.as_str()))
            .map(|wallet| wallet.address.as_str())
            .collect();

        Ok(snapshot
            .voter_blocks
            .iter()
            .filter(|block| block.height >= since && forgers.contains(block.address.as_str()))
            .cloned()
            .collect())
    }

    async fn delegate_transactions(
        &self,
        delegate_address: &str,
        since: Height,
    ) -> Result<Vec<DelegateTransaction>, StorageError> {
        let snapshot = self.snapshot.read();
        if snapshot.delegate_address != delegate_address {
            return Ok(Vec::new());
        }

        Ok(snapshot
            .delegate_transactions
            .iter()
            .filter(|tx| tx.height >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NodeApi for SnapshotStore {
    async fn voters_page(
        &self,
        delegate_public_key: &str,
        page: u32,
    ) -> Result<VoterPage, StorageError> {
        let snapshot = self.snapshot.read();
        if snapshot.delegate_public_key != delegate_public_key {
            return Err(StorageError::Unavailable(format!(
                "unknown delegate {delegate_public_key}"
            )));
        }

        let offset = (page.max(1) as usize - 1) * self.page_size;
        let voters: Vec<Voter> = snapshot
            .voters
            .iter()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();
        let has_more = offset + voters.len() < snapshot.voters.len();

        Ok(VoterPage { voters, has_more })
    }

    async fn network_config(&self) -> Result<NetworkConfig, StorageError> {
        Ok(self.snapshot.read().network.clone())
    }

    async fn wallet(&self, address: &str) -> Result<Voter, StorageError> {
        self.snapshot
            .read()
            .known_wallet(address)
            .cloned()
            .ok_or_else(|| StorageError::UnknownWallet(address.to_string()))
    }

    async fn nonce(&self, address: &str) -> Result<u64, StorageError> {
        self.snapshot
            .read()
            .nonces
            .get(address)
            .copied()
            .ok_or_else(|| StorageError::UnknownWallet(address.to_string()))
    }
}

#[async_trait]
impl BusinessIncomeSource for SnapshotStore {
    async fn income_per_block(
        &self,
        heights: &[Height],
    ) -> Result<BTreeMap<Height, Decimal>, StorageError> {
        let snapshot = self.snapshot.read();
        let income = snapshot
            .business_income
            .as_ref()
            .ok_or_else(|| StorageError::Unavailable("no business income recorded".into()))?;

        Ok(heights
            .iter()
            .filter_map(|height| income.get(height).map(|amount| (*height, *amount)))
            .collect())
    }
}
