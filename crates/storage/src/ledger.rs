//! Collaborator contracts.
//!
//! Every query returns fully materialised, typed rows. A failed query is
//! surfaced as a [`StorageError`] and aborts the run; retries are the
//! implementor's concern.

use crate::errors::StorageError;
use crate::network::NetworkConfig;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tbw_types::{
    Address, DelegateTransaction, ForgedBlock, Height, Transaction, Voter, VoterBlock,
    VoterMutation,
};

/// Read access to the indexed ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Blocks forged by `delegate_public_key` in `[start, end]`, newest first.
    async fn forged_blocks(
        &self,
        delegate_public_key: &str,
        start: Height,
        end: Option<Height>,
    ) -> Result<Vec<ForgedBlock>, StorageError>;

    /// Vote and unvote transactions targeting the delegate since `since`.
    async fn vote_mutations(
        &self,
        delegate_public_key: &str,
        since: Height,
    ) -> Result<Vec<VoterMutation>, StorageError>;

    /// Value-moving transactions sent or received by any of `addresses`.
    async fn transactions(
        &self,
        addresses: &[Address],
        since: Height,
    ) -> Result<Vec<Transaction>, StorageError>;

    /// Blocks forged by any of `public_keys`.
    async fn voter_blocks(
        &self,
        public_keys: &[String],
        since: Height,
    ) -> Result<Vec<VoterBlock>, StorageError>;

    /// Transactions sent by the delegate wallet.
    async fn delegate_transactions(
        &self,
        delegate_address: &str,
        since: Height,
    ) -> Result<Vec<DelegateTransaction>, StorageError>;
}

/// One page of the delegate's current voters
#[derive(Debug, Clone, Default)]
pub struct VoterPage {
    pub voters: Vec<Voter>,
    pub has_more: bool,
}

/// Remote node API.
#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn voters_page(
        &self,
        delegate_public_key: &str,
        page: u32,
    ) -> Result<VoterPage, StorageError>;

    async fn network_config(&self) -> Result<NetworkConfig, StorageError>;

    /// Current balance, power and stakes of any wallet.
    async fn wallet(&self, address: &str) -> Result<Voter, StorageError>;

    /// Outgoing sequence counter of `address`.
    async fn nonce(&self, address: &str) -> Result<u64, StorageError>;

    /// Every current voter, following pagination to the end.
    async fn voters(&self, delegate_public_key: &str) -> Result<Vec<Voter>, StorageError> {
        let mut voters = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.voters_page(delegate_public_key, page).await?;
            voters.extend(batch.voters);
            if !batch.has_more {
                break;
            }
            page += 1;
        }
        Ok(voters)
    }
}

/// Auxiliary revenue booked against forged blocks.
#[async_trait]
pub trait BusinessIncomeSource: Send + Sync {
    async fn income_per_block(
        &self,
        heights: &[Height],
    ) -> Result<BTreeMap<Height, Decimal>, StorageError>;
}
