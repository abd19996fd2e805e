use crate::address::Address;
use crate::block::ChainTimestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Power-up and redemption instants of a stake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeTimestamps {
    pub power_up: ChainTimestamp,
    pub redeemable: ChainTimestamp,
}

/// A locked stake contributing voting weight beyond the liquid balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stake {
    pub id: String,
    /// Principal
    pub amount: Decimal,
    /// Voting weight while staked, never below `amount`
    pub power: Decimal,
    pub timestamps: StakeTimestamps,
}

impl Stake {
    /// Value realised once the stake is past its redeemable instant.
    pub fn redeemable_value(&self) -> Decimal {
        (self.power - self.amount) / Decimal::TWO
    }
}

/// A wallet currently (or historically) voting for the delegate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    pub address: Address,
    #[serde(default)]
    pub public_key: String,
    pub balance: Decimal,
    #[serde(default)]
    pub power: Decimal,
    #[serde(default)]
    pub processed_stakes: Vec<Stake>,
}

impl Voter {
    /// Voting weight the replay is seeded with.
    pub fn voting_weight(&self) -> Decimal {
        self.power.max(self.balance)
    }

    pub fn stake(&self, id: &str) -> Option<&Stake> {
        self.processed_stakes.iter().find(|stake| stake.id == id)
    }
}
