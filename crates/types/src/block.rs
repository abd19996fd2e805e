use crate::address::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Block height
pub type Height = u64;

/// Seconds since the chain epoch
pub type ChainTimestamp = i64;

/// A block forged by the delegate inside the configured height window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgedBlock {
    pub height: Height,
    pub timestamp: ChainTimestamp,
    /// Fees collected by the block
    pub fees: Decimal,
    /// Fixed block subsidy
    pub reward: Decimal,
}

impl ForgedBlock {
    pub fn new(height: Height, timestamp: ChainTimestamp, reward: Decimal, fees: Decimal) -> Self {
        Self {
            height,
            timestamp,
            fees,
            reward,
        }
    }
}

/// A block forged by a voter that is itself a delegate.
///
/// The forging income is removed from the voter's reconstructed balance so a
/// voter cannot inflate its own voting weight with forging proceeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterBlock {
    pub address: Address,
    pub height: Height,
    pub fees: Decimal,
    pub reward: Decimal,
}

impl VoterBlock {
    /// Total gain credited to the forger
    pub fn gains(&self) -> Decimal {
        self.fees + self.reward
    }
}
