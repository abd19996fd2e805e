//! Network configuration reported by the node API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tbw_types::{ChainTimestamp, Height};

/// Block reward in force from `height` onwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardStage {
    pub height: Height,
    pub reward: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Unix time (seconds) of the chain epoch
    pub epoch: i64,
    /// Base58check version byte of wallet addresses
    pub address_version: u8,
    #[serde(default)]
    pub rewards: Vec<RewardStage>,
}

impl NetworkConfig {
    /// Scheduled block reward at `height`, if the schedule covers it.
    pub fn reward_at(&self, height: Height) -> Option<Decimal> {
        self.rewards
            .iter()
            .filter(|stage| stage.height <= height)
            .max_by_key(|stage| stage.height)
            .map(|stage| stage.reward)
    }

    /// Convert a Unix timestamp into chain time.
    pub fn chain_time(&self, unix_seconds: i64) -> ChainTimestamp {
        unix_seconds - self.epoch
    }

    /// Wall-clock time as chain time.
    pub fn current_chain_time(&self) -> ChainTimestamp {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.chain_time(i64::try_from(unix).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> NetworkConfig {
        NetworkConfig {
            epoch: 1_490_101_200,
            address_version: 0x1e,
            rewards: vec![
                RewardStage {
                    height: 1,
                    reward: Decimal::ZERO,
                },
                RewardStage {
                    height: 75_600,
                    reward: Decimal::from(200_000_000u64),
                },
            ],
        }
    }

    #[test]
    fn reward_schedule_picks_latest_stage() {
        let network = network();
        assert_eq!(network.reward_at(0), None);
        assert_eq!(network.reward_at(10), Some(Decimal::ZERO));
        assert_eq!(network.reward_at(75_600), Some(Decimal::from(200_000_000u64)));
        assert_eq!(network.reward_at(9_000_000), Some(Decimal::from(200_000_000u64)));
    }

    #[test]
    fn chain_time_is_relative_to_epoch() {
        assert_eq!(network().chain_time(1_490_101_300), 100);
    }

    #[test]
    fn current_chain_time_is_past_the_epoch() {
        assert!(network().current_chain_time() > 0);
    }
}
