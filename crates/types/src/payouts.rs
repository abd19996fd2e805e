//! Accrual maps and the final payout artifact.
//!
//! Ordered maps keep serialisation byte-identical across runs on the same
//! input.

use crate::address::Address;
use crate::block::ChainTimestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Address → amount
pub type AmountMap = BTreeMap<Address, Decimal>;

/// Shares accrued over the whole block range, one map per revenue stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutBalances {
    pub rewards: AmountMap,
    pub fees: AmountMap,
    pub business: AmountMap,
}

impl PayoutBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one block's share for `address` to all three streams.
    pub fn accrue(&mut self, address: &str, reward: Decimal, fees: Decimal, business: Decimal) {
        *self.rewards.entry(address.to_string()).or_default() += reward;
        *self.fees.entry(address.to_string()).or_default() += fees;
        *self.business.entry(address.to_string()).or_default() += business;
    }

    pub fn reward_of(&self, address: &str) -> Decimal {
        self.rewards.get(address).copied().unwrap_or_default()
    }

    pub fn fees_of(&self, address: &str) -> Decimal {
        self.fees.get(address).copied().unwrap_or_default()
    }

    pub fn business_of(&self, address: &str) -> Decimal {
        self.business.get(address).copied().unwrap_or_default()
    }

    pub fn total_rewards(&self) -> Decimal {
        self.rewards.values().copied().sum()
    }
}

/// Final payout instruction set handed to the payment executor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payouts {
    pub payouts: AmountMap,
    pub delegate_profit: Decimal,
    pub acf_donation: Decimal,
    pub timestamp: ChainTimestamp,
}

impl Payouts {
    /// Sum of every voter payout
    pub fn total_payout(&self) -> Decimal {
        self.payouts.values().copied().sum()
    }
}
