//! Delegate payout policy.
//!
//! Constructed once from configuration, validated, and passed by reference
//! into the distributor and allocator.

use crate::errors::TreasuryError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tbw_replay::VoterFilter;
use tbw_types::{decode_address, is_fraction, Address};

/// A delegate administrator receiving a fraction of the delegate profit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminShare {
    pub address: Address,
    pub share: Decimal,
}

/// Elevated share for wallets that never exceeded `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmallWalletBonus {
    pub threshold: Decimal,
    pub share: Decimal,
}

/// Network costs of executing the payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairFeeSchedule {
    pub enabled: bool,
    pub transfers_per_multipayment: u32,
    pub multipayment_fee: Decimal,
    pub transfer_fee: Decimal,
}

impl Default for FairFeeSchedule {
    fn default() -> Self {
        Self {
            enabled: true,
            transfers_per_multipayment: 64,
            multipayment_fee: Decimal::from(10_000_000u64),
            transfer_fee: Decimal::from(10_000_000u64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutPolicy {
    /// Default fraction of forging rewards passed to voters
    pub voter_share: Decimal,
    /// Fraction of collected fees passed to voters
    pub voter_fee_share: Decimal,
    /// License / foundation donation fraction
    pub donation_share: Decimal,
    pub donation_address: Option<Address>,
    /// Minimum payout, smallest units
    pub min_payout: Decimal,
    /// Minimum balance to be counted at a block, smallest units
    pub min_voter_balance: Decimal,
    pub small_wallet_bonus: Option<SmallWalletBonus>,
    pub blacklist: Vec<Address>,
    pub whitelist: Vec<Address>,
    pub custom_shares: BTreeMap<Address, Decimal>,
    /// Minimum blocks between two payouts to the same address
    pub custom_frequencies: BTreeMap<Address, u64>,
    pub redirects: BTreeMap<Address, Address>,
    pub admins: Vec<AdminShare>,
    pub fair_fees: FairFeeSchedule,
    /// Vendor-field prefix identifying the delegate's payout transactions
    pub vendor_field: String,
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self {
            voter_share: Decimal::new(9, 1),
            voter_fee_share: Decimal::ZERO,
            donation_share: Decimal::ZERO,
            donation_address: None,
            min_payout: Decimal::ZERO,
            min_voter_balance: Decimal::ZERO,
            small_wallet_bonus: None,
            blacklist: Vec::new(),
            whitelist: Vec::new(),
            custom_shares: BTreeMap::new(),
            custom_frequencies: BTreeMap::new(),
            redirects: BTreeMap::new(),
            admins: Vec::new(),
            fair_fees: FairFeeSchedule::default(),
            vendor_field: "tbw".to_string(),
        }
    }
}

fn check_fraction(name: &str, value: Decimal) -> Result<(), TreasuryError> {
    if is_fraction(value) {
        Ok(())
    } else {
        Err(TreasuryError::InvalidPercentage {
            name: name.to_string(),
            value,
        })
    }
}

impl PayoutPolicy {
    /// Validate every value that does not depend on the network.
    pub fn validate(&self) -> Result<(), TreasuryError> {
        check_fraction("voter_share", self.voter_share)?;
        check_fraction("voter_fee_share", self.voter_fee_share)?;
        check_fraction("donation_share", self.donation_share)?;

        if self.voter_share + self.donation_share > Decimal::ONE {
            return Err(TreasuryError::ShareExceedsWhole {
                share: self.voter_share,
                donation: self.donation_share,
            });
        }

        if let Some(bonus) = &self.small_wallet_bonus {
            check_fraction("small_wallet_share", bonus.share)?;
            if bonus.share + self.donation_share > Decimal::ONE {
                return Err(TreasuryError::ShareExceedsWhole {
                    share: bonus.share,
                    donation: self.donation_share,
                });
            }
        }

        for (address, share) in &self.custom_shares {
            check_fraction(&format!("custom_shares.{address}"), *share)?;
        }

        let mut admin_total = Decimal::ZERO;
        for admin in &self.admins {
            check_fraction(&format!("admins.{}", admin.address), admin.share)?;
            admin_total += admin.share;
        }
        if admin_total > Decimal::ONE {
            return Err(TreasuryError::AdminAllocationExceeded { total: admin_total });
        }

        if self.fair_fees.transfers_per_multipayment == 0 {
            return Err(TreasuryError::ZeroTransfersPerPayment);
        }

        Ok(())
    }

    /// Redirect targets must be valid addresses on this network.
    pub fn validate_redirects(&self, version: u8) -> Result<(), TreasuryError> {
        for (from, to) in &self.redirects {
            decode_address(to, version).map_err(|source| TreasuryError::InvalidRedirect {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Validate every configured address against the network version byte.
    pub fn validate_addresses(&self, version: u8) -> Result<(), TreasuryError> {
        self.validate_redirects(version)?;

        let configured = self
            .admins
            .iter()
            .map(|admin| &admin.address)
            .chain(self.donation_address.iter());

        for address in configured {
            decode_address(address, version).map_err(|source| TreasuryError::InvalidAddress {
                address: address.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Address a voter's accrual is booked under.
    pub fn payout_address<'a>(&'a self, voter: &'a str) -> &'a str {
        self.redirects.get(voter).map(String::as_str).unwrap_or(voter)
    }

    /// Voters whose accruals are booked under `address`: the redirect sources
    /// plus the address itself.
    pub fn booked_voters<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.redirects
            .iter()
            .filter(move |(_, to)| to.as_str() == address)
            .map(|(from, _)| from.as_str())
            .chain(std::iter::once(address))
    }

    /// Share percentage applied to an address's reward accrual.
    pub fn share_for(&self, address: &str, small_wallet: bool) -> Decimal {
        if let Some(custom) = self.custom_shares.get(address) {
            let mut share = *custom;
            if share + self.donation_share > Decimal::ONE {
                share -= self.donation_share;
            }
            return share.max(Decimal::ZERO);
        }

        match &self.small_wallet_bonus {
            Some(bonus) if small_wallet => bonus.share,
            _ => self.voter_share,
        }
    }

    pub fn voter_filter(&self) -> VoterFilter {
        VoterFilter::new(self.blacklist.iter().cloned(), self.whitelist.iter().cloned())
    }

    /// Admin and donation wallets paid alongside voters.
    pub fn extra_recipients(&self) -> usize {
        let donation = usize::from(
            self.donation_share > Decimal::ZERO && self.donation_address.is_some(),
        );
        self.admins.len() + donation
    }

    pub fn small_wallet_threshold(&self) -> Option<Decimal> {
        self.small_wallet_bonus.map(|bonus| bonus.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbw_types::encode_address;

    const VERSION: u8 = 0x1e;

    fn pct(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    #[test]
    fn default_policy_is_valid() {
        assert!(PayoutPolicy::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_percentages() {
        let policy = PayoutPolicy {
            voter_share: pct(11, 1),
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(TreasuryError::InvalidPercentage { .. })
        ));

        let policy = PayoutPolicy {
            voter_share: pct(95, 2),
            donation_share: pct(10, 2),
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(TreasuryError::ShareExceedsWhole { .. })
        ));
    }

    #[test]
    fn rejects_admin_overallocation() {
        let policy = PayoutPolicy {
            admins: vec![
                AdminShare {
                    address: "a".into(),
                    share: pct(6, 1),
                },
                AdminShare {
                    address: "b".into(),
                    share: pct(5, 1),
                },
            ],
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(TreasuryError::AdminAllocationExceeded { .. })
        ));
    }

    #[test]
    fn invalid_redirect_is_fatal() {
        let mut policy = PayoutPolicy::default();
        policy
            .redirects
            .insert("voter".into(), "not-an-address".into());
        assert!(matches!(
            policy.validate_redirects(VERSION),
            Err(TreasuryError::InvalidRedirect { .. })
        ));

        policy
            .redirects
            .insert("voter".into(), encode_address(VERSION, &[1u8; 20]));
        assert!(policy.validate_addresses(VERSION).is_ok());
    }

    #[test]
    fn custom_share_is_clamped_by_donation() {
        let mut policy = PayoutPolicy {
            donation_share: pct(1, 2),
            ..Default::default()
        };
        policy.custom_shares.insert("D".into(), pct(5, 1));
        policy.custom_shares.insert("F".into(), Decimal::ONE);

        assert_eq!(policy.share_for("D", false), pct(5, 1));
        assert_eq!(policy.share_for("F", false), pct(99, 2));
        assert_eq!(policy.share_for("X", false), pct(9, 1));
    }

    #[test]
    fn small_wallet_bonus_applies_without_override() {
        let mut policy = PayoutPolicy {
            small_wallet_bonus: Some(SmallWalletBonus {
                threshold: Decimal::from(1_000u64),
                share: pct(95, 2),
            }),
            ..Default::default()
        };
        policy.custom_shares.insert("D".into(), pct(5, 1));

        assert_eq!(policy.share_for("S", true), pct(95, 2));
        assert_eq!(policy.share_for("S", false), pct(9, 1));
        assert_eq!(policy.share_for("D", true), pct(5, 1));
    }

    #[test]
    fn redirects_resolve_payout_address() {
        let mut policy = PayoutPolicy::default();
        policy.redirects.insert("A".into(), "B".into());
        assert_eq!(policy.payout_address("A"), "B");
        assert_eq!(policy.payout_address("C"), "C");
    }
}
