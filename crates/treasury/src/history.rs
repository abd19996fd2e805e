//! Index of the delegate's previous payouts.

use crate::policy::AdminShare;
use std::collections::BTreeMap;
use tbw_types::{Address, ChainTimestamp, DelegateTransaction, Height};
use tracing::debug;

/// Most recent payout received by an address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PayoutRecord {
    height: Height,
    timestamp: ChainTimestamp,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayoutHistory {
    latest: BTreeMap<Address, PayoutRecord>,
}

impl PayoutHistory {
    /// Index the delegate's transactions whose vendor field starts with `signature`.
    pub fn from_transactions(transactions: &[DelegateTransaction], signature: &str) -> Self {
        let mut latest: BTreeMap<Address, PayoutRecord> = BTreeMap::new();
        let mut payouts = 0usize;

        for tx in transactions.iter().filter(|tx| tx.is_payout(signature)) {
            payouts += 1;
            let record = PayoutRecord {
                height: tx.height,
                timestamp: tx.timestamp,
            };
            for recipient in tx.recipients() {
                latest
                    .entry(recipient.to_string())
                    .and_modify(|existing| {
                        if record.height > existing.height {
                            *existing = record;
                        }
                    })
                    .or_insert(record);
            }
        }

        debug!(
            target: "treasury",
            payouts,
            recipients = latest.len(),
            "Indexed previous payouts"
        );

        Self { latest }
    }

    pub fn last_height(&self, address: &str) -> Option<Height> {
        self.latest.get(address).map(|r| r.height)
    }

    pub fn last_timestamp(&self, address: &str) -> Option<ChainTimestamp> {
        self.latest.get(address).map(|r| r.timestamp)
    }

    /// Latest payout timestamp among the delegate's admins.
    pub fn latest_admin_timestamp(&self, admins: &[AdminShare]) -> Option<ChainTimestamp> {
        admins
            .iter()
            .filter_map(|admin| self.last_timestamp(&admin.address))
            .max()
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tbw_types::MultiPaymentLeg;

    fn payout(height: Height, recipients: &[&str], vendor: &str) -> DelegateTransaction {
        DelegateTransaction {
            height,
            timestamp: height as i64 * 8,
            recipient_id: None,
            multi_payment: Some(
                recipients
                    .iter()
                    .map(|r| MultiPaymentLeg {
                        recipient_id: r.to_string(),
                        amount: Decimal::ONE,
                    })
                    .collect(),
            ),
            vendor_field: Some(vendor.to_string()),
        }
    }

    #[test]
    fn keeps_latest_payout_per_recipient() {
        let history = PayoutHistory::from_transactions(
            &[
                payout(200, &["A", "B"], "tbw payout"),
                payout(100, &["A", "C"], "tbw payout"),
                payout(300, &["B"], "unrelated transfer"),
            ],
            "tbw",
        );

        assert_eq!(history.last_height("A"), Some(200));
        assert_eq!(history.last_height("B"), Some(200));
        assert_eq!(history.last_height("C"), Some(100));
        assert_eq!(history.last_timestamp("C"), Some(800));
        assert_eq!(history.last_height("D"), None);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn admin_timestamp_is_the_latest_admin_payout() {
        let history = PayoutHistory::from_transactions(
            &[
                payout(200, &["admin1"], "tbw"),
                payout(300, &["admin2"], "tbw"),
            ],
            "tbw",
        );
        let admins = vec![
            AdminShare {
                address: "admin1".into(),
                share: Decimal::new(5, 1),
            },
            AdminShare {
                address: "admin2".into(),
                share: Decimal::new(5, 1),
            },
        ];

        assert_eq!(history.latest_admin_timestamp(&admins), Some(2400));
        assert_eq!(history.latest_admin_timestamp(&[]), None);
    }
}
