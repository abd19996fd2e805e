use crate::address::Address;
use crate::block::{ChainTimestamp, Height};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One output of a multi-payment transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiPaymentLeg {
    pub recipient_id: Address,
    pub amount: Decimal,
}

/// A value-moving transaction touching at least one tracked wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub height: Height,
    pub amount: Decimal,
    /// Single recipient; absent for multi-payments
    #[serde(default)]
    pub recipient_id: Option<Address>,
    pub sender_id: Address,
    #[serde(default)]
    pub sender_public_key: String,
    pub fee: Decimal,
    /// Outputs of a multi-payment; mutually exclusive with `recipient_id`
    #[serde(default)]
    pub multi_payment: Option<Vec<MultiPaymentLeg>>,
    /// Stake id redeemed by the sender, if any
    #[serde(default)]
    pub stake_redeem: Option<String>,
}

impl Transaction {
    /// Every (recipient, amount) credited by this transaction.
    pub fn credits(&self) -> Vec<(&str, Decimal)> {
        match &self.multi_payment {
            Some(legs) => legs
                .iter()
                .map(|leg| (leg.recipient_id.as_str(), leg.amount))
                .collect(),
            None => self
                .recipient_id
                .as_deref()
                .map(|recipient| vec![(recipient, self.amount)])
                .unwrap_or_default(),
        }
    }
}

/// Direction of a vote mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VoteDirection {
    /// `+`: the wallet granted its vote
    Vote,
    /// `-`: the wallet revoked its vote
    Unvote,
}

impl VoteDirection {
    /// Parse a ledger vote tag such as `+<delegate key>` or `-<delegate key>`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.chars().next()? {
            '+' => Some(VoteDirection::Vote),
            '-' => Some(VoteDirection::Unvote),
            _ => None,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteDirection::Vote => f.write_str("+"),
            VoteDirection::Unvote => f.write_str("-"),
        }
    }
}

impl TryFrom<String> for VoteDirection {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        VoteDirection::from_tag(&value).ok_or_else(|| format!("invalid vote tag: {value}"))
    }
}

impl From<VoteDirection> for String {
    fn from(value: VoteDirection) -> Self {
        value.to_string()
    }
}

/// A vote or unvote transaction targeting the delegate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterMutation {
    pub height: Height,
    /// Position of the transaction inside its block
    #[serde(default)]
    pub sequence: u32,
    pub address: Address,
    pub vote: VoteDirection,
}

impl VoterMutation {
    pub fn new(height: Height, sequence: u32, address: impl Into<Address>, vote: VoteDirection) -> Self {
        Self {
            height,
            sequence,
            address: address.into(),
            vote,
        }
    }
}

/// A transaction previously sent by the delegate wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateTransaction {
    pub height: Height,
    pub timestamp: ChainTimestamp,
    #[serde(default)]
    pub recipient_id: Option<Address>,
    #[serde(default)]
    pub multi_payment: Option<Vec<MultiPaymentLeg>>,
    #[serde(default)]
    pub vendor_field: Option<String>,
}

impl DelegateTransaction {
    /// `true` when the vendor field carries the delegate's payout signature.
    pub fn is_payout(&self, signature: &str) -> bool {
        self.vendor_field
            .as_deref()
            .map(|field| field.starts_with(signature))
            .unwrap_or(false)
    }

    /// Every address paid by this transaction.
    pub fn recipients(&self) -> Vec<&str> {
        match &self.multi_payment {
            Some(legs) => legs.iter().map(|leg| leg.recipient_id.as_str()).collect(),
            None => self.recipient_id.as_deref().into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_tags_parse() {
        assert_eq!(VoteDirection::from_tag("+02abc"), Some(VoteDirection::Vote));
        assert_eq!(VoteDirection::from_tag("-02abc"), Some(VoteDirection::Unvote));
        assert_eq!(VoteDirection::from_tag("02abc"), None);
        assert_eq!(VoteDirection::from_tag(""), None);
    }

    #[test]
    fn mutation_deserializes_from_ledger_tag() {
        let json = r#"{"height":150,"address":"C","vote":"+03deadbeef"}"#;
        let mutation: VoterMutation = serde_json::from_str(json).unwrap();
        assert_eq!(mutation.vote, VoteDirection::Vote);
        assert_eq!(mutation.sequence, 0);
    }

    #[test]
    fn multi_payment_credits_every_leg() {
        let tx = Transaction {
            height: 10,
            amount: Decimal::ZERO,
            recipient_id: None,
            sender_id: "S".into(),
            sender_public_key: String::new(),
            fee: Decimal::from(10),
            multi_payment: Some(vec![
                MultiPaymentLeg {
                    recipient_id: "A".into(),
                    amount: Decimal::from(5),
                },
                MultiPaymentLeg {
                    recipient_id: "B".into(),
                    amount: Decimal::from(7),
                },
            ]),
            stake_redeem: None,
        };

        assert_eq!(
            tx.credits(),
            vec![("A", Decimal::from(5)), ("B", Decimal::from(7))]
        );
    }

    #[test]
    fn payout_detection_uses_vendor_prefix() {
        let tx = DelegateTransaction {
            height: 1,
            timestamp: 1,
            recipient_id: Some("A".into()),
            multi_payment: None,
            vendor_field: Some("tbw payout - thanks".into()),
        };
        assert!(tx.is_payout("tbw"));
        assert!(!tx.is_payout("rewards"));
        assert_eq!(tx.recipients(), vec!["A"]);
    }
}
