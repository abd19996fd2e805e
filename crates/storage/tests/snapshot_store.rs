use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tbw_storage::{
    BusinessIncomeSource, LedgerSnapshot, LedgerStore, NetworkConfig, NodeApi, SnapshotStore,
    StorageError,
};
use tbw_types::{
    DelegateTransaction, ForgedBlock, MultiPaymentLeg, Transaction, VoteDirection, Voter,
    VoterBlock, VoterMutation,
};
use tempfile::tempdir;

const DELEGATE_KEY: &str = "02delegate";
const DELEGATE_ADDRESS: &str = "Ddelegate";

fn wallet(address: &str, public_key: &str, balance: u64) -> Voter {
    Voter {
        address: address.to_string(),
        public_key: public_key.to_string(),
        balance: Decimal::from(balance),
        power: Decimal::ZERO,
        processed_stakes: Vec::new(),
    }
}

fn transfer(height: u64, from: &str, to: &str, amount: u64) -> Transaction {
    Transaction {
        height,
        amount: Decimal::from(amount),
        recipient_id: Some(to.to_string()),
        sender_id: from.to_string(),
        sender_public_key: String::new(),
        fee: Decimal::from(10u64),
        multi_payment: None,
        stake_redeem: None,
    }
}

fn fixture() -> LedgerSnapshot {
    let network = NetworkConfig {
        epoch: 0,
        address_version: 0x1e,
        rewards: Vec::new(),
    };
    let mut snapshot = LedgerSnapshot::new(network, DELEGATE_KEY, DELEGATE_ADDRESS);

    snapshot.voters = (0..5)
        .map(|i| wallet(&format!("V{i}"), &format!("02v{i}"), 1_000 * (i + 1)))
        .collect();
    snapshot.wallets = vec![wallet("Gone", "02gone", 50)];
    snapshot.forged_blocks = vec![
        ForgedBlock::new(100, 800, Decimal::from(200u64), Decimal::ZERO),
        ForgedBlock::new(300, 2_400, Decimal::from(200u64), Decimal::ZERO),
        ForgedBlock::new(200, 1_600, Decimal::from(200u64), Decimal::ZERO),
    ];
    snapshot.vote_mutations = vec![
        VoterMutation::new(50, 0, "V1", VoteDirection::Vote),
        VoterMutation::new(150, 0, "Gone", VoteDirection::Unvote),
    ];
    snapshot.transactions = vec![
        transfer(120, "V0", "outsider", 5),
        transfer(130, "outsider", "Gone", 7),
        transfer(140, "outsider", "stranger", 9),
        Transaction {
            multi_payment: Some(vec![MultiPaymentLeg {
                recipient_id: "V4".into(),
                amount: Decimal::ONE,
            }]),
            recipient_id: None,
            ..transfer(160, "outsider", "", 1)
        },
    ];
    snapshot.voter_blocks = vec![
        VoterBlock {
            address: "V2".into(),
            height: 210,
            fees: Decimal::ONE,
            reward: Decimal::from(2u64),
        },
        VoterBlock {
            address: "V3".into(),
            height: 220,
            fees: Decimal::ONE,
            reward: Decimal::from(2u64),
        },
    ];
    snapshot.delegate_transactions = vec![DelegateTransaction {
        height: 180,
        timestamp: 1_440,
        recipient_id: Some("V0".into()),
        multi_payment: None,
        vendor_field: Some("tbw payout".into()),
    }];
    snapshot.nonces.insert(DELEGATE_ADDRESS.into(), 42);
    snapshot
}

#[tokio::test]
async fn forged_blocks_are_newest_first_within_range() {
    let store = SnapshotStore::new(fixture());

    let blocks = store.forged_blocks(DELEGATE_KEY, 150, None).await.unwrap();
    let heights: Vec<u64> = blocks.iter().map(|b| b.height).collect();
    assert_eq!(heights, vec![300, 200]);

    let bounded = store.forged_blocks(DELEGATE_KEY, 0, Some(200)).await.unwrap();
    assert_eq!(bounded.len(), 2);

    let other = store.forged_blocks("02other", 0, None).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn voters_follow_pagination() {
    let store = SnapshotStore::new(fixture()).with_page_size(2);

    let first = store.voters_page(DELEGATE_KEY, 1).await.unwrap();
    assert_eq!(first.voters.len(), 2);
    assert!(first.has_more);

    let last = store.voters_page(DELEGATE_KEY, 3).await.unwrap();
    assert_eq!(last.voters.len(), 1);
    assert!(!last.has_more);

    let all = store.voters(DELEGATE_KEY).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[4].address, "V4");
}

#[tokio::test]
async fn transactions_are_filtered_by_tracked_addresses() {
    let store = SnapshotStore::new(fixture());
    let tracked = vec!["V0".to_string(), "Gone".to_string(), "V4".to_string()];

    let txs = store.transactions(&tracked, 125).await.unwrap();
    let heights: Vec<u64> = txs.iter().map(|tx| tx.height).collect();
    assert_eq!(heights, vec![130, 160]);
}

#[tokio::test]
async fn voter_blocks_resolve_public_keys() {
    let store = SnapshotStore::new(fixture());

    let blocks = store.voter_blocks(&["02v2".to_string()], 0).await.unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].address, "V2");
}

#[tokio::test]
async fn mutations_and_delegate_transactions_respect_since() {
    let store = SnapshotStore::new(fixture());

    let mutations = store.vote_mutations(DELEGATE_KEY, 100).await.unwrap();
    assert_eq!(mutations.len(), 1);
    assert_eq!(mutations[0].address, "Gone");

    let sent = store.delegate_transactions(DELEGATE_ADDRESS, 0).await.unwrap();
    assert_eq!(sent.len(), 1);
    assert!(store
        .delegate_transactions(DELEGATE_ADDRESS, 200)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unknown_wallet_is_an_error() {
    let store = SnapshotStore::new(fixture());

    assert_eq!(store.wallet("Gone").await.unwrap().balance, Decimal::from(50u64));
    assert!(matches!(
        store.wallet("nobody").await,
        Err(StorageError::UnknownWallet(_))
    ));
    assert_eq!(store.nonce(DELEGATE_ADDRESS).await.unwrap(), 42);
}

#[tokio::test]
async fn business_income_is_unavailable_until_recorded() {
    let store = SnapshotStore::new(fixture());
    assert!(matches!(
        store.income_per_block(&[100]).await,
        Err(StorageError::Unavailable(_))
    ));

    store.update(|snapshot| {
        snapshot.business_income = Some(BTreeMap::from([
            (100, Decimal::from(1_000u64)),
            (400, Decimal::from(9u64)),
        ]));
    });
    let income = store.income_per_block(&[100, 200]).await.unwrap();
    assert_eq!(income, BTreeMap::from([(100, Decimal::from(1_000u64))]));
}

#[tokio::test]
async fn snapshot_survives_disk_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let store = SnapshotStore::new(fixture());
    store.save(&path).await.unwrap();

    let reopened = SnapshotStore::open(&path).await.unwrap();
    let original = store.snapshot();
    let restored = reopened.snapshot();
    assert_eq!(restored.forged_blocks, original.forged_blocks);
    assert_eq!(restored.voters, original.voters);
    assert_eq!(restored.nonces, original.nonces);
}
