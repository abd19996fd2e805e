use tbw_types::{Address, Height};
use thiserror::Error;

/// Data-integrity failures that abort a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("forged blocks must be strictly descending by height: {previous} is followed by {height}")]
    UnorderedBlocks { previous: Height, height: Height },

    #[error("block {newer} is newer than block {older} but carries an older timestamp")]
    TimestampRegression { newer: Height, older: Height },

    #[error("no timestamp recorded for forged block {height}")]
    MissingTimestamp { height: Height },

    #[error("stake {stake_id} redeemed by {address} is not in its stake list")]
    UnknownStake { address: Address, stake_id: String },
}
