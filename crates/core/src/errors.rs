use tbw_replay::ReplayError;
use tbw_storage::StorageError;
use tbw_treasury::TreasuryError;
use thiserror::Error;

/// Fatal errors of a payout run; no partial payout is ever produced
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),
    #[error("Treasury error: {0}")]
    Treasury(#[from] TreasuryError),
    #[error("Delegate public key must not be empty")]
    MissingDelegate,
    #[error("Invalid height range: start {start} is above end {end}")]
    InvalidRange { start: u64, end: u64 },
}
