use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use tbw_types::{Address, ChainTimestamp, Height};

/// Delegate and block range covered by one payout run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWindow {
    pub delegate_public_key: String,
    pub delegate_address: Address,
    pub start_height: Height,
    /// Latest forged block when absent
    pub end_height: Option<Height>,
    /// Chain time of the run; the wall clock when absent
    pub now: Option<ChainTimestamp>,
}

impl RunWindow {
    pub fn new(delegate_public_key: &str, delegate_address: &str) -> Self {
        Self {
            delegate_public_key: delegate_public_key.to_string(),
            delegate_address: delegate_address.to_string(),
            start_height: 0,
            end_height: None,
            now: None,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.delegate_public_key.is_empty() {
            return Err(PipelineError::MissingDelegate);
        }
        if let Some(end) = self.end_height {
            if end < self.start_height {
                return Err(PipelineError::InvalidRange {
                    start: self.start_height,
                    end,
                });
            }
        }
        Ok(())
    }
}
