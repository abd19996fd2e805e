use rust_decimal::Decimal;
use tbw_types::{Address, AddressError, Height};
use thiserror::Error;

/// Errors raised while validating payout policy or distributing revenue.
#[derive(Debug, Error)]
pub enum TreasuryError {
    #[error("invalid percentage for {name}: {value} is outside [0, 1]")]
    InvalidPercentage { name: String, value: Decimal },

    #[error("voter share {share} plus donation share {donation} exceeds 100%")]
    ShareExceedsWhole { share: Decimal, donation: Decimal },

    #[error("admin allocation totals {total}, more than 100%")]
    AdminAllocationExceeded { total: Decimal },

    #[error("transfers per multi-payment must be greater than zero")]
    ZeroTransfersPerPayment,

    #[error("invalid redirect {from} -> {to}: {source}")]
    InvalidRedirect {
        from: Address,
        to: Address,
        source: AddressError,
    },

    #[error("invalid address {address}: {source}")]
    InvalidAddress { address: Address, source: AddressError },

    #[error("no voter set reconstructed for forged block {height}")]
    MissingVoterSet { height: Height },

    #[error("no balance snapshot reconstructed for forged block {height}")]
    MissingBalances { height: Height },
}
