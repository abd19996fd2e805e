//! Base58check wallet addresses.
//!
//! An address encodes `version || ripemd160(public key)` followed by a four
//! byte double-SHA256 checksum. The version byte is network specific and is
//! fetched from the node's network configuration at run time.

/// Wallet address as it appears in ledger rows.
pub type Address = String;

/// Number of raw bytes behind an address (version byte + 20 byte hash).
pub const ADDRESS_PAYLOAD_BYTES: usize = 21;

/// Errors that can occur when validating an address string.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address is not valid base58check: {0}")]
    Decode(#[from] bs58::decode::Error),
    #[error("address payload must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Decode an address and check it against the network version byte.
pub fn decode_address(address: &str, version: u8) -> Result<[u8; ADDRESS_PAYLOAD_BYTES], AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }

    let decoded = bs58::decode(address).with_check(Some(version)).into_vec()?;
    let actual = decoded.len();

    decoded.try_into().map_err(|_| AddressError::InvalidLength {
        expected: ADDRESS_PAYLOAD_BYTES,
        actual,
    })
}

/// Encode a 20 byte public-key hash for the given network version.
pub fn encode_address(version: u8, hash: &[u8; 20]) -> Address {
    bs58::encode(hash).with_check_version(version).into_string()
}

/// Check whether the provided string is a valid address on this network.
pub fn is_valid_address(address: &str, version: u8) -> bool {
    decode_address(address, version).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAINNET: u8 = 0x17;
    const DEVNET: u8 = 0x1e;

    #[test]
    fn encoded_address_validates_on_its_network() {
        let address = encode_address(MAINNET, &[7u8; 20]);
        assert!(address.starts_with('A'));
        assert!(is_valid_address(&address, MAINNET));

        let decoded = decode_address(&address, MAINNET).unwrap();
        assert_eq!(decoded[0], MAINNET);
        assert_eq!(&decoded[1..], &[7u8; 20]);
    }

    #[test]
    fn wrong_network_rejected() {
        let address = encode_address(MAINNET, &[7u8; 20]);
        assert!(!is_valid_address(&address, DEVNET));
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let mut address = encode_address(MAINNET, &[9u8; 20]);
        let last = address.pop().unwrap();
        address.push(if last == '1' { '2' } else { '1' });
        assert!(matches!(
            decode_address(&address, MAINNET),
            Err(AddressError::Decode(_))
        ));
    }

    #[test]
    fn empty_and_garbage_rejected() {
        assert!(matches!(decode_address("", MAINNET), Err(AddressError::Empty)));
        assert!(!is_valid_address("not-an-address-0OIl", MAINNET));
    }
}
