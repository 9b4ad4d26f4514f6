//! Shelley address construction from decoded Plutus credentials.
//!
//! Only enterprise and base addresses can appear in reconstructed fanout
//! outputs; staking pointers are rejected.

use crate::datum::{Credential, PlutusAddress, StakingCredential};
use crate::types::Network;
use bech32::{Bech32, Hrp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("staking pointer addresses are not supported")]
    StakingPointer,
    #[error("credential hash must be 28 bytes, got {0}")]
    BadHashLength(usize),
    #[error("bech32 encoding failed: {0}")]
    Bech32(String),
}

fn credential_bits(credential: &Credential) -> (u8, &[u8]) {
    match credential {
        Credential::PubKey(hash) => (0, hash),
        Credential::Script(hash) => (1, hash),
    }
}

/// Encode a decoded Plutus address as bech32
pub fn to_bech32(address: &PlutusAddress, network: Network) -> Result<String, AddressError> {
    let network_bits = if network.is_mainnet() { 1 } else { 0 };
    let (payment_bit, payment_hash) = credential_bits(&address.payment);
    if payment_hash.len() != 28 {
        return Err(AddressError::BadHashLength(payment_hash.len()));
    }

    let mut bytes = Vec::with_capacity(57);
    match &address.staking {
        None => {
            bytes.push((0b0110 | payment_bit) << 4 | network_bits);
            bytes.extend_from_slice(payment_hash);
        }
        Some(StakingCredential::Pointer(..)) => return Err(AddressError::StakingPointer),
        Some(StakingCredential::Credential(staking)) => {
            let (staking_bit, staking_hash) = credential_bits(staking);
            if staking_hash.len() != 28 {
                return Err(AddressError::BadHashLength(staking_hash.len()));
            }
            bytes.push((staking_bit << 1 | payment_bit) << 4 | network_bits);
            bytes.extend_from_slice(payment_hash);
            bytes.extend_from_slice(staking_hash);
        }
    }

    let hrp = Hrp::parse(if network.is_mainnet() {
        "addr"
    } else {
        "addr_test"
    })
    .expect("static hrp");
    bech32::encode::<Bech32>(hrp, &bytes).map_err(|e| AddressError::Bech32(e.to_string()))
}
