//! Hashing helpers: transaction ids and UTxO-set hashes

use crate::plutus::{cbor_item_end, CborError};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use sha2::Sha256;

type Blake2b256 = Blake2b<U32>;

/// Compute a transaction id from the full transaction CBOR.
///
/// A transaction is the CBOR array `[body, witness_set, is_valid, auxiliary]`;
/// the id is Blake2b-256 over the body's raw bytes, so the body item is
/// sliced out of the original encoding rather than re-serialized.
pub fn tx_id(tx_cbor_hex: &str) -> Result<String, CborError> {
    let bytes = hex::decode(tx_cbor_hex)?;
    let first = *bytes.first().ok_or(CborError::UnexpectedEof)?;
    let header_len = match first {
        0x80..=0x97 | 0x9f => 1,
        0x98 => 2,
        0x99 => 3,
        _ => return Err(CborError::Unsupported("transaction must be an array")),
    };
    let body_end = cbor_item_end(&bytes, header_len)?;
    let mut hasher = Blake2b256::new();
    hasher.update(&bytes[header_len..body_end]);
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// SHA-256 of the empty input, the on-chain hash of an empty UTxO set
pub fn empty_set_hash() -> String {
    sha256_hex(&[])
}

/// Raw form of [`empty_set_hash`], as stored inside datums
pub fn empty_set_hash_bytes() -> [u8; 32] {
    Sha256::digest(&[] as &[u8]).into()
}
