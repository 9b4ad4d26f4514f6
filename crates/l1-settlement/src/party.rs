//! Locating the local signing wallet among a head's participant tokens.
//!
//! Each participant token's unit is the 56-hex-char minting policy id
//! followed by the participant's payment verification key hash.

use crate::error::SettlementError;
use chain_core::provider::{KeyStore, Wallet};
use chain_core::types::LOVELACE;
use chain_core::Utxo;
use std::sync::Arc;

const POLICY_ID_HEX_LEN: usize = 56;

/// Participant key hashes embedded in the head utxo's token units
pub(crate) fn participant_hashes(head_utxo: &Utxo) -> Vec<&str> {
    head_utxo
        .assets
        .keys()
        .filter(|unit| unit.as_str() != LOVELACE && unit.len() > POLICY_ID_HEX_LEN)
        .map(|unit| &unit[POLICY_ID_HEX_LEN..])
        .collect()
}

/// The first locally held wallet that is a party of this head
pub(crate) fn local_party_wallet(
    head_utxo: &Utxo,
    keys: &dyn KeyStore,
) -> Result<Arc<dyn Wallet>, SettlementError> {
    let held = keys.pubkey_hashes();
    let hash = participant_hashes(head_utxo)
        .into_iter()
        .find(|hash| held.iter().any(|h| h == hash))
        .ok_or(SettlementError::NotAParty)?;
    keys.by_pubkey_hash(hash)
        .ok_or_else(|| SettlementError::SigningKeyNotFound(hash.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::Assets;

    fn head_utxo(units: &[&str]) -> Utxo {
        let mut assets = Assets::new();
        assets.insert(LOVELACE.to_string(), 10_000_000);
        for unit in units {
            assets.insert(unit.to_string(), 1);
        }
        Utxo {
            tx_hash: "00".repeat(32),
            output_index: 0,
            address: "addr_test1head".to_string(),
            assets,
            datum: None,
            datum_hash: None,
            script_ref: None,
        }
    }

    #[test]
    fn token_suffixes_become_participant_hashes() {
        let policy = "ab".repeat(28);
        let utxo = head_utxo(&[
            &format!("{policy}{}", "11".repeat(28)),
            &format!("{policy}{}", "22".repeat(28)),
        ]);
        let hashes = participant_hashes(&utxo);
        assert_eq!(hashes, vec!["11".repeat(28), "22".repeat(28)]);
    }

    #[test]
    fn lovelace_and_short_units_are_ignored() {
        let utxo = head_utxo(&["deadbeef"]);
        assert!(participant_hashes(&utxo).is_empty());
    }
}
