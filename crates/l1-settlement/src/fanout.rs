//! Fanout transaction: pay the head's committed outputs back out on L1 and
//! burn the head's tokens.
//!
//! Only heads closed at snapshot 0 with no pending increments or decrements
//! can be fanned out here; the committed output set is reconstructed by
//! walking the head's on-chain history backward to the collect-commitment
//! transaction.

use crate::contracts::HydraContracts;
use crate::error::SettlementError;
use crate::party::local_party_wallet;
use chain_core::datum::{
    burn_redeemer, CollectCommitDatum, Commit, DatumError, HeadStateDatum, InputRedeemer,
    PlutusOutputDatum, PlutusTxOut,
};
use chain_core::provider::{ChainIndexer, KeyStore, OutputDatumKind, TxBuilderFactory};
use chain_core::types::{Network, ScriptType, LOVELACE};
use chain_core::{address, hash, Assets, PlutusScript, TxEnvelope, Utxo};

/// Build and sign a Fanout for a head currently in the Closed state
pub async fn build_fanout(
    head_utxo: &Utxo,
    contracts: &HydraContracts,
    keys: &dyn KeyStore,
    factory: &dyn TxBuilderFactory,
    indexer: &dyn ChainIndexer,
    network: Network,
    anchor_ms: u64,
) -> Result<TxEnvelope, SettlementError> {
    let datum = head_utxo.datum.as_deref().ok_or(SettlementError::MissingDatum)?;
    let closed = match HeadStateDatum::from_hex(datum)? {
        HeadStateDatum::Closed(closed) => closed,
        other => {
            return Err(SettlementError::WrongState {
                expected: "Closed",
                found: other.state_name(),
            })
        }
    };

    let wallet = local_party_wallet(head_utxo, keys)?;

    if closed.snapshot_number != 0 {
        return Err(SettlementError::UnsupportedSnapshot(closed.snapshot_number));
    }
    let empty = hash::empty_set_hash_bytes();
    if closed.alpha_utxo_hash != empty || closed.omega_utxo_hash != empty {
        return Err(SettlementError::PendingSnapshotChanges);
    }

    let commits = collect_commit_datums(indexer, contracts, &head_utxo.tx_hash)
        .await?
        .ok_or(SettlementError::CommitHistoryNotFound)?;

    let mut entries: Vec<Commit> = commits.into_iter().flat_map(|d| d.commits).collect();
    // the validator checks outputs in canonical input order
    entries.sort_by(|a, b| {
        (&a.input.tx_out_ref_id, a.input.tx_out_ref_idx)
            .cmp(&(&b.input.tx_out_ref_id, b.input.tx_out_ref_idx))
    });
    let outputs = entries
        .iter()
        .map(|commit| PlutusTxOut::from_cbor(&commit.pre_serialized_output))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        head = %head_utxo.tx_hash,
        outputs = outputs.len(),
        "building fanout transaction"
    );

    let mut builder = factory.new_tx(wallet.clone());

    for output in &outputs {
        let bech32 = address::to_bech32(&output.address, network)?;
        let datum = match &output.datum {
            PlutusOutputDatum::None => None,
            PlutusOutputDatum::Hash(h) => Some(OutputDatumKind::Hash(hex::encode(h))),
            PlutusOutputDatum::Inline(d) => Some(OutputDatumKind::Inline(hex::encode(d))),
        };
        if output.reference_script.is_some() {
            return Err(SettlementError::Datum(DatumError::ReferenceScript));
        }
        builder.pay_to_address_with_data(&bech32, datum, &output.assets()?, None);
    }

    let burn: Assets = head_utxo
        .assets
        .iter()
        .filter(|(unit, _)| unit.as_str() != LOVELACE)
        .map(|(unit, quantity)| (unit.clone(), -*quantity))
        .collect();
    let burn_hex = burn_redeemer().to_hex().map_err(DatumError::Cbor)?;
    builder.mint_assets(&burn, &burn_hex);

    let policy = find_minting_policy(indexer, contracts, &head_utxo.tx_hash).await?;
    builder.attach_minting_policy(&policy);

    builder.read_from(&contracts.head.reference_utxo);
    let redeemer = InputRedeemer::Fanout {
        fanout_outputs: outputs.len() as u64,
        commit_outputs: 0,
        decommit_outputs: 0,
    };
    builder.collect_from(head_utxo, &redeemer.to_hex()?);
    builder.valid_from(anchor_ms);
    builder.add_signer(&wallet.address());

    let unsigned = builder.complete().await?;
    Ok(wallet.sign(&unsigned)?)
}

/// Walk backward from `tx_hash` through prior head states to the
/// collect-commitment transaction, returning each participant's commit datum.
async fn collect_commit_datums(
    indexer: &dyn ChainIndexer,
    contracts: &HydraContracts,
    tx_hash: &str,
) -> Result<Option<Vec<CollectCommitDatum>>, SettlementError> {
    let mut tx_hash = tx_hash.to_string();
    loop {
        let inputs = indexer.tx_inputs(&tx_hash).await?;
        let mut parent = None;
        for input in &inputs {
            let Some(datum) = input.inline_datum.as_deref() else {
                continue;
            };
            if input.address == contracts.head.address {
                match HeadStateDatum::from_hex(datum) {
                    Ok(HeadStateDatum::Open(_)) | Ok(HeadStateDatum::Closed(_)) => {
                        parent = Some(input.tx_hash.clone());
                        break;
                    }
                    _ => continue,
                }
            } else if input.address == contracts.commit.address {
                return inputs
                    .iter()
                    .filter(|i| i.address == contracts.commit.address)
                    .map(|i| {
                        let datum = i.inline_datum.as_deref().ok_or_else(|| {
                            SettlementError::CommitDatumMissing(i.tx_hash.clone())
                        })?;
                        Ok(CollectCommitDatum::from_hex(datum)?)
                    })
                    .collect::<Result<Vec<_>, SettlementError>>()
                    .map(Some);
            }
        }
        match parent {
            Some(hash) => tx_hash = hash,
            None => return Ok(None),
        }
    }
}

/// Continue the backward walk to the transaction spending the Initial head
/// state and pull the head's minting policy from its witness set.
async fn find_minting_policy(
    indexer: &dyn ChainIndexer,
    contracts: &HydraContracts,
    tx_hash: &str,
) -> Result<PlutusScript, SettlementError> {
    let mut tx_hash = tx_hash.to_string();
    loop {
        let inputs = indexer.tx_inputs(&tx_hash).await?;
        let mut parent = None;
        for input in &inputs {
            let Some(datum) = input.inline_datum.as_deref() else {
                continue;
            };
            if input.address != contracts.head.address {
                continue;
            }
            match HeadStateDatum::from_hex(datum) {
                Ok(HeadStateDatum::Initial(_)) => {
                    let scripts = indexer.tx_plutus_scripts(&input.tx_hash).await?;
                    return scripts
                        .into_iter()
                        .find(|s| s.script_type == ScriptType::PlutusV3)
                        .ok_or(SettlementError::MintingPolicyNotFound);
                }
                Ok(_) => {
                    parent = Some(input.tx_hash.clone());
                    break;
                }
                Err(_) => continue,
            }
        }
        match parent {
            Some(hash) => tx_hash = hash,
            None => return Err(SettlementError::MintingPolicyNotFound),
        }
    }
}
