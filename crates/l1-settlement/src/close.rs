//! Close transaction: move the head from Open to Closed on L1.

use crate::contracts::HydraContracts;
use crate::error::SettlementError;
use crate::party::local_party_wallet;
use chain_core::datum::{CloseRedeemer, ClosedDatum, HeadStateDatum, InputRedeemer};
use chain_core::hash;
use chain_core::provider::{KeyStore, TxBuilderFactory};
use chain_core::{TxEnvelope, Utxo};

/// Build and sign a Close for a head currently in the Open state.
///
/// `anchor_ms` is the validity anchor (see [`crate::validity_anchor_ms`]);
/// the contestation deadline is `anchor + 2 * contestationPeriod`, matching
/// the initial-close redeemer semantics, and the transaction is valid over
/// `[anchor, anchor + contestationPeriod]`.
pub async fn build_close(
    head_utxo: &Utxo,
    contracts: &HydraContracts,
    keys: &dyn KeyStore,
    factory: &dyn TxBuilderFactory,
    anchor_ms: u64,
) -> Result<TxEnvelope, SettlementError> {
    let datum = head_utxo.datum.as_deref().ok_or(SettlementError::MissingDatum)?;
    let open = match HeadStateDatum::from_hex(datum)? {
        HeadStateDatum::Open(open) => open,
        other => {
            return Err(SettlementError::WrongState {
                expected: "Open",
                found: other.state_name(),
            })
        }
    };

    let wallet = local_party_wallet(head_utxo, keys)?;

    let empty = hash::empty_set_hash_bytes().to_vec();
    let period_ms = open.contestation_period.milliseconds;
    let closed = HeadStateDatum::Closed(ClosedDatum {
        head_id: open.head_id,
        parties: open.parties,
        contestation_period: open.contestation_period,
        version: open.version,
        snapshot_number: 0,
        utxo_hash: open.utxo_hash,
        alpha_utxo_hash: empty.clone(),
        omega_utxo_hash: empty,
        contesters: Vec::new(),
        contestation_deadline: anchor_ms + 2 * period_ms,
    });

    tracing::info!(
        head = %head_utxo.tx_hash,
        deadline = anchor_ms + 2 * period_ms,
        "building close transaction"
    );

    let mut builder = factory.new_tx(wallet.clone());
    let redeemer = InputRedeemer::Close(CloseRedeemer::CloseInitial).to_hex()?;
    let closed_hex = closed.to_hex()?;
    builder.collect_from(head_utxo, &redeemer);
    builder.read_from(&contracts.head.reference_utxo);
    builder.pay_to_contract(&contracts.head.address, &closed_hex, &head_utxo.assets);
    builder.valid_from(anchor_ms);
    builder.valid_to(anchor_ms + period_ms);
    builder.add_signer(&wallet.address());

    let unsigned = builder.complete().await?;
    Ok(wallet.sign(&unsigned)?)
}
