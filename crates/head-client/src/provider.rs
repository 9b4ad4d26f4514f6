//! The head's off-chain ledger, exposed through the ordinary
//! [`LedgerProvider`] seam.
//!
//! Every query resolves against the node's latest confirmed snapshot, so
//! transaction-building code written for L1 runs inside the head unchanged.

use crate::node::NodeClient;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chain_core::provider::LedgerProvider;
use chain_core::types::EvalRedeemer;
use chain_core::{OutRef, ProtocolParameters, TxEnvelope, Utxo};
use std::collections::HashSet;
use std::time::Duration;

/// Ledger provider backed by one participant's Hydra node
pub struct HydraProvider {
    node: NodeClient,
}

impl HydraProvider {
    pub fn new(node: NodeClient) -> Self {
        Self { node }
    }

    async fn snapshot(&self) -> Result<Vec<Utxo>> {
        Ok(self.node.snapshot_utxo().await?)
    }
}

#[async_trait]
impl LedgerProvider for HydraProvider {
    async fn get_protocol_parameters(&self) -> Result<ProtocolParameters> {
        Ok(self.node.protocol_parameters().await?)
    }

    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let mut utxos = self.snapshot().await?;
        utxos.retain(|u| u.address == address);
        Ok(utxos)
    }

    async fn get_utxos_with_unit(&self, address: &str, unit: &str) -> Result<Vec<Utxo>> {
        let mut utxos = self.snapshot().await?;
        utxos.retain(|u| u.address == address && u.assets.contains_key(unit));
        Ok(utxos)
    }

    async fn get_utxo_by_unit(&self, unit: &str) -> Result<Utxo> {
        let mut utxos = self.snapshot().await?;
        utxos.retain(|u| u.assets.contains_key(unit));
        match utxos.len() {
            1 => Ok(utxos.remove(0)),
            0 => bail!("no utxo in the head holds unit {unit}"),
            n => bail!("unit {unit} is not unique in the head ({n} utxos hold it)"),
        }
    }

    async fn get_utxos_by_out_ref(&self, out_refs: &[OutRef]) -> Result<Vec<Utxo>> {
        let wanted: HashSet<&OutRef> = out_refs.iter().collect();
        let mut utxos = self.snapshot().await?;
        utxos.retain(|u| wanted.contains(&u.out_ref()));
        Ok(utxos)
    }

    async fn submit_tx(&self, tx_cbor: &str) -> Result<String> {
        let envelope = TxEnvelope::conway(tx_cbor);
        Ok(self.node.new_tx(&envelope).await?)
    }

    async fn await_tx(&self, tx_hash: &str, poll_interval: Duration) -> Result<bool> {
        Ok(self.node.await_tx(tx_hash, poll_interval).await)
    }

    async fn evaluate_tx(&self, _tx_cbor: &str) -> Result<Vec<EvalRedeemer>> {
        Err(anyhow!("script evaluation is not available inside a head"))
    }
}
