//! Resolution and caching of the head protocol's reference scripts.
//!
//! The three validators (initial, commit, head) are published on chain as
//! reference scripts; each lives at output 0 of a configured transaction.
//! Resolution is expensive, so the cache holds the result until a caller
//! explicitly invalidates it, which it must do if any of the reference
//! outputs is ever spent.

use crate::error::SettlementError;
use chain_core::provider::{LedgerProvider, TxBuilderFactory};
use chain_core::{OutRef, PlutusScript, Utxo};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where the protocol's reference scripts live
#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    /// Transaction ids publishing the initial, commit and head validators,
    /// in that order; the script sits at output 0 of each
    pub reference_tx_ids: [String; 3],
}

/// One resolved validator
#[derive(Debug, Clone)]
pub struct Contract {
    pub script: PlutusScript,
    pub address: String,
    /// The reference output carrying the script, read (not spent) by
    /// settlement transactions
    pub reference_utxo: Utxo,
}

/// The head protocol's three validators
#[derive(Debug, Clone)]
pub struct HydraContracts {
    pub initial: Contract,
    pub commit: Contract,
    pub head: Contract,
}

/// Explicitly owned cache around contract resolution
pub struct ContractsCache {
    provider: Arc<dyn LedgerProvider>,
    factory: Arc<dyn TxBuilderFactory>,
    config: ContractsConfig,
    slot: Mutex<Option<Arc<HydraContracts>>>,
}

impl ContractsCache {
    pub fn new(
        provider: Arc<dyn LedgerProvider>,
        factory: Arc<dyn TxBuilderFactory>,
        config: ContractsConfig,
    ) -> Self {
        Self {
            provider,
            factory,
            config,
            slot: Mutex::new(None),
        }
    }

    /// Resolved contracts, from cache when available
    pub async fn get(&self) -> Result<Arc<HydraContracts>, SettlementError> {
        let mut slot = self.slot.lock().await;
        if let Some(contracts) = slot.as_ref() {
            return Ok(contracts.clone());
        }
        let contracts = Arc::new(self.resolve().await?);
        *slot = Some(contracts.clone());
        Ok(contracts)
    }

    /// Drop the cached resolution; the next `get` re-reads the chain
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    async fn resolve(&self) -> Result<HydraContracts, SettlementError> {
        let out_refs: Vec<OutRef> = self
            .config
            .reference_tx_ids
            .iter()
            .map(|tx_hash| OutRef {
                tx_hash: tx_hash.clone(),
                output_index: 0,
            })
            .collect();
        let utxos = self.provider.get_utxos_by_out_ref(&out_refs).await?;

        let mut contracts = Vec::with_capacity(out_refs.len());
        for out_ref in &out_refs {
            let utxo = utxos
                .iter()
                .find(|u| u.tx_hash == out_ref.tx_hash && u.output_index == out_ref.output_index)
                .ok_or(SettlementError::ReferenceUtxos {
                    expected: out_refs.len(),
                    found: utxos.len(),
                })?;
            contracts.push(self.contract_from(utxo)?);
        }
        let mut contracts = contracts.into_iter();
        // length checked above, one per reference id
        let (initial, commit, head) = match (contracts.next(), contracts.next(), contracts.next()) {
            (Some(i), Some(c), Some(h)) => (i, c, h),
            _ => {
                return Err(SettlementError::ReferenceUtxos {
                    expected: 3,
                    found: 0,
                })
            }
        };
        tracing::info!(
            initial = %initial.address,
            commit = %commit.address,
            head = %head.address,
            "resolved head protocol contracts"
        );
        Ok(HydraContracts {
            initial,
            commit,
            head,
        })
    }

    fn contract_from(&self, utxo: &Utxo) -> Result<Contract, SettlementError> {
        let script = utxo
            .script_ref
            .clone()
            .ok_or_else(|| SettlementError::MissingScriptRef(utxo.tx_hash.clone()))?;
        let address = self.factory.validator_address(&script)?;
        Ok(Contract {
            script,
            address,
            reference_utxo: utxo.clone(),
        })
    }
}
