//! Core Cardano types shared across the workspace

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Asset bundle keyed by unit: `"lovelace"` or `<policy id hex><asset name hex>`.
///
/// Quantities are signed so the same type can express burns.
pub type Assets = BTreeMap<String, i128>;

/// The unit key for ada quantities inside [`Assets`].
pub const LOVELACE: &str = "lovelace";

/// Cardano network the head is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Preprod,
    Preview,
}

impl Network {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }
}

/// Reference to a transaction output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutRef {
    pub tx_hash: String,
    pub output_index: u64,
}

/// Script language of an attached validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptType {
    Native,
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

/// A serialized validator script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlutusScript {
    #[serde(rename = "type")]
    pub script_type: ScriptType,
    #[serde(rename = "cborHex")]
    pub cbor_hex: String,
}

/// An unspent transaction output as observed on L1 or in the head snapshot.
///
/// Immutable once observed; a fresh snapshot query supersedes it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utxo {
    pub tx_hash: String,
    pub output_index: u64,
    pub address: String,
    pub assets: Assets,
    /// Inline datum, CBOR hex
    pub datum: Option<String>,
    pub datum_hash: Option<String>,
    pub script_ref: Option<PlutusScript>,
}

impl Utxo {
    pub fn out_ref(&self) -> OutRef {
        OutRef {
            tx_hash: self.tx_hash.clone(),
            output_index: self.output_index,
        }
    }

    pub fn lovelace(&self) -> i128 {
        self.assets.get(LOVELACE).copied().unwrap_or(0)
    }
}

/// Text-envelope wrapper around a serialized transaction, the shape the
/// Hydra node accepts and returns on its HTTP endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEnvelope {
    #[serde(rename = "type")]
    pub envelope_type: String,
    pub description: String,
    #[serde(rename = "cborHex")]
    pub cbor_hex: String,
    #[serde(rename = "txId", skip_serializing_if = "Option::is_none", default)]
    pub tx_id: Option<String>,
}

impl TxEnvelope {
    /// Wrap a raw transaction CBOR hex in the Conway era envelope
    pub fn conway(cbor_hex: impl Into<String>) -> Self {
        Self {
            envelope_type: "Tx ConwayEra".to_string(),
            description: String::new(),
            cbor_hex: cbor_hex.into(),
            tx_id: None,
        }
    }
}

/// Execution unit prices as decimal ratios
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExUnitPrices {
    pub price_memory: f64,
    pub price_steps: f64,
}

/// Cost models keyed by parameter index, one map per Plutus version
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CostModels {
    pub plutus_v1: BTreeMap<String, i64>,
    pub plutus_v2: BTreeMap<String, i64>,
    pub plutus_v3: BTreeMap<String, i64>,
}

/// Canonical protocol parameters, translated from the node's wire schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub max_tx_size: u64,
    pub max_val_size: u64,
    pub key_deposit: u128,
    pub pool_deposit: u128,
    pub drep_deposit: u128,
    pub gov_action_deposit: u128,
    pub price_mem: f64,
    pub price_step: f64,
    pub max_tx_ex_mem: u128,
    pub max_tx_ex_steps: u128,
    pub coins_per_utxo_byte: u128,
    pub collateral_percentage: u64,
    pub max_collateral_inputs: u64,
    pub min_fee_ref_script_cost_per_byte: f64,
    pub cost_models: CostModels,
}

/// Evaluated redeemer budget, as returned by `evaluate_tx`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRedeemer {
    pub redeemer_tag: String,
    pub redeemer_index: u64,
    pub ex_units_mem: u64,
    pub ex_units_steps: u64,
}
