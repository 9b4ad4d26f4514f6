//! Collaborator seams to the general-purpose Cardano layer.
//!
//! Wallet selection, coin selection, fee calculation and witness handling
//! live behind these traits; the head manager drives them but never
//! reimplements them. `LedgerProvider` is also what the L2 side implements,
//! so transaction-building code can run against the head unchanged.

use crate::types::{Assets, EvalRedeemer, OutRef, PlutusScript, ProtocolParameters, TxEnvelope, Utxo};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Ledger access, implemented by the L1 chain provider and by the head's L2 view
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    async fn get_protocol_parameters(&self) -> Result<ProtocolParameters>;
    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>>;
    async fn get_utxos_with_unit(&self, address: &str, unit: &str) -> Result<Vec<Utxo>>;
    async fn get_utxo_by_unit(&self, unit: &str) -> Result<Utxo>;
    async fn get_utxos_by_out_ref(&self, out_refs: &[OutRef]) -> Result<Vec<Utxo>>;
    /// Submit a signed transaction, returning its id
    async fn submit_tx(&self, tx_cbor: &str) -> Result<String>;
    async fn await_tx(&self, tx_hash: &str, poll_interval: Duration) -> Result<bool>;
    async fn evaluate_tx(&self, tx_cbor: &str) -> Result<Vec<EvalRedeemer>>;
}

/// A resolved transaction input, as reported by the chain indexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub tx_hash: String,
    pub output_index: u64,
    pub address: String,
    pub inline_datum: Option<String>,
}

/// Historical chain access used by the fanout reconstruction walk
#[async_trait]
pub trait ChainIndexer: Send + Sync {
    /// Inputs consumed by `tx_hash`, with their source addresses and datums
    async fn tx_inputs(&self, tx_hash: &str) -> Result<Vec<ResolvedInput>>;
    /// Plutus scripts carried in the witness set of `tx_hash`
    async fn tx_plutus_scripts(&self, tx_hash: &str) -> Result<Vec<PlutusScript>>;
}

/// Datum attached to a reconstructed output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDatumKind {
    Hash(String),
    Inline(String),
}

/// One transaction under construction.
///
/// Mirrors the primitive layer's builder: inputs and outputs are staged,
/// `complete` runs balancing/fee calculation and returns the unsigned
/// envelope.
#[async_trait]
pub trait TxBuilder: Send {
    fn collect_from(&mut self, utxo: &Utxo, redeemer_cbor: &str);
    fn read_from(&mut self, utxo: &Utxo);
    fn pay_to_contract(&mut self, address: &str, inline_datum_cbor: &str, assets: &Assets);
    fn pay_to_address_with_data(
        &mut self,
        address: &str,
        datum: Option<OutputDatumKind>,
        assets: &Assets,
        script_ref: Option<PlutusScript>,
    );
    fn mint_assets(&mut self, assets: &Assets, redeemer_cbor: &str);
    fn attach_minting_policy(&mut self, script: &PlutusScript);
    fn valid_from(&mut self, posix_ms: u64);
    fn valid_to(&mut self, posix_ms: u64);
    fn add_signer(&mut self, address: &str);
    async fn complete(self: Box<Self>) -> Result<TxEnvelope>;
}

/// Produces transaction builders bound to a wallet and provider
pub trait TxBuilderFactory: Send + Sync {
    fn new_tx(&self, wallet: Arc<dyn Wallet>) -> Box<dyn TxBuilder>;
    /// Derive a validator's payment address
    fn validator_address(&self, script: &PlutusScript) -> Result<String>;
}

/// A signing wallet held by this process
pub trait Wallet: Send + Sync {
    fn address(&self) -> String;
    /// Payment verification key hash, hex
    fn pubkey_hash(&self) -> String;
    fn sign(&self, tx: &TxEnvelope) -> Result<TxEnvelope>;
}

/// Local key material, queried by participant token name during close/fanout
pub trait KeyStore: Send + Sync {
    fn pubkey_hashes(&self) -> Vec<String>;
    fn by_pubkey_hash(&self, hash: &str) -> Option<Arc<dyn Wallet>>;
}
