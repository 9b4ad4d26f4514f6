//! Shared Cardano-facing types and the primitive-layer seams used by the
//! Hydra head manager crates.
//!
//! The general-purpose transaction building / wallet machinery is not
//! implemented here; it is consumed through the traits in [`provider`].

pub mod address;
pub mod datum;
pub mod hash;
pub mod plutus;
pub mod provider;
pub mod types;

pub use types::{
    Assets, Network, OutRef, PlutusScript, ProtocolParameters, ScriptType, TxEnvelope, Utxo,
};
