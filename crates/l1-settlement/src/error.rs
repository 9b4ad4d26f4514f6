//! Error taxonomy for settlement transaction construction

use chain_core::address::AddressError;
use chain_core::datum::DatumError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("head utxo carries no inline datum")]
    MissingDatum,

    #[error("head datum is {found}, expected {expected}")]
    WrongState {
        expected: &'static str,
        found: &'static str,
    },

    #[error("no local key matches any participant token of this head")]
    NotAParty,

    #[error("no signing key held for pubkey hash {0}")]
    SigningKeyNotFound(String),

    #[error("fanout supports only snapshot 0, head closed at snapshot {0}")]
    UnsupportedSnapshot(u64),

    #[error("alpha or omega utxo hash is not the empty-set hash")]
    PendingSnapshotChanges,

    #[error("no collect-commitment transaction found in the head's history")]
    CommitHistoryNotFound,

    #[error("commit input at {0} carries no inline datum")]
    CommitDatumMissing(String),

    #[error("minting policy script not found in the head's history")]
    MintingPolicyNotFound,

    #[error("expected {expected} script reference utxos, resolved {found}")]
    ReferenceUtxos { expected: usize, found: usize },

    #[error("reference utxo {0} carries no script")]
    MissingScriptRef(String),

    #[error(transparent)]
    Datum(#[from] DatumError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("chain access failed: {0}")]
    Chain(#[from] anyhow::Error),
}
