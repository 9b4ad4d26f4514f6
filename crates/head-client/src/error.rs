//! Error taxonomy for the protocol client

use crate::node::HeadStatus;
use thiserror::Error;

/// Connection-level failures.
///
/// These trigger the reconnect policy; they only surface to callers whose
/// command was cut off mid-flight.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("transport closed while sending")]
    ChannelClosed,
}

/// Failures of a single NodeClient operation
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("cannot {operation} while head status is {status:?}")]
    InvalidStatus {
        operation: &'static str,
        status: HeadStatus,
    },

    #[error("command {0} is already in flight")]
    CallInFlight(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("node rejected request ({status}): {body}")]
    NodeResponse {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("command {command} failed")]
    CommandFailed { command: String },

    #[error("transaction {tx_id} rejected by the head")]
    TxRejected { tx_id: String },

    #[error("posting {tag} on chain failed: {detail}")]
    PostTxFailed { tag: String, detail: String },

    #[error("connection reset while command was in flight")]
    ConnectionReset,

    #[error("command abandoned without a terminal event")]
    Abandoned,

    #[error("quantity {quantity} of {unit} does not fit a json number")]
    QuantityOutOfRange { unit: String, quantity: i128 },

    #[error("invalid transaction payload: {0}")]
    Cbor(#[from] chain_core::plutus::CborError),

    #[error("unknown participant {0}")]
    UnknownParticipant(String),
}
