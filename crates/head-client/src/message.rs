//! Wire messages exchanged with the Hydra node over the WebSocket.
//!
//! Inbound frames are decoded exactly once into the closed [`ServerMessage`]
//! enum; a frame whose tag is not listed here simply fails to decode and is
//! skipped by the demultiplexer.

use chain_core::TxEnvelope;
use serde::{Deserialize, Serialize};

/// Commands this client sends
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tag")]
pub enum ClientCommand {
    Init,
    NewTx { transaction: TxEnvelope },
    Close,
    Fanout,
}

impl ClientCommand {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("command serialization should not fail")
    }
}

/// Reference to a transaction inside a server message
#[derive(Debug, Clone, Deserialize)]
pub struct TxRef {
    #[serde(rename = "txId")]
    pub tx_id: String,
}

/// The client input a `CommandFailed` refers back to
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInput {
    pub tag: String,
    #[serde(default)]
    pub transaction: Option<TxRef>,
}

/// The chain transaction a `PostTxOnChainFailed` refers to
#[derive(Debug, Clone, Deserialize)]
pub struct PostChainTx {
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "confirmedTransactions", default)]
    pub confirmed_transactions: Vec<String>,
}

/// Everything the node can send that this client reacts to
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "tag")]
pub enum ServerMessage {
    Greetings {
        #[serde(rename = "headStatus")]
        head_status: String,
    },
    HeadIsInitializing,
    HeadIsOpen,
    HeadIsClosed,
    ReadyToFanout,
    HeadIsFinalized,
    TxValid {
        transaction: TxRef,
    },
    TxInvalid {
        transaction: TxRef,
    },
    CommandFailed {
        #[serde(rename = "clientInput")]
        client_input: ClientInput,
    },
    PostTxOnChainFailed {
        #[serde(rename = "postChainTx")]
        post_chain_tx: PostChainTx,
        #[serde(rename = "postTxError", default)]
        post_tx_error: serde_json::Value,
    },
    SnapshotConfirmed {
        snapshot: Snapshot,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_command_serializes_to_bare_tag() {
        assert_eq!(ClientCommand::Init.to_json(), r#"{"tag":"Init"}"#);
    }

    #[test]
    fn new_tx_command_embeds_the_envelope() {
        let cmd = ClientCommand::NewTx {
            transaction: TxEnvelope::conway("84a0"),
        };
        let json: serde_json::Value = serde_json::from_str(&cmd.to_json()).unwrap();
        assert_eq!(json["tag"], "NewTx");
        assert_eq!(json["transaction"]["cborHex"], "84a0");
        assert_eq!(json["transaction"]["type"], "Tx ConwayEra");
    }

    #[test]
    fn decodes_tx_valid_with_extra_fields() {
        let raw = r#"{"tag":"TxValid","headId":"abc","transaction":{"txId":"deadbeef","extra":1}}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::TxValid { transaction } => assert_eq!(transaction.tx_id, "deadbeef"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_tags_fail_to_decode() {
        assert!(serde_json::from_str::<ServerMessage>(r#"{"tag":"PeerConnected"}"#).is_err());
    }

    #[test]
    fn snapshot_confirmed_tolerates_missing_tx_list() {
        let raw = r#"{"tag":"SnapshotConfirmed","snapshot":{"number":3}}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::SnapshotConfirmed { snapshot } => {
                assert!(snapshot.confirmed_transactions.is_empty())
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
