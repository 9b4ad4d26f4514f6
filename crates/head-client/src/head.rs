//! Composition of one NodeClient per participant into a single head.
//!
//! Aggregate status mirrors the coordinator's node only; per-participant
//! divergence is not reconciled here.

use crate::error::NodeError;
use crate::node::{HeadStatus, NodeClient};
use crate::provider::HydraProvider;
use anyhow::{Context, Result};
use chain_core::provider::{LedgerProvider, Wallet};
use chain_core::{TxEnvelope, Utxo};
use futures_util::future::try_join_all;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// One head participant and the node speaking for it
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantConfig {
    pub name: String,
    /// Node base URL, either scheme
    pub url: String,
}

/// Static description of a head
#[derive(Debug, Clone, Deserialize)]
pub struct HeadConfig {
    pub participants: Vec<ParticipantConfig>,
    /// Name of the participant whose node drives init/close/fanout and
    /// whose status the head reports
    pub coordinator: String,
}

/// A participant's contribution to the commit round
pub struct ParticipantCommit {
    pub participant: String,
    pub utxos: Vec<Utxo>,
    /// Signs the commit when `utxos` is non-empty; an empty commit needs
    /// no witness and is submitted unsigned
    pub wallet: Option<Arc<dyn Wallet>>,
}

/// N node clients acting as one head
pub struct HeadOrchestrator {
    nodes: BTreeMap<String, NodeClient>,
    coordinator: String,
    l1: Option<Arc<dyn LedgerProvider>>,
}

impl HeadOrchestrator {
    pub fn new(config: &HeadConfig) -> Result<Self, NodeError> {
        let nodes: BTreeMap<String, NodeClient> = config
            .participants
            .iter()
            .map(|p| (p.name.clone(), NodeClient::new(p.name.clone(), p.url.clone())))
            .collect();
        if !nodes.contains_key(&config.coordinator) {
            return Err(NodeError::UnknownParticipant(config.coordinator.clone()));
        }
        Ok(Self {
            nodes,
            coordinator: config.coordinator.clone(),
            l1: None,
        })
    }

    /// Attach the shared L1 chain access
    pub fn with_ledger_l1(mut self, l1: Arc<dyn LedgerProvider>) -> Self {
        self.l1 = Some(l1);
        self
    }

    pub fn connect(&self) {
        for node in self.nodes.values() {
            node.connect();
        }
    }

    pub fn disconnect(&self) {
        for node in self.nodes.values() {
            node.disconnect();
        }
    }

    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn node(&self, participant: &str) -> Result<&NodeClient, NodeError> {
        self.nodes
            .get(participant)
            .ok_or_else(|| NodeError::UnknownParticipant(participant.to_string()))
    }

    pub fn coordinator(&self) -> &NodeClient {
        // membership checked at construction
        &self.nodes[&self.coordinator]
    }

    /// The head's status, as reported by the coordinator's node
    pub fn status(&self) -> HeadStatus {
        self.coordinator().status()
    }

    pub fn status_watch(&self) -> watch::Receiver<HeadStatus> {
        self.coordinator().status_watch()
    }

    pub async fn init(&self) -> Result<(), NodeError> {
        self.coordinator().init().await
    }

    pub async fn close(&self) -> Result<(), NodeError> {
        self.coordinator().close().await
    }

    pub async fn fanout(&self) -> Result<(), NodeError> {
        self.coordinator().fanout().await
    }

    /// Shared L1 chain access, when attached
    pub fn ledger_l1(&self) -> Option<Arc<dyn LedgerProvider>> {
        self.l1.clone()
    }

    /// The head's off-chain ledger, seen through one participant's node
    pub fn ledger_l2(&self, participant: &str) -> Result<HydraProvider, NodeError> {
        Ok(HydraProvider::new(self.node(participant)?.clone()))
    }

    /// Run one participant's commit: request the commit transaction from
    /// their node, sign it iff the contribution is non-empty, and submit it
    /// through the coordinator's node.
    pub async fn commit(&self, commit: &ParticipantCommit) -> Result<TxEnvelope> {
        let node = self.node(&commit.participant)?;
        let unsigned = node.commit(&commit.utxos, None).await.with_context(|| {
            format!("requesting commit transaction for {}", commit.participant)
        })?;

        let to_submit = if commit.utxos.is_empty() {
            unsigned
        } else {
            let wallet = commit.wallet.as_ref().with_context(|| {
                format!("{} commits funds but holds no signing key", commit.participant)
            })?;
            wallet
                .sign(&unsigned)
                .with_context(|| format!("signing commit for {}", commit.participant))?
        };

        self.coordinator()
            .cardano_transaction(&to_submit)
            .await
            .with_context(|| format!("submitting commit for {}", commit.participant))?;
        Ok(to_submit)
    }

    /// All participants' commits, concurrently; submission ordering across
    /// participants is left to the chain.
    pub async fn commit_all(&self, commits: &[ParticipantCommit]) -> Result<Vec<TxEnvelope>> {
        try_join_all(commits.iter().map(|commit| self.commit(commit))).await
    }
}
