//! Protocol client for Hydra nodes.
//!
//! Layering, bottom up: [`transport`] owns one WebSocket connection and its
//! reconnect policy; [`node`] turns that raw stream plus the node's HTTP
//! endpoints into protocol-correct operations for a single participant;
//! [`head`] composes one client per participant into a head, and
//! [`provider`] exposes the head's off-chain ledger as an ordinary
//! ledger provider.

pub mod error;
pub mod head;
pub mod message;
pub mod node;
pub mod provider;
pub mod transport;

pub use error::{NodeError, TransportError};
pub use head::{HeadConfig, HeadOrchestrator, ParticipantCommit, ParticipantConfig};
pub use node::{HeadStatus, NodeClient};
pub use provider::HydraProvider;
pub use transport::{ConnectionState, Transport, TransportEvent};

#[cfg(test)]
mod tests;
