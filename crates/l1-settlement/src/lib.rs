//! On-chain settlement of a head: the contracts cache and the Close and
//! Fanout transaction builders.
//!
//! Everything here runs against the collaborator seams in `chain_core`; the
//! actual coin selection, fee balancing and witness assembly stay behind
//! the `TxBuilder` trait.

pub mod close;
pub mod contracts;
pub mod error;
pub mod fanout;

mod party;

pub use close::build_close;
pub use contracts::{ContractsCache, ContractsConfig, HydraContracts};
pub use error::SettlementError;
pub use fanout::build_fanout;


use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock anchor for transaction validity windows, in POSIX milliseconds.
///
/// Shifted 20 s into the past and floored to a whole second so the lower
/// validity bound is already inside the chain's current slot when the
/// transaction lands.
pub fn validity_anchor_ms() -> u64 {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    now_ms.saturating_sub(20_000) / 1000 * 1000
}
