//! # custodian-service
//!
//! Async front for the **Custodian** ledger. A single tokio task owns the
//! [`SettlementEngine`](custodian_ledger::SettlementEngine) and the asset
//! book; callers talk to it through a cloneable [`LedgerHandle`].
//!
//! ```no_run
//! # async fn demo() -> custodian_types::Result<()> {
//! use custodian_ledger::InMemoryAssets;
//! use custodian_service::spawn_ledger;
//! use custodian_types::{AccountId, LedgerConfig};
//!
//! custodian_service::init_tracing("info");
//! let config = LedgerConfig::new(
//!     AccountId::from_label("admin"),
//!     AccountId::from_label("fee-sink"),
//!     AccountId::from_label("custody"),
//! );
//! let ledger = spawn_ledger(&config, InMemoryAssets::new())?;
//! assert_eq!(ledger.get_num_settlements().await?, 0);
//! # Ok(())
//! # }
//! ```

pub mod actor;

pub use actor::{LedgerActor, LedgerHandle, LedgerMessage, spawn_ledger, spawn_restored};

use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` when the variable is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
