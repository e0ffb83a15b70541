//! # custodian-ledger
//!
//! **Custody Plane**: the settlement registry and the state machine that
//! drives each settlement from creation to a terminal disposition.
//!
//! ## Architecture
//!
//! [`SettlementEngine`] owns the registry, the fee and access policies, and
//! the event log. Value moves through an [`AssetTransfer`] collaborator
//! passed into each call:
//! 1. `create` registers terms (no authorization, no value moved)
//! 2. `fund` pulls the amount from the caller into custody
//! 3. `release` / `refund` (releaser only) or `expire` (anyone, once due)
//!    pushes principal to the payee and the fee to the fee sink
//!
//! ## Lifecycle
//!
//! ```text
//!              fund             release / refund / expire
//!   CREATED ─────────▶ FUNDED ───────────────────────────▶ FINALIZED
//!                                    (payee + fee sink)
//! ```
//!
//! [`CustodyAudit`] checks that custody holds exactly the sum of live
//! settlements, per asset.

pub mod assets;
pub mod audit;
pub mod engine;
pub mod event_log;
pub mod registry;

pub use assets::{AssetTransfer, InMemoryAssets};
pub use audit::CustodyAudit;
pub use engine::SettlementEngine;
pub use event_log::{EventLog, EventRecord};
pub use registry::{RegistrySnapshot, SettlementRegistry};
