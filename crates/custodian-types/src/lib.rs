//! # custodian-types
//!
//! Shared types, policies, errors, and configuration for the **Custodian**
//! conditional custody ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`AssetId`], [`SettlementId`], [`BlockHeight`], [`Amount`]
//! - **Call context**: [`CallContext`] (caller identity + current height)
//! - **Settlement model**: [`Settlement`], [`ExpiryAction`], [`Disposition`], [`SettlementStatus`]
//! - **Policies**: [`FeePolicy`], [`AccessPolicy`]
//! - **Events**: [`LedgerEvent`]
//! - **Configuration**: [`LedgerConfig`]
//! - **Errors**: [`CustodianError`] with `CU_ERR_` prefix codes, [`TransferError`]
//! - **Constants**: system-wide limits and defaults

pub mod access;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fee;
pub mod ids;
pub mod settlement;

pub use access::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use fee::*;
pub use ids::*;
pub use settlement::*;

// Constants are accessed via `custodian_types::constants::FOO`
// (not re-exported to avoid name collisions).
