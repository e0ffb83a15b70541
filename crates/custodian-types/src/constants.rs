//! System-wide constants for the Custodian ledger.

/// Denominator for the protocol fee percentage.
pub const FEE_DENOMINATOR: u128 = 100;

/// Largest accepted fee percentage.
pub const MAX_FEE_PERCENT: u8 = 100;

/// Default protocol fee percentage (1%).
pub const DEFAULT_FEE_PERCENT: u8 = 1;

/// Default capacity of the ledger actor's mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Expiry height meaning "never expires".
pub const NO_EXPIRY: u64 = 0;

/// Domain separator for account identities derived from labels.
pub const ACCOUNT_LABEL_DOMAIN: &[u8] = b"custodian:account:v1:";

/// Domain separator for registry state roots.
pub const STATE_ROOT_DOMAIN: &[u8] = b"custodian:state:v1:";

/// Domain separator for event log chain digests.
pub const EVENT_CHAIN_DOMAIN: &[u8] = b"custodian:event:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Custodian";
