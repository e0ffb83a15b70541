//! Error types for the Custodian ledger.
//!
//! All errors use the `CU_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Creation-time validation
//! - 2xx: Transition-time validation
//! - 3xx: Lookup / registry errors
//! - 4xx: Asset transfer errors
//! - 5xx: Service errors
//! - 9xx: Configuration / internal errors
//!
//! Every variant is a rejected call: the ledger state is unchanged and stays
//! valid for subsequent calls.

use thiserror::Error;

use crate::{AccountId, Amount, AssetId, BlockHeight, SettlementId};

/// Failure reported by the external asset-transfer collaborator.
///
/// A failed transfer leaves balances unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The source account holds less than the requested amount.
    #[error("insufficient {asset} balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        account: AccountId,
        asset: AssetId,
        needed: Amount,
        available: Amount,
    },

    /// The spender has not been approved for enough of the owner's funds.
    #[error("insufficient {asset} allowance from {owner} to {spender}: need {needed}, have {approved}")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        asset: AssetId,
        needed: Amount,
        approved: Amount,
    },

    /// The asset rejected the transfer for its own reasons.
    #[error("transfer rejected by {asset}: {reason}")]
    Rejected { asset: AssetId, reason: String },
}

/// Central error enum for all Custodian operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodianError {
    // =================================================================
    // Creation Errors (1xx)
    // =================================================================
    /// A nonzero expiry must lie strictly in the future.
    #[error("CU_ERR_100: Invalid expiry {expiry_block}: must be 0 or greater than current height {current}")]
    InvalidExpiry {
        expiry_block: BlockHeight,
        current: BlockHeight,
    },

    /// Expiry action is `None` with a deadline set, or set without one.
    #[error("CU_ERR_101: Invalid expiry action for expiry block {expiry_block}")]
    InvalidExpiryAction { expiry_block: BlockHeight },

    /// Settlements of zero units are meaningless.
    #[error("CU_ERR_102: Settlement amount must be greater than zero")]
    ZeroAmount,

    /// The protocol fee on this amount truncates to zero.
    #[error("CU_ERR_103: Fee on amount {amount} at {fee_percent}% is immaterial")]
    ImmaterialFee { amount: Amount, fee_percent: u8 },

    /// The custody account cannot be a payee: its payout would never leave custody.
    #[error("CU_ERR_104: Custody account {account} cannot be a settlement receiver or sender")]
    CustodyParty { account: AccountId },

    // =================================================================
    // Transition Errors (2xx)
    // =================================================================
    /// Caller lacks the identity or role this operation requires.
    #[error("CU_ERR_200: Unauthorized caller {caller}")]
    Unauthorized { caller: AccountId },

    /// Release/refund/expire attempted before the deposit.
    #[error("CU_ERR_201: {0} is not funded")]
    NotFunded(SettlementId),

    /// The settlement has already been released or refunded.
    #[error("CU_ERR_202: {0} is already finalized")]
    AlreadyFinalized(SettlementId),

    /// Finalization is frozen system-wide.
    #[error("CU_ERR_203: Ledger is paused")]
    Paused,

    /// No expiry configured, or the expiry height has not been reached.
    #[error("CU_ERR_204: {id} has not expired (expiry {expiry_block}, current {current})")]
    NotExpired {
        id: SettlementId,
        expiry_block: BlockHeight,
        current: BlockHeight,
    },

    /// The deposit for this settlement was already made.
    #[error("CU_ERR_205: {0} is already funded")]
    AlreadyFunded(SettlementId),

    // =================================================================
    // Lookup Errors (3xx)
    // =================================================================
    /// No settlement exists at this index.
    #[error("CU_ERR_300: Settlement not found: {0}")]
    NotFound(SettlementId),

    /// A snapshot failed density or invariant checks on restore.
    #[error("CU_ERR_301: Corrupt snapshot: {reason}")]
    CorruptSnapshot { reason: String },

    // =================================================================
    // Transfer Errors (4xx)
    // =================================================================
    /// The asset-transfer collaborator refused a transfer.
    #[error("CU_ERR_400: Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// Custody balance disagrees with the sum of live settlements.
    #[error("CU_ERR_401: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    // =================================================================
    // Service Errors (5xx)
    // =================================================================
    /// The ledger actor is gone or dropped the reply.
    #[error("CU_ERR_500: Ledger service unavailable: {0}")]
    ServiceUnavailable(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Fee percentage outside `[0, 100]`.
    #[error("CU_ERR_900: Invalid fee percent {0}: must be within [0, 100]")]
    InvalidFeePercent(u8),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("CU_ERR_901: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("CU_ERR_902: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CustodianError>;
