//! # Settlement: the custody-and-conditional-payout record
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  fund   ┌────────┐  release / expire(Release)  ┌──────────┐
//!   │ CREATED ├────────▶│ FUNDED ├────────────────────────────▶│ RELEASED │
//!   └─────────┘         └───┬────┘                             └──────────┘
//!                           │ refund / expire(Refund)
//!                           ▼
//!                      ┌──────────┐
//!                      │ REFUNDED │
//!                      └──────────┘
//! ```
//!
//! Transitions are forward-only. `RELEASED` and `REFUNDED` are terminal and
//! mutually exclusive; together they make up the "finalized" state.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AssetId, BlockHeight, CustodianError, Result, SettlementId};

/// Default disposition applied once a settlement's deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryAction {
    /// No deadline: the settlement waits for the releaser indefinitely.
    None,
    /// Pay the receiver at expiry.
    Release,
    /// Return the funds to the sender at expiry.
    Refund,
}

impl ExpiryAction {
    /// Whether this action is consistent with `expiry_block`.
    ///
    /// A deadline needs a default outcome and a default outcome needs a deadline.
    #[must_use]
    pub fn is_valid_for(self, expiry_block: BlockHeight) -> bool {
        if expiry_block.is_never() {
            self == Self::None
        } else {
            self != Self::None
        }
    }

    /// Stable one-byte tag for canonical encodings.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Release => 1,
            Self::Refund => 2,
        }
    }

    /// The terminal disposition this action leads to, if any.
    #[must_use]
    pub fn disposition(self) -> Option<Disposition> {
        match self {
            Self::None => None,
            Self::Release => Some(Disposition::Released),
            Self::Refund => Some(Disposition::Refunded),
        }
    }
}

impl std::fmt::Display for ExpiryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Release => write!(f, "RELEASE"),
            Self::Refund => write!(f, "REFUND"),
        }
    }
}

/// Which way a finalized settlement went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// Principal paid to the receiver.
    Released,
    /// Principal returned to the sender.
    Refunded,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// Lifecycle position derived from the record's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    Created,
    Funded,
    Released,
    Refunded,
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Funded => write!(f, "FUNDED"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// Terms proposed by a `create` call. Anyone may propose terms on behalf of
/// the named parties; authority is checked when money moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTerms {
    pub receiver: AccountId,
    pub sender: AccountId,
    pub releaser: AccountId,
    pub amount: Amount,
    pub asset: AssetId,
    pub expiry_block: BlockHeight,
    pub expiry_action: ExpiryAction,
}

impl SettlementTerms {
    /// Terms without a deadline.
    #[must_use]
    pub fn new(
        receiver: AccountId,
        sender: AccountId,
        releaser: AccountId,
        amount: Amount,
        asset: AssetId,
    ) -> Self {
        Self {
            receiver,
            sender,
            releaser,
            amount,
            asset,
            expiry_block: BlockHeight::NEVER,
            expiry_action: ExpiryAction::None,
        }
    }

    /// Apply `action` automatically once `expiry_block` is reached.
    #[must_use]
    pub fn expiring(mut self, expiry_block: BlockHeight, action: ExpiryAction) -> Self {
        self.expiry_block = expiry_block;
        self.expiry_action = action;
        self
    }
}

/// A single custody record between a sender, a receiver, and a releaser.
///
/// Records are owned by the registry and addressed by [`SettlementId`].
/// Only the state machine mutates them; everybody else sees a shared
/// reference or a clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Dense registry index.
    pub id: SettlementId,
    /// Recipient on release.
    pub receiver: AccountId,
    /// Recipient on refund (the original funder).
    pub sender: AccountId,
    /// Sole party allowed to trigger release or refund before expiry.
    pub releaser: AccountId,
    /// Units currently in custody. Zero once finalized.
    pub amount: Amount,
    /// Which asset is escrowed.
    pub asset: AssetId,
    /// Height at which `expiry_action` becomes eligible; `NEVER` disables it.
    pub expiry_block: BlockHeight,
    /// Default outcome once `expiry_block` is reached.
    pub expiry_action: ExpiryAction,
    /// Set exactly once, by a successful deposit.
    pub funded: bool,
    /// Set exactly once, by a successful release or refund.
    pub finalized: bool,
    /// Terminal disposition, present iff `finalized`.
    pub outcome: Option<Disposition>,
}

impl Settlement {
    /// A fresh, unfunded record for `terms` at index `id`.
    #[must_use]
    pub fn from_terms(id: SettlementId, terms: SettlementTerms) -> Self {
        Self {
            id,
            receiver: terms.receiver,
            sender: terms.sender,
            releaser: terms.releaser,
            amount: terms.amount,
            asset: terms.asset,
            expiry_block: terms.expiry_block,
            expiry_action: terms.expiry_action,
            funded: false,
            finalized: false,
            outcome: None,
        }
    }

    /// Canonical byte encoding used for state roots.
    ///
    /// Format: `id(8) || receiver(32) || sender(32) || releaser(32) || amount(16)
    /// || asset_len(8) || asset(utf8) || expiry_block(8) || expiry_action(1)
    /// || funded(1) || finalized(1) || outcome(1)`
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(160 + self.asset.0.len());
        out.extend_from_slice(&self.id.0.to_le_bytes());
        out.extend_from_slice(self.receiver.as_bytes());
        out.extend_from_slice(self.sender.as_bytes());
        out.extend_from_slice(self.releaser.as_bytes());
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(&(self.asset.0.len() as u64).to_le_bytes());
        out.extend_from_slice(self.asset.0.as_bytes());
        out.extend_from_slice(&self.expiry_block.0.to_le_bytes());
        out.push(self.expiry_action.tag());
        out.push(u8::from(self.funded));
        out.push(u8::from(self.finalized));
        out.push(match self.outcome {
            None => 0,
            Some(Disposition::Released) => 1,
            Some(Disposition::Refunded) => 2,
        });
        out
    }

    /// Current lifecycle position.
    #[must_use]
    pub fn status(&self) -> SettlementStatus {
        match (self.funded, self.outcome) {
            (_, Some(Disposition::Released)) => SettlementStatus::Released,
            (_, Some(Disposition::Refunded)) => SettlementStatus::Refunded,
            (true, None) => SettlementStatus::Funded,
            (false, None) => SettlementStatus::Created,
        }
    }

    /// Funded and not yet finalized: the amount is sitting in custody.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.funded && !self.finalized
    }

    /// Whether the deadline has passed at `height`.
    #[must_use]
    pub fn is_expired_at(&self, height: BlockHeight) -> bool {
        !self.expiry_block.is_never() && height >= self.expiry_block
    }

    /// Who receives the principal under `disposition`.
    #[must_use]
    pub fn payee(&self, disposition: Disposition) -> AccountId {
        match disposition {
            Disposition::Released => self.receiver,
            Disposition::Refunded => self.sender,
        }
    }

    /// Check the record-level invariants.
    ///
    /// # Errors
    /// Returns [`CustodianError::CorruptSnapshot`] naming the first violated invariant.
    pub fn check_invariants(&self) -> Result<()> {
        let violation = if self.finalized && self.amount != 0 {
            Some("finalized with nonzero amount")
        } else if self.finalized && !self.funded {
            Some("finalized without funding")
        } else if self.finalized != self.outcome.is_some() {
            Some("outcome disagrees with finalized flag")
        } else if !self.expiry_action.is_valid_for(self.expiry_block) {
            Some("expiry action inconsistent with expiry block")
        } else {
            None
        };

        match violation {
            Some(what) => Err(CustodianError::CorruptSnapshot {
                reason: format!("{}: {what}", self.id),
            }),
            None => Ok(()),
        }
    }
}

/// A placeholder settlement for testing.
/// **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Settlement {
    /// Unfunded 100-unit USDC settlement with no expiry.
    #[must_use]
    pub fn dummy(id: SettlementId) -> Self {
        Self {
            id,
            receiver: AccountId::from_label("receiver"),
            sender: AccountId::from_label("sender"),
            releaser: AccountId::from_label("releaser"),
            amount: 100,
            asset: AssetId::new("USDC"),
            expiry_block: BlockHeight::NEVER,
            expiry_action: ExpiryAction::None,
            funded: false,
            finalized: false,
            outcome: None,
        }
    }
}
