//! Public notifications emitted by the ledger.
//!
//! Every committed state change emits exactly one [`LedgerEvent`]. Events are
//! append-only and ordered; they exist for external indexers, and no ledger
//! logic reads them back.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AssetId, BlockHeight, ExpiryAction, SettlementId};

/// A structured notification of one committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A settlement was registered.
    CreateSettlement {
        id: SettlementId,
        receiver: AccountId,
        sender: AccountId,
        releaser: AccountId,
        amount: Amount,
        asset: AssetId,
        expiry_block: BlockHeight,
        expiry_action: ExpiryAction,
    },
    /// The deposit was pulled into custody.
    Funded {
        id: SettlementId,
        asset: AssetId,
        amount: Amount,
    },
    /// Principal paid to the receiver.
    Release { id: SettlementId },
    /// Principal returned to the sender.
    Refund { id: SettlementId },
    /// The administrator flipped the emergency pause.
    PauseToggled { paused: bool },
}

impl LedgerEvent {
    /// The settlement this event concerns, if any.
    #[must_use]
    pub fn settlement_id(&self) -> Option<SettlementId> {
        match self {
            Self::CreateSettlement { id, .. }
            | Self::Funded { id, .. }
            | Self::Release { id }
            | Self::Refund { id } => Some(*id),
            Self::PauseToggled { .. } => None,
        }
    }

    /// Canonical byte encoding used for the event log hash chain.
    ///
    /// Format: `kind(utf8) || 0x00 || variant fields in declaration order`,
    /// integers little-endian, strings length-prefixed.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(192);
        out.extend_from_slice(self.kind().as_bytes());
        out.push(0);
        match self {
            Self::CreateSettlement {
                id,
                receiver,
                sender,
                releaser,
                amount,
                asset,
                expiry_block,
                expiry_action,
            } => {
                out.extend_from_slice(&id.0.to_le_bytes());
                out.extend_from_slice(receiver.as_bytes());
                out.extend_from_slice(sender.as_bytes());
                out.extend_from_slice(releaser.as_bytes());
                out.extend_from_slice(&amount.to_le_bytes());
                out.extend_from_slice(&(asset.0.len() as u64).to_le_bytes());
                out.extend_from_slice(asset.0.as_bytes());
                out.extend_from_slice(&expiry_block.0.to_le_bytes());
                out.push(expiry_action.tag());
            }
            Self::Funded { id, asset, amount } => {
                out.extend_from_slice(&id.0.to_le_bytes());
                out.extend_from_slice(&(asset.0.len() as u64).to_le_bytes());
                out.extend_from_slice(asset.0.as_bytes());
                out.extend_from_slice(&amount.to_le_bytes());
            }
            Self::Release { id } | Self::Refund { id } => {
                out.extend_from_slice(&id.0.to_le_bytes());
            }
            Self::PauseToggled { paused } => out.push(u8::from(*paused)),
        }
        out
    }

    /// Short, stable name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateSettlement { .. } => "CREATE_SETTLEMENT",
            Self::Funded { .. } => "FUNDED",
            Self::Release { .. } => "RELEASE",
            Self::Refund { .. } => "REFUND",
            Self::PauseToggled { .. } => "PAUSE_TOGGLED",
        }
    }
}

impl std::fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.settlement_id() {
            Some(id) => write!(f, "{}({id})", self.kind()),
            None => f.write_str(self.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_id_and_kind() {
        let ev = LedgerEvent::Release { id: SettlementId(4) };
        assert_eq!(ev.settlement_id(), Some(SettlementId(4)));
        assert_eq!(ev.kind(), "RELEASE");
        assert_eq!(format!("{ev}"), "RELEASE(settlement:4)");

        let ev = LedgerEvent::PauseToggled { paused: true };
        assert_eq!(ev.settlement_id(), None);
        assert_eq!(format!("{ev}"), "PAUSE_TOGGLED");
    }

    #[test]
    fn canonical_bytes_distinguish_release_from_refund() {
        let release = LedgerEvent::Release { id: SettlementId(1) };
        let refund = LedgerEvent::Refund { id: SettlementId(1) };
        assert_ne!(release.canonical_bytes(), refund.canonical_bytes());
        assert_eq!(release.canonical_bytes(), release.clone().canonical_bytes());
    }

    #[test]
    fn serde_names_the_variant() {
        let ev = LedgerEvent::Funded {
            id: SettlementId(1),
            asset: AssetId::new("USDC"),
            amount: 500,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.starts_with("{\"Funded\""), "Got: {json}");
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }
}
