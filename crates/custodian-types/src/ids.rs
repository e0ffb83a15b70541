//! Identifiers used throughout Custodian.
//!
//! Settlements are keyed by a dense integer index assigned at creation.
//! Accounts are opaque 32-byte identities (a public key or an address hash).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest, Sha256};

use crate::{CustodianError, constants};

/// Quantity of an asset, in its smallest indivisible unit.
pub type Amount = u128;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Identity of a party: funder, receiver, releaser, administrator, fee sink,
/// or the custody account itself.
///
/// Serialized as a 64-character hex string so configs stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministic identity derived from a human-readable label.
    ///
    /// `SHA-256("custodian:account:v1:" || label)`. The same label always
    /// yields the same identity, which makes configs and fixtures readable.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(constants::ACCOUNT_LABEL_DOMAIN);
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", hex::encode(&self.0[..8]))
    }
}

impl FromStr for AccountId {
    type Err = CustodianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| CustodianError::Serialization(format!("account id {s:?}: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CustodianError::Serialization(format!("account id {s:?}: expected 32 bytes"))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Reference to an external fungible-asset resource (e.g. a token contract).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SettlementId
// ---------------------------------------------------------------------------

/// Dense index of a settlement in the registry. Assigned at creation,
/// never reused, never reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SettlementId(pub u64);

impl SettlementId {
    /// Position in the registry's backing vector, if addressable on this platform.
    #[must_use]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "settlement:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BlockHeight
// ---------------------------------------------------------------------------

/// Height of the execution substrate. Height 0 doubles as "no expiry"
/// on a settlement record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    pub const NEVER: Self = Self(constants::NO_EXPIRY);

    #[must_use]
    pub fn is_never(self) -> bool {
        self.0 == constants::NO_EXPIRY
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CallContext
// ---------------------------------------------------------------------------

/// What the substrate tells the ledger about the call being executed:
/// who is calling, and at which height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: AccountId,
    pub height: BlockHeight,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: AccountId, height: BlockHeight) -> Self {
        Self { caller, height }
    }

    /// Same height, different caller.
    #[must_use]
    pub fn with_caller(self, caller: AccountId) -> Self {
        Self { caller, ..self }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_from_label_is_deterministic() {
        let a = AccountId::from_label("alice");
        let b = AccountId::from_label("alice");
        let c = AccountId::from_label("bob");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn account_display_is_prefixed() {
        let a = AccountId::from_bytes([0xab; 32]);
        assert_eq!(format!("{a}"), "acct:abababababababab");
    }

    #[test]
    fn account_parses_from_hex() {
        let a = AccountId::from_label("dave");
        let parsed: AccountId = hex::encode(a.as_bytes()).parse().unwrap();
        assert_eq!(a, parsed);

        assert!("zz".parse::<AccountId>().is_err());
        assert!("abcd".parse::<AccountId>().is_err());
    }

    #[test]
    fn settlement_id_index() {
        let id = SettlementId(41);
        assert_eq!(id.index(), Some(41));
        assert_eq!(format!("{id}"), "settlement:41");
    }

    #[test]
    fn block_height_never() {
        assert!(BlockHeight::NEVER.is_never());
        assert!(!BlockHeight(1).is_never());
    }

    #[test]
    fn call_context_builders() {
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");
        let ctx = CallContext::new(alice, BlockHeight(10));
        assert_eq!(ctx.with_caller(bob).caller, bob);
        assert_eq!(ctx.with_caller(bob).height, BlockHeight(10));
    }

    #[test]
    fn serde_roundtrips() {
        let acct = AccountId::from_label("carol");
        let json = serde_json::to_string(&acct).unwrap();
        assert_eq!(json.len(), 66, "hex string plus quotes: {json}");
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(acct, back);

        let asset = AssetId::new("USDC");
        let json = serde_json::to_string(&asset).unwrap();
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, back);
    }
}
