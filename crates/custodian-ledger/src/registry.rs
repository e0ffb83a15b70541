//! Settlement registry: the append-only arena of settlement records.
//!
//! Records are addressed by dense index. Creation appends; nothing is ever
//! removed or reordered, so a finalized record stays queryable forever.
//! The registry also owns the global emergency-pause flag.
//!
//! The whole registry is a flat sequence of fixed-shape records plus one
//! boolean, captured by [`RegistrySnapshot`] for persistence and replay.

use custodian_types::{
    AccessPolicy, AccountId, CustodianError, Result, Settlement, SettlementId, SettlementTerms,
    constants,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Owner of every settlement record and the pause flag.
#[derive(Debug, Clone, Default)]
pub struct SettlementRegistry {
    /// Records in creation order; `records[i].id == SettlementId(i)`.
    records: Vec<Settlement>,
    /// When set, finalization is frozen system-wide.
    paused: bool,
}

impl SettlementRegistry {
    /// Create an empty, unpaused registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh record built from `terms` and return its index.
    pub fn append(&mut self, terms: SettlementTerms) -> SettlementId {
        let id = self.next_id();
        self.records.push(Settlement::from_terms(id, terms));
        id
    }

    /// Look up a record.
    ///
    /// # Errors
    /// Returns [`CustodianError::NotFound`] if `id` is out of range.
    pub fn get(&self, id: SettlementId) -> Result<&Settlement> {
        id.index()
            .and_then(|i| self.records.get(i))
            .ok_or(CustodianError::NotFound(id))
    }

    /// Mutable lookup, reserved for the state machine.
    pub(crate) fn get_mut(&mut self, id: SettlementId) -> Result<&mut Settlement> {
        id.index()
            .and_then(|i| self.records.get_mut(i))
            .ok_or(CustodianError::NotFound(id))
    }

    /// Put back a record captured before a failed transition.
    pub(crate) fn restore_record(&mut self, checkpoint: Settlement) -> Result<()> {
        let slot = self.get_mut(checkpoint.id)?;
        *slot = checkpoint;
        Ok(())
    }

    /// Number of records ever created.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.records.len() as u64
    }

    /// Index the next `append` will assign.
    #[must_use]
    pub fn next_id(&self) -> SettlementId {
        SettlementId(self.count())
    }

    /// Iterate over every record in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Settlement> {
        self.records.iter()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Flip the pause flag. Returns the new value.
    ///
    /// # Errors
    /// Returns [`CustodianError::Unauthorized`] unless `caller` is the administrator.
    pub fn toggle_pause(&mut self, caller: &AccountId, access: &AccessPolicy) -> Result<bool> {
        access.require_admin(caller)?;
        self.paused = !self.paused;
        Ok(self.paused)
    }

    /// Guard a finalization attempt.
    ///
    /// # Errors
    /// Returns [`CustodianError::Paused`] while the pause flag is set.
    pub fn ensure_unpaused(&self) -> Result<()> {
        if self.paused {
            Err(CustodianError::Paused)
        } else {
            Ok(())
        }
    }

    /// Capture the full persisted state.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            settlements: self.records.clone(),
            paused: self.paused,
        }
    }

    /// Rebuild a registry from a snapshot.
    ///
    /// # Errors
    /// Returns [`CustodianError::CorruptSnapshot`] if indices are not dense or
    /// any record breaks a lifecycle invariant.
    pub fn restore(snapshot: RegistrySnapshot) -> Result<Self> {
        for (index, record) in snapshot.settlements.iter().enumerate() {
            if record.id.index() != Some(index) {
                return Err(CustodianError::CorruptSnapshot {
                    reason: format!("{} stored at index {index}", record.id),
                });
            }
            record.check_invariants()?;
        }
        Ok(Self {
            records: snapshot.settlements,
            paused: snapshot.paused,
        })
    }
}

/// Serializable image of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub settlements: Vec<Settlement>,
    pub paused: bool,
}

impl RegistrySnapshot {
    /// SHA-256 commitment to every record and the pause flag.
    ///
    /// `SHA-256(domain_sep || count || for each record: canonical_bytes || paused)`
    #[must_use]
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::STATE_ROOT_DOMAIN);
        hasher.update((self.settlements.len() as u64).to_le_bytes());
        for record in &self.settlements {
            hasher.update(record.canonical_bytes());
        }
        hasher.update([u8::from(self.paused)]);
        hasher.finalize().into()
    }

    /// Hex rendering of [`RegistrySnapshot::state_root`], for logs.
    #[must_use]
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodian_types::{AssetId, Disposition};

    fn terms(amount: u128) -> SettlementTerms {
        SettlementTerms::new(
            AccountId::from_label("receiver"),
            AccountId::from_label("sender"),
            AccountId::from_label("releaser"),
            amount,
            AssetId::new("USDC"),
        )
    }

    #[test]
    fn append_assigns_dense_ids() {
        let mut reg = SettlementRegistry::new();
        assert_eq!(reg.count(), 0);
        let a = reg.append(terms(100));
        let b = reg.append(terms(200));
        assert_eq!(a, SettlementId(0));
        assert_eq!(b, SettlementId(1));
        assert_eq!(reg.count(), 2);
        assert_eq!(reg.get(b).unwrap().amount, 200);
        assert_eq!(reg.next_id(), SettlementId(2));
    }

    #[test]
    fn get_out_of_range_is_not_found() {
        let reg = SettlementRegistry::new();
        assert_eq!(
            reg.get(SettlementId(0)).unwrap_err(),
            CustodianError::NotFound(SettlementId(0))
        );
    }

    #[test]
    fn toggle_pause_requires_admin() {
        let admin = AccountId::from_label("admin");
        let access = AccessPolicy::new(admin);
        let mut reg = SettlementRegistry::new();
        assert!(!reg.is_paused());
        assert!(reg.ensure_unpaused().is_ok());

        let err = reg
            .toggle_pause(&AccountId::from_label("intruder"), &access)
            .unwrap_err();
        assert!(matches!(err, CustodianError::Unauthorized { .. }));
        assert!(!reg.is_paused());

        assert!(reg.toggle_pause(&admin, &access).unwrap());
        assert_eq!(reg.ensure_unpaused().unwrap_err(), CustodianError::Paused);
        assert!(!reg.toggle_pause(&admin, &access).unwrap());
    }

    #[test]
    fn restore_record_rewinds_mutation() {
        let mut reg = SettlementRegistry::new();
        let id = reg.append(terms(100));
        let checkpoint = reg.get(id).unwrap().clone();
        reg.get_mut(id).unwrap().funded = true;
        reg.restore_record(checkpoint.clone()).unwrap();
        assert_eq!(reg.get(id).unwrap(), &checkpoint);
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut reg = SettlementRegistry::new();
        reg.append(terms(100));
        reg.append(terms(300));
        let admin = AccountId::from_label("admin");
        reg.toggle_pause(&admin, &AccessPolicy::new(admin)).unwrap();

        let snap = reg.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: RegistrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.state_root(), snap.state_root());

        let restored = SettlementRegistry::restore(back).unwrap();
        assert_eq!(restored.count(), 2);
        assert!(restored.is_paused());
        assert_eq!(restored.snapshot(), snap);
    }

    #[test]
    fn restore_rejects_sparse_ids() {
        let mut snap = RegistrySnapshot {
            settlements: vec![Settlement::dummy(SettlementId(0))],
            paused: false,
        };
        snap.settlements.push(Settlement::dummy(SettlementId(5)));
        let err = SettlementRegistry::restore(snap).unwrap_err();
        assert!(matches!(err, CustodianError::CorruptSnapshot { .. }));
    }

    #[test]
    fn restore_rejects_broken_invariant() {
        let mut record = Settlement::dummy(SettlementId(0));
        record.funded = true;
        record.finalized = true;
        record.outcome = Some(Disposition::Released);
        // amount left nonzero
        let snap = RegistrySnapshot {
            settlements: vec![record],
            paused: false,
        };
        assert!(matches!(
            SettlementRegistry::restore(snap).unwrap_err(),
            CustodianError::CorruptSnapshot { .. }
        ));
    }

    #[test]
    fn state_root_changes_with_pause_and_records() {
        let mut reg = SettlementRegistry::new();
        let empty = reg.snapshot().state_root();
        reg.append(terms(100));
        let one = reg.snapshot().state_root();
        assert_ne!(empty, one);

        let admin = AccountId::from_label("admin");
        reg.toggle_pause(&admin, &AccessPolicy::new(admin)).unwrap();
        assert_ne!(one, reg.snapshot().state_root());
        assert_eq!(reg.snapshot().state_root_hex().len(), 64);
    }
}
