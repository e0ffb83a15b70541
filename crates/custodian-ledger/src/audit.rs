//! Custody conservation invariant checker.
//!
//! Invariant enforced between calls:
//! ```text
//! ∀ asset: balance_of(custody, asset) == Σ amount  over funded ∧ ¬finalized settlements of asset
//! ```
//!
//! Funding moves exactly `amount` into custody; finalization moves exactly
//! `amount` out (principal plus fee). If the two ever disagree, funds were
//! lost or created somewhere.

use std::collections::BTreeMap;

use custodian_types::{AccountId, Amount, AssetId, CustodianError, Result};

use crate::assets::AssetTransfer;
use crate::registry::SettlementRegistry;

/// Compares what the registry says is in custody against the asset book.
pub struct CustodyAudit;

impl CustodyAudit {
    /// Expected custody balance per asset, from live settlements.
    ///
    /// Assets whose settlements are all finalized map to zero.
    ///
    /// # Errors
    /// Returns [`CustodianError::CustodyInvariantViolation`] if the live
    /// total of an asset does not fit in an [`Amount`].
    pub fn expected_custody(registry: &SettlementRegistry) -> Result<BTreeMap<AssetId, Amount>> {
        let mut expected: BTreeMap<AssetId, Amount> = BTreeMap::new();
        for record in registry.iter() {
            let entry = expected.entry(record.asset.clone()).or_default();
            if record.is_live() {
                *entry = entry.checked_add(record.amount).ok_or_else(|| {
                    CustodianError::CustodyInvariantViolation {
                        reason: format!(
                            "Asset {}: live settlements overflow at {}",
                            record.asset, record.id
                        ),
                    }
                })?;
            }
        }
        Ok(expected)
    }

    /// Verify the invariant for every asset the registry has seen.
    ///
    /// # Errors
    /// Returns [`CustodianError::CustodyInvariantViolation`] on the first
    /// asset whose custody balance differs from the expected total.
    pub fn verify<A: AssetTransfer>(
        registry: &SettlementRegistry,
        assets: &A,
        custody: &AccountId,
    ) -> Result<()> {
        for (asset, expected) in Self::expected_custody(registry)? {
            let actual = assets.balance_of(&asset, custody);
            if actual != expected {
                return Err(CustodianError::CustodyInvariantViolation {
                    reason: format!(
                        "Asset {asset}: custody {custody} holds {actual}, live settlements total {expected}"
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::InMemoryAssets;
    use custodian_types::SettlementTerms;

    fn terms(asset: &str, amount: Amount) -> SettlementTerms {
        SettlementTerms::new(
            AccountId::from_label("receiver"),
            AccountId::from_label("sender"),
            AccountId::from_label("releaser"),
            amount,
            AssetId::new(asset),
        )
    }

    #[test]
    fn empty_registry_passes() {
        let reg = SettlementRegistry::new();
        let book = InMemoryAssets::new();
        assert!(CustodyAudit::expected_custody(&reg).unwrap().is_empty());
        assert!(CustodyAudit::verify(&reg, &book, &AccountId::from_label("custody")).is_ok());
    }

    #[test]
    fn unfunded_settlements_expect_nothing() {
        let mut reg = SettlementRegistry::new();
        reg.append(terms("USDC", 100));
        let expected = CustodyAudit::expected_custody(&reg).unwrap();
        assert_eq!(expected.get(&AssetId::new("USDC")), Some(&0));
    }

    #[test]
    fn live_settlements_sum_per_asset() {
        let mut reg = SettlementRegistry::new();
        let a = reg.append(terms("USDC", 100));
        let b = reg.append(terms("USDC", 250));
        let c = reg.append(terms("DAI", 40));
        for id in [a, b, c] {
            reg.get_mut(id).unwrap().funded = true;
        }
        let expected = CustodyAudit::expected_custody(&reg).unwrap();
        assert_eq!(expected[&AssetId::new("USDC")], 350);
        assert_eq!(expected[&AssetId::new("DAI")], 40);
    }

    #[test]
    fn mismatch_is_reported() {
        let custody = AccountId::from_label("custody");
        let mut reg = SettlementRegistry::new();
        let id = reg.append(terms("USDC", 100));
        reg.get_mut(id).unwrap().funded = true;

        let mut book = InMemoryAssets::new();
        book.mint(&custody, &AssetId::new("USDC"), 99).unwrap();
        let err = CustodyAudit::verify(&reg, &book, &custody).unwrap_err();
        assert!(matches!(
            err,
            CustodianError::CustodyInvariantViolation { .. }
        ));

        book.mint(&custody, &AssetId::new("USDC"), 1).unwrap();
        assert!(CustodyAudit::verify(&reg, &book, &custody).is_ok());
    }

    #[test]
    fn overflowing_live_total_is_reported() {
        let mut reg = SettlementRegistry::new();
        for _ in 0..2 {
            let id = reg.append(terms("USDC", u128::MAX / 2 + 1));
            reg.get_mut(id).unwrap().funded = true;
        }
        let err = CustodyAudit::expected_custody(&reg).unwrap_err();
        assert!(matches!(
            err,
            CustodianError::CustodyInvariantViolation { .. }
        ));

        let book = InMemoryAssets::new();
        let custody = AccountId::from_label("custody");
        assert!(CustodyAudit::verify(&reg, &book, &custody).is_err());
    }
}
