//! The asset-transfer collaborator.
//!
//! The ledger never keeps balances itself. It calls into an [`AssetTransfer`]
//! implementation once to pull a deposit into custody and twice to push each
//! finalization out (payee, then fee sink).
//!
//! Every individual call is all-or-nothing: a failed transfer returns an
//! error and leaves balances untouched. Savepoints model the substrate's
//! transaction atomicity so a finalization can undo its first payout when
//! the second one fails.

use std::collections::HashMap;

use custodian_types::{AccountId, Amount, AssetId, TransferError};

/// Capability the ledger uses to move fungible assets.
pub trait AssetTransfer {
    /// Opaque restore point for [`AssetTransfer::rollback_to`].
    type Savepoint;

    /// Pull `amount` from `owner` to `to`, spending an allowance `owner`
    /// granted to `spender`.
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Push `amount` from `holder`'s own balance to `to`.
    fn transfer(
        &mut self,
        asset: &AssetId,
        holder: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Current balance of `account` in `asset`.
    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount;

    /// Capture the current state of every balance.
    fn savepoint(&self) -> Self::Savepoint;

    /// Undo everything since `savepoint` was taken.
    fn rollback_to(&mut self, savepoint: Self::Savepoint);
}

/// In-process fungible asset book: balances plus allowances, for any number
/// of assets.
///
/// This is the reference collaborator used by the service and by tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryAssets {
    /// Per-(account, asset) balances.
    balances: HashMap<(AccountId, AssetId), Amount>,
    /// Per-(owner, spender, asset) allowances.
    allowances: HashMap<(AccountId, AccountId, AssetId), Amount>,
}

impl InMemoryAssets {
    /// Create an empty asset book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new units out of thin air.
    ///
    /// # Errors
    /// Returns `Rejected` if the balance would overflow.
    pub fn mint(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let entry = self.balances.entry((*account, asset.clone())).or_default();
        *entry = entry.checked_add(amount).ok_or_else(|| TransferError::Rejected {
            asset: asset.clone(),
            reason: format!("mint overflows balance of {account}"),
        })?;
        Ok(())
    }

    /// Let `spender` pull up to `amount` of `owner`'s `asset`. Replaces any
    /// previous allowance.
    pub fn approve(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        asset: &AssetId,
        amount: Amount,
    ) {
        self.allowances
            .insert((*owner, *spender, asset.clone()), amount);
    }

    /// Remaining allowance from `owner` to `spender`.
    #[must_use]
    pub fn allowance(&self, owner: &AccountId, spender: &AccountId, asset: &AssetId) -> Amount {
        self.allowances
            .get(&(*owner, *spender, asset.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Sum of all balances in `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: &AssetId) -> Amount {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }

    /// Validate then apply a balance move. Nothing changes on error.
    fn move_balance(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: *from,
                asset: asset.clone(),
                needed: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let credited = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected {
                asset: asset.clone(),
                reason: format!("credit overflows balance of {to}"),
            })?;

        self.balances
            .insert((*from, asset.clone()), available - amount);
        self.balances.insert((*to, asset.clone()), credited);
        Ok(())
    }
}

impl AssetTransfer for InMemoryAssets {
    type Savepoint = Self;

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let approved = self.allowance(owner, spender, asset);
        if approved < amount {
            return Err(TransferError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                asset: asset.clone(),
                needed: amount,
                approved,
            });
        }
        self.move_balance(asset, owner, to, amount)?;
        self.allowances
            .insert((*owner, *spender, asset.clone()), approved - amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        holder: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.move_balance(asset, holder, to, amount)
    }

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.balances
            .get(&(*account, asset.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn savepoint(&self) -> Self::Savepoint {
        self.clone()
    }

    fn rollback_to(&mut self, savepoint: Self::Savepoint) {
        *self = savepoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    #[test]
    fn mint_increases_balance() {
        let mut book = InMemoryAssets::new();
        let alice = AccountId::from_label("alice");
        book.mint(&alice, &usdc(), 1_000).unwrap();
        assert_eq!(book.balance_of(&usdc(), &alice), 1_000);
        assert_eq!(book.total_supply(&usdc()), 1_000);
    }

    #[test]
    fn mint_overflow_is_rejected() {
        let mut book = InMemoryAssets::new();
        let alice = AccountId::from_label("alice");
        book.mint(&alice, &usdc(), u128::MAX).unwrap();
        let err = book.mint(&alice, &usdc(), 1).unwrap_err();
        assert!(matches!(err, TransferError::Rejected { .. }));
        assert_eq!(book.balance_of(&usdc(), &alice), u128::MAX);
    }

    #[test]
    fn transfer_moves_balance() {
        let mut book = InMemoryAssets::new();
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");
        book.mint(&alice, &usdc(), 500).unwrap();
        book.transfer(&usdc(), &alice, &bob, 200).unwrap();
        assert_eq!(book.balance_of(&usdc(), &alice), 300);
        assert_eq!(book.balance_of(&usdc(), &bob), 200);
        assert_eq!(book.total_supply(&usdc()), 500);
    }

    #[test]
    fn transfer_insufficient_leaves_balances() {
        let mut book = InMemoryAssets::new();
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");
        book.mint(&alice, &usdc(), 100).unwrap();
        let err = book.transfer(&usdc(), &alice, &bob, 101).unwrap_err();
        assert!(matches!(
            err,
            TransferError::InsufficientBalance {
                needed: 101,
                available: 100,
                ..
            }
        ));
        assert_eq!(book.balance_of(&usdc(), &alice), 100);
        assert_eq!(book.balance_of(&usdc(), &bob), 0);
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let mut book = InMemoryAssets::new();
        let owner = AccountId::from_label("owner");
        let custody = AccountId::from_label("custody");
        book.mint(&owner, &usdc(), 1_000).unwrap();
        book.approve(&owner, &custody, &usdc(), 600);

        book.transfer_from(&usdc(), &custody, &owner, &custody, 400)
            .unwrap();
        assert_eq!(book.balance_of(&usdc(), &owner), 600);
        assert_eq!(book.balance_of(&usdc(), &custody), 400);
        assert_eq!(book.allowance(&owner, &custody, &usdc()), 200);
    }

    #[test]
    fn transfer_from_without_allowance_fails() {
        let mut book = InMemoryAssets::new();
        let owner = AccountId::from_label("owner");
        let custody = AccountId::from_label("custody");
        book.mint(&owner, &usdc(), 1_000).unwrap();
        book.approve(&owner, &custody, &usdc(), 50);

        let err = book
            .transfer_from(&usdc(), &custody, &owner, &custody, 100)
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientAllowance { .. }));
        assert_eq!(book.balance_of(&usdc(), &owner), 1_000);
        assert_eq!(book.allowance(&owner, &custody, &usdc()), 50);
    }

    #[test]
    fn transfer_from_insufficient_balance_keeps_allowance() {
        let mut book = InMemoryAssets::new();
        let owner = AccountId::from_label("owner");
        let custody = AccountId::from_label("custody");
        book.mint(&owner, &usdc(), 10).unwrap();
        book.approve(&owner, &custody, &usdc(), 100);

        let err = book
            .transfer_from(&usdc(), &custody, &owner, &custody, 100)
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientBalance { .. }));
        assert_eq!(book.allowance(&owner, &custody, &usdc()), 100);
    }

    #[test]
    fn rollback_restores_savepoint() {
        let mut book = InMemoryAssets::new();
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");
        book.mint(&alice, &usdc(), 100).unwrap();

        let sp = book.savepoint();
        book.transfer(&usdc(), &alice, &bob, 70).unwrap();
        book.rollback_to(sp);

        assert_eq!(book.balance_of(&usdc(), &alice), 100);
        assert_eq!(book.balance_of(&usdc(), &bob), 0);
    }

    #[test]
    fn assets_are_independent() {
        let mut book = InMemoryAssets::new();
        let alice = AccountId::from_label("alice");
        book.mint(&alice, &usdc(), 5).unwrap();
        book.mint(&alice, &AssetId::new("DAI"), 7).unwrap();
        assert_eq!(book.balance_of(&usdc(), &alice), 5);
        assert_eq!(book.balance_of(&AssetId::new("DAI"), &alice), 7);
    }
}
