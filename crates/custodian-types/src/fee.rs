//! Protocol fee policy.
//!
//! The fee is a whole percentage fixed at construction. It can never be
//! changed afterwards, so parties to an existing settlement know exactly
//! what a finalization will cost.

use serde::{Deserialize, Serialize};

use crate::{Amount, CustodianError, Result, constants};

/// Fixed-percentage fee schedule applied on every finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    percent: u8,
}

impl FeePolicy {
    /// Create a policy charging `percent`% of every finalized amount.
    ///
    /// # Errors
    /// Returns [`CustodianError::InvalidFeePercent`] if `percent > 100`.
    pub fn new(percent: u8) -> Result<Self> {
        if percent > constants::MAX_FEE_PERCENT {
            return Err(CustodianError::InvalidFeePercent(percent));
        }
        Ok(Self { percent })
    }

    /// The configured percentage.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// `amount * percent / 100`, truncated.
    ///
    /// Evaluated as `(amount / 100) * percent + (amount % 100) * percent / 100`,
    /// which is exact and cannot overflow for any `u128` amount.
    #[must_use]
    pub fn compute_fee(&self, amount: Amount) -> Amount {
        let percent = Amount::from(self.percent);
        let whole = amount / constants::FEE_DENOMINATOR;
        let rest = amount % constants::FEE_DENOMINATOR;
        whole * percent + rest * percent / constants::FEE_DENOMINATOR
    }

    /// Split `amount` into `(principal, fee)`. The truncation remainder stays
    /// with the principal, so `principal + fee == amount` always.
    #[must_use]
    pub fn split(&self, amount: Amount) -> (Amount, Amount) {
        let fee = self.compute_fee(amount);
        (amount - fee, fee)
    }

    /// Whether the fee on `amount` is a nonzero, collectible quantity.
    #[must_use]
    pub fn is_material(&self, amount: Amount) -> bool {
        self.compute_fee(amount) > 0
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            percent: constants::DEFAULT_FEE_PERCENT,
        }
    }
}
