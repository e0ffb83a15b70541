//! Access policy: a single administrator role.
//!
//! The administrator is the deploying identity. The role gates only the
//! emergency pause; it has no say over individual settlements.

use serde::{Deserialize, Serialize};

use crate::{AccountId, CustodianError, Result};

/// Binary role check for the administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    admin: AccountId,
}

impl AccessPolicy {
    /// Grant the administrator role to `admin`.
    #[must_use]
    pub fn new(admin: AccountId) -> Self {
        Self { admin }
    }

    #[must_use]
    pub fn is_admin(&self, identity: &AccountId) -> bool {
        self.admin == *identity
    }

    #[must_use]
    pub fn admin(&self) -> AccountId {
        self.admin
    }

    /// Guard an administrative call.
    ///
    /// # Errors
    /// Returns [`CustodianError::Unauthorized`] if `caller` is not the administrator.
    pub fn require_admin(&self, caller: &AccountId) -> Result<()> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err(CustodianError::Unauthorized { caller: *caller })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_passes() {
        let admin = AccountId::from_label("admin");
        let other = AccountId::from_label("other");
        let policy = AccessPolicy::new(admin);

        assert!(policy.is_admin(&admin));
        assert!(!policy.is_admin(&other));
        assert!(policy.require_admin(&admin).is_ok());
        assert_eq!(
            policy.require_admin(&other).unwrap_err(),
            CustodianError::Unauthorized { caller: other }
        );
    }
}
