//! Configuration for a Custodian ledger instance.

use serde::{Deserialize, Serialize};

use crate::{AccessPolicy, AccountId, CustodianError, FeePolicy, Result, constants};

/// Everything needed to stand up one ledger instance.
///
/// Identities are hex-encoded 32-byte account ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Protocol fee percentage in `[0, 100]`. Fixed for the instance's lifetime.
    #[serde(default = "default_fee_percent")]
    pub fee_percent: u8,
    /// Holder of the administrator role (the deploying identity).
    pub admin: AccountId,
    /// Receives the protocol's cut on every finalization.
    pub fee_sink: AccountId,
    /// The neutral account that holds funded settlements.
    pub custody: AccountId,
    /// Bounded mailbox size for the ledger actor.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

fn default_fee_percent() -> u8 {
    constants::DEFAULT_FEE_PERCENT
}

fn default_mailbox_capacity() -> usize {
    constants::DEFAULT_MAILBOX_CAPACITY
}

impl LedgerConfig {
    /// Config with default fee and mailbox settings.
    #[must_use]
    pub fn new(admin: AccountId, fee_sink: AccountId, custody: AccountId) -> Self {
        Self {
            fee_percent: constants::DEFAULT_FEE_PERCENT,
            admin,
            fee_sink,
            custody,
            mailbox_capacity: constants::DEFAULT_MAILBOX_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_fee_percent(mut self, fee_percent: u8) -> Self {
        self.fee_percent = fee_percent;
        self
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CustodianError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// - `InvalidFeePercent` if `fee_percent > 100`
    /// - `Configuration` if custody coincides with the fee sink, or the mailbox is empty
    pub fn validate(&self) -> Result<()> {
        FeePolicy::new(self.fee_percent)?;
        if self.custody == self.fee_sink {
            return Err(CustodianError::Configuration(
                "custody account must differ from the fee sink".into(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(CustodianError::Configuration(
                "mailbox_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn fee_policy(&self) -> Result<FeePolicy> {
        FeePolicy::new(self.fee_percent)
    }

    #[must_use]
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.admin)
    }
}
