//! Settlement state machine.
//!
//! Every entry point is permissionless: anyone may call anything at any time.
//! Authority is checked against data stored in the record itself (the
//! releaser) or against the access policy (pause), never at creation.
//!
//! Each transition:
//! 1. Validates every precondition before touching state
//! 2. Mutates the record in place
//! 3. Moves assets through the [`AssetTransfer`] collaborator
//! 4. Appends one event to the log
//!
//! A transition either completes fully or fails with no visible effect.
//! Finalization flips `finalized` *before* paying out, and on any payout
//! failure restores both the record and the asset book.

use custodian_types::{
    AccessPolicy, AccountId, CallContext, CustodianError, Disposition, FeePolicy, LedgerConfig,
    LedgerEvent, Result, Settlement, SettlementId, SettlementTerms,
};

use crate::assets::AssetTransfer;
use crate::audit::CustodyAudit;
use crate::event_log::EventLog;
use crate::registry::{RegistrySnapshot, SettlementRegistry};

/// The custody ledger: registry, policies, and event log.
///
/// The asset collaborator is passed into each value-moving call rather than
/// owned, so the same book can back several ledgers or be inspected freely
/// between calls.
pub struct SettlementEngine {
    registry: SettlementRegistry,
    fee: FeePolicy,
    access: AccessPolicy,
    /// Account that holds funded settlements.
    custody: AccountId,
    /// Receives the protocol fee on every finalization.
    fee_sink: AccountId,
    events: EventLog,
}

impl SettlementEngine {
    /// Stand up an empty ledger from a validated config.
    pub fn new(config: &LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(
            SettlementRegistry::new(),
            config.fee_policy()?,
            config.access_policy(),
            config.custody,
            config.fee_sink,
        ))
    }

    /// Resume a ledger from a persisted registry snapshot. The event log
    /// starts empty; events are not part of the persisted state.
    pub fn restore(config: &LedgerConfig, snapshot: RegistrySnapshot) -> Result<Self> {
        config.validate()?;
        let registry = SettlementRegistry::restore(snapshot)?;
        tracing::info!(
            settlements = registry.count(),
            paused = registry.is_paused(),
            state_root = registry.snapshot().state_root_hex(),
            "Ledger restored from snapshot"
        );
        Ok(Self::from_parts(
            registry,
            config.fee_policy()?,
            config.access_policy(),
            config.custody,
            config.fee_sink,
        ))
    }

    #[must_use]
    pub fn from_parts(
        registry: SettlementRegistry,
        fee: FeePolicy,
        access: AccessPolicy,
        custody: AccountId,
        fee_sink: AccountId,
    ) -> Self {
        Self {
            registry,
            fee,
            access,
            custody,
            fee_sink,
            events: EventLog::new(),
        }
    }

    // =================================================================
    // Transitions
    // =================================================================

    /// Register a new settlement. No authorization: the caller need not be
    /// any of the named parties.
    ///
    /// # Errors
    /// - `InvalidExpiry` if a nonzero expiry is not strictly in the future
    /// - `InvalidExpiryAction` if the action does not match the expiry
    /// - `ZeroAmount` if `amount == 0`
    /// - `ImmaterialFee` if the fee on `amount` truncates to zero
    /// - `CustodyParty` if the custody account is named receiver or sender
    pub fn create(&mut self, ctx: &CallContext, terms: SettlementTerms) -> Result<SettlementId> {
        if !terms.expiry_block.is_never() && terms.expiry_block <= ctx.height {
            return Err(CustodianError::InvalidExpiry {
                expiry_block: terms.expiry_block,
                current: ctx.height,
            });
        }
        if !terms.expiry_action.is_valid_for(terms.expiry_block) {
            return Err(CustodianError::InvalidExpiryAction {
                expiry_block: terms.expiry_block,
            });
        }
        if terms.amount == 0 {
            return Err(CustodianError::ZeroAmount);
        }
        if !self.fee.is_material(terms.amount) {
            return Err(CustodianError::ImmaterialFee {
                amount: terms.amount,
                fee_percent: self.fee.percent(),
            });
        }
        if terms.receiver == self.custody || terms.sender == self.custody {
            return Err(CustodianError::CustodyParty {
                account: self.custody,
            });
        }

        let event = LedgerEvent::CreateSettlement {
            id: self.registry.next_id(),
            receiver: terms.receiver,
            sender: terms.sender,
            releaser: terms.releaser,
            amount: terms.amount,
            asset: terms.asset.clone(),
            expiry_block: terms.expiry_block,
            expiry_action: terms.expiry_action,
        };
        let id = self.registry.append(terms);

        tracing::info!(
            settlement = %id,
            proposer = %ctx.caller,
            height = %ctx.height,
            "Settlement created"
        );
        self.events.append(ctx.height, event);
        Ok(id)
    }

    /// Pull the settlement's amount from the caller into custody.
    ///
    /// The caller must have approved the custody account for at least
    /// `amount`. Pausing does not block funding.
    ///
    /// # Errors
    /// - `NotFound` if `id` does not exist
    /// - `AlreadyFunded` if the deposit was already made
    /// - `Transfer` if the collaborator refuses the pull (nothing changes)
    pub fn fund<A: AssetTransfer>(
        &mut self,
        assets: &mut A,
        ctx: &CallContext,
        id: SettlementId,
    ) -> Result<()> {
        let record = self.registry.get(id)?;
        if record.funded {
            return Err(CustodianError::AlreadyFunded(id));
        }
        let asset = record.asset.clone();
        let amount = record.amount;

        assets.transfer_from(&asset, &self.custody, &ctx.caller, &self.custody, amount)?;
        self.registry.get_mut(id)?.funded = true;

        tracing::info!(
            settlement = %id,
            funder = %ctx.caller,
            asset = %asset,
            amount,
            "Settlement funded"
        );
        self.events
            .append(ctx.height, LedgerEvent::Funded { id, asset, amount });
        Ok(())
    }

    /// Pay the receiver, minus the protocol fee. Releaser only.
    ///
    /// # Errors
    /// In check order: `NotFound`, `Unauthorized`, `NotFunded`,
    /// `AlreadyFinalized`, `Paused`, then `Transfer` (fully rolled back).
    pub fn release<A: AssetTransfer>(
        &mut self,
        assets: &mut A,
        ctx: &CallContext,
        id: SettlementId,
    ) -> Result<()> {
        self.authorize_releaser(ctx, id)?;
        self.ensure_finalizable(id)?;
        self.finalize(assets, ctx, id, Disposition::Released)
    }

    /// Return the funds to the sender, minus the protocol fee. Releaser only.
    ///
    /// # Errors
    /// Same as [`SettlementEngine::release`].
    pub fn refund<A: AssetTransfer>(
        &mut self,
        assets: &mut A,
        ctx: &CallContext,
        id: SettlementId,
    ) -> Result<()> {
        self.authorize_releaser(ctx, id)?;
        self.ensure_finalizable(id)?;
        self.finalize(assets, ctx, id, Disposition::Refunded)
    }

    /// Apply the settlement's default action once its deadline is reached.
    /// Anyone may call this; the releaser check does not apply.
    ///
    /// # Errors
    /// In check order: `NotFound`, `NotExpired`, `NotFunded`,
    /// `AlreadyFinalized`, `Paused`, then `Transfer` (fully rolled back).
    pub fn expire<A: AssetTransfer>(
        &mut self,
        assets: &mut A,
        ctx: &CallContext,
        id: SettlementId,
    ) -> Result<()> {
        let record = self.registry.get(id)?;
        let not_expired = CustodianError::NotExpired {
            id,
            expiry_block: record.expiry_block,
            current: ctx.height,
        };
        if !record.is_expired_at(ctx.height) {
            return Err(not_expired);
        }
        let disposition = record.expiry_action.disposition().ok_or(not_expired)?;

        self.ensure_finalizable(id)?;
        tracing::debug!(
            settlement = %id,
            caller = %ctx.caller,
            action = %disposition,
            "Expiry default action triggered"
        );
        self.finalize(assets, ctx, id, disposition)
    }

    /// Flip the emergency pause. Administrator only. Returns the new value.
    ///
    /// # Errors
    /// Returns `Unauthorized` unless the caller is the administrator.
    pub fn toggle_pause(&mut self, ctx: &CallContext) -> Result<bool> {
        let paused = match self.registry.toggle_pause(&ctx.caller, &self.access) {
            Ok(paused) => paused,
            Err(err) => {
                tracing::warn!(caller = %ctx.caller, "Pause toggle rejected: not administrator");
                return Err(err);
            }
        };

        tracing::info!(paused, admin = %ctx.caller, "Emergency pause toggled");
        self.events
            .append(ctx.height, LedgerEvent::PauseToggled { paused });
        Ok(paused)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Look up a settlement.
    pub fn get_settlement(&self, id: SettlementId) -> Result<&Settlement> {
        self.registry.get(id)
    }

    /// Number of settlements ever created.
    #[must_use]
    pub fn get_num_settlements(&self) -> u64 {
        self.registry.count()
    }

    /// Protocol fee percentage.
    #[must_use]
    pub fn fee(&self) -> u8 {
        self.fee.percent()
    }

    /// Whether finalization is currently frozen.
    #[must_use]
    pub fn emergency_pause(&self) -> bool {
        self.registry.is_paused()
    }

    #[must_use]
    pub fn registry(&self) -> &SettlementRegistry {
        &self.registry
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    #[must_use]
    pub fn fee_policy(&self) -> FeePolicy {
        self.fee
    }

    #[must_use]
    pub fn custody(&self) -> AccountId {
        self.custody
    }

    #[must_use]
    pub fn fee_sink(&self) -> AccountId {
        self.fee_sink
    }

    /// Capture the persisted state.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    /// Check custody conservation against `assets`.
    pub fn audit<A: AssetTransfer>(&self, assets: &A) -> Result<()> {
        CustodyAudit::verify(&self.registry, assets, &self.custody)
    }

    // =================================================================
    // Internals
    // =================================================================

    fn authorize_releaser(&self, ctx: &CallContext, id: SettlementId) -> Result<()> {
        let record = self.registry.get(id)?;
        if ctx.caller != record.releaser {
            tracing::warn!(
                settlement = %id,
                caller = %ctx.caller,
                "Finalization rejected: caller is not the releaser"
            );
            return Err(CustodianError::Unauthorized { caller: ctx.caller });
        }
        Ok(())
    }

    fn ensure_finalizable(&self, id: SettlementId) -> Result<()> {
        let record = self.registry.get(id)?;
        if !record.funded {
            return Err(CustodianError::NotFunded(id));
        }
        if record.finalized {
            return Err(CustodianError::AlreadyFinalized(id));
        }
        self.registry.ensure_unpaused()
    }

    /// Checkpoint, disburse, and either commit or restore.
    fn finalize<A: AssetTransfer>(
        &mut self,
        assets: &mut A,
        ctx: &CallContext,
        id: SettlementId,
        disposition: Disposition,
    ) -> Result<()> {
        let checkpoint = self.registry.get(id)?.clone();
        let savepoint = assets.savepoint();

        let (principal, fee) = match self.disburse(assets, &checkpoint, disposition) {
            Ok(split) => split,
            Err(err) => {
                tracing::debug!(settlement = %id, "Restoring asset savepoint");
                assets.rollback_to(savepoint);
                self.registry.restore_record(checkpoint)?;
                tracing::warn!(
                    settlement = %id,
                    action = %disposition,
                    error = %err,
                    "Finalization rolled back"
                );
                return Err(err);
            }
        };

        tracing::info!(
            settlement = %id,
            action = %disposition,
            payee = %checkpoint.payee(disposition),
            principal,
            fee,
            "Settlement finalized"
        );
        let event = match disposition {
            Disposition::Released => LedgerEvent::Release { id },
            Disposition::Refunded => LedgerEvent::Refund { id },
        };
        self.events.append(ctx.height, event);
        Ok(())
    }

    /// Mark terminal, push principal and fee out of custody, zero the amount.
    /// Leaves partial effects on error; the caller restores them.
    fn disburse<A: AssetTransfer>(
        &mut self,
        assets: &mut A,
        record: &Settlement,
        disposition: Disposition,
    ) -> Result<(u128, u128)> {
        {
            let live = self.registry.get_mut(record.id)?;
            live.finalized = true;
            live.outcome = Some(disposition);
        }

        let (principal, fee) = self.fee.split(record.amount);
        let payee = record.payee(disposition);
        assets.transfer(&record.asset, &self.custody, &payee, principal)?;
        assets.transfer(&record.asset, &self.custody, &self.fee_sink, fee)?;

        self.registry.get_mut(record.id)?.amount = 0;
        Ok((principal, fee))
    }
}
