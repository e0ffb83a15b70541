//! Single-writer actor serving the ledger to concurrent callers.
//!
//! The engine and the asset book live inside one tokio task. Every call,
//! mutating or not, is a message on a bounded mailbox, so transitions are
//! applied strictly one at a time in arrival order and never interleave.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   Callers (any number of tasks)             │
//! └──────────────────────┬──────────────────────┘
//!                        │ LedgerHandle (Clone)
//!                        ▼ mpsc::channel (bounded)
//! ┌─────────────────────────────────────────────┐
//! │   LedgerActor (single task)                 │
//! │     SettlementEngine + AssetTransfer        │
//! └──────────────────────┬──────────────────────┘
//!                        │ oneshot reply
//!                        ▼
//!                     caller
//! ```

use custodian_ledger::{AssetTransfer, EventRecord, RegistrySnapshot, SettlementEngine};
use custodian_types::{
    CallContext, CustodianError, LedgerConfig, Result, Settlement, SettlementId, SettlementTerms,
    constants,
};
use tokio::sync::{mpsc, oneshot};

/// Closure run against the asset book inside the actor.
pub type AssetJob<A> = Box<dyn FnOnce(&mut A) + Send>;

/// Message sent to the ledger actor.
pub enum LedgerMessage<A> {
    Create {
        ctx: CallContext,
        terms: SettlementTerms,
        response: oneshot::Sender<Result<SettlementId>>,
    },
    Fund {
        ctx: CallContext,
        id: SettlementId,
        response: oneshot::Sender<Result<()>>,
    },
    Release {
        ctx: CallContext,
        id: SettlementId,
        response: oneshot::Sender<Result<()>>,
    },
    Refund {
        ctx: CallContext,
        id: SettlementId,
        response: oneshot::Sender<Result<()>>,
    },
    Expire {
        ctx: CallContext,
        id: SettlementId,
        response: oneshot::Sender<Result<()>>,
    },
    TogglePause {
        ctx: CallContext,
        response: oneshot::Sender<Result<bool>>,
    },

    GetSettlement {
        id: SettlementId,
        response: oneshot::Sender<Result<Settlement>>,
    },
    GetNumSettlements {
        response: oneshot::Sender<u64>,
    },
    Fee {
        response: oneshot::Sender<u8>,
    },
    EmergencyPause {
        response: oneshot::Sender<bool>,
    },
    EventsSince {
        sequence: u64,
        response: oneshot::Sender<Vec<EventRecord>>,
    },
    Snapshot {
        response: oneshot::Sender<RegistrySnapshot>,
    },
    Audit {
        response: oneshot::Sender<Result<()>>,
    },

    /// Run a closure against the asset book between transitions.
    WithAssets { job: AssetJob<A> },

    /// Stop the actor after the messages already queued ahead of this one.
    Shutdown,
}

/// Actor that owns the engine and the asset book.
pub struct LedgerActor<A> {
    engine: SettlementEngine,
    assets: A,
    mailbox: mpsc::Receiver<LedgerMessage<A>>,
}

impl<A: AssetTransfer> LedgerActor<A> {
    pub fn new(
        engine: SettlementEngine,
        assets: A,
        mailbox: mpsc::Receiver<LedgerMessage<A>>,
    ) -> Self {
        Self {
            engine,
            assets,
            mailbox,
        }
    }

    /// Run the actor event loop until `Shutdown` or every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            settlements = self.engine.get_num_settlements(),
            fee_percent = self.engine.fee(),
            custody = %self.engine.custody(),
            "Ledger actor started"
        );

        while let Some(msg) = self.mailbox.recv().await {
            if matches!(msg, LedgerMessage::Shutdown) {
                break;
            }
            self.handle_message(msg);
        }

        tracing::info!(
            settlements = self.engine.get_num_settlements(),
            events = self.engine.events().len(),
            state_root = self.engine.snapshot().state_root_hex(),
            "Ledger actor stopped"
        );
    }

    fn handle_message(&mut self, msg: LedgerMessage<A>) {
        let engine = &mut self.engine;
        let assets = &mut self.assets;
        match msg {
            LedgerMessage::Create {
                ctx,
                terms,
                response,
            } => reply(response, engine.create(&ctx, terms)),
            LedgerMessage::Fund { ctx, id, response } => {
                reply(response, engine.fund(assets, &ctx, id));
            }
            LedgerMessage::Release { ctx, id, response } => {
                reply(response, engine.release(assets, &ctx, id));
            }
            LedgerMessage::Refund { ctx, id, response } => {
                reply(response, engine.refund(assets, &ctx, id));
            }
            LedgerMessage::Expire { ctx, id, response } => {
                reply(response, engine.expire(assets, &ctx, id));
            }
            LedgerMessage::TogglePause { ctx, response } => {
                reply(response, engine.toggle_pause(&ctx));
            }

            LedgerMessage::GetSettlement { id, response } => {
                reply(response, engine.get_settlement(id).cloned());
            }
            LedgerMessage::GetNumSettlements { response } => {
                reply(response, engine.get_num_settlements());
            }
            LedgerMessage::Fee { response } => reply(response, engine.fee()),
            LedgerMessage::EmergencyPause { response } => {
                reply(response, engine.emergency_pause());
            }
            LedgerMessage::EventsSince { sequence, response } => {
                reply(response, engine.events().since(sequence).to_vec());
            }
            LedgerMessage::Snapshot { response } => reply(response, engine.snapshot()),
            LedgerMessage::Audit { response } => reply(response, engine.audit(&*assets)),

            LedgerMessage::WithAssets { job } => job(assets),

            // Handled in the run loop
            LedgerMessage::Shutdown => {}
        }
    }
}

fn reply<T>(response: oneshot::Sender<T>, value: T) {
    if response.send(value).is_err() {
        tracing::error!("Caller dropped before the ledger reply was delivered");
    }
}

fn mailbox_closed() -> CustodianError {
    CustodianError::ServiceUnavailable("Ledger mailbox closed".to_string())
}

/// Cloneable handle for sending messages to the actor.
pub struct LedgerHandle<A> {
    sender: mpsc::Sender<LedgerMessage<A>>,
}

impl<A> Clone for LedgerHandle<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A: AssetTransfer + Send + 'static> LedgerHandle<A> {
    pub fn new(sender: mpsc::Sender<LedgerMessage<A>>) -> Self {
        Self { sender }
    }

    /// Send one message and wait for its reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage<A>,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| mailbox_closed())?;
        rx.await.map_err(|_| {
            CustodianError::ServiceUnavailable("Ledger reply channel closed".to_string())
        })
    }

    // -----------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------

    pub async fn create(&self, ctx: CallContext, terms: SettlementTerms) -> Result<SettlementId> {
        self.request(|response| LedgerMessage::Create {
            ctx,
            terms,
            response,
        })
        .await?
    }

    pub async fn fund(&self, ctx: CallContext, id: SettlementId) -> Result<()> {
        self.request(|response| LedgerMessage::Fund { ctx, id, response })
            .await?
    }

    pub async fn release(&self, ctx: CallContext, id: SettlementId) -> Result<()> {
        self.request(|response| LedgerMessage::Release { ctx, id, response })
            .await?
    }

    pub async fn refund(&self, ctx: CallContext, id: SettlementId) -> Result<()> {
        self.request(|response| LedgerMessage::Refund { ctx, id, response })
            .await?
    }

    pub async fn expire(&self, ctx: CallContext, id: SettlementId) -> Result<()> {
        self.request(|response| LedgerMessage::Expire { ctx, id, response })
            .await?
    }

    pub async fn toggle_pause(&self, ctx: CallContext) -> Result<bool> {
        self.request(|response| LedgerMessage::TogglePause { ctx, response })
            .await?
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub async fn get_settlement(&self, id: SettlementId) -> Result<Settlement> {
        self.request(|response| LedgerMessage::GetSettlement { id, response })
            .await?
    }

    pub async fn get_num_settlements(&self) -> Result<u64> {
        self.request(|response| LedgerMessage::GetNumSettlements { response })
            .await
    }

    pub async fn fee(&self) -> Result<u8> {
        self.request(|response| LedgerMessage::Fee { response }).await
    }

    pub async fn emergency_pause(&self) -> Result<bool> {
        self.request(|response| LedgerMessage::EmergencyPause { response })
            .await
    }

    /// Committed events from `sequence` onwards.
    pub async fn events_since(&self, sequence: u64) -> Result<Vec<EventRecord>> {
        self.request(|response| LedgerMessage::EventsSince { sequence, response })
            .await
    }

    pub async fn snapshot(&self) -> Result<RegistrySnapshot> {
        self.request(|response| LedgerMessage::Snapshot { response })
            .await
    }

    /// Run the custody conservation check inside the actor.
    pub async fn audit(&self) -> Result<()> {
        self.request(|response| LedgerMessage::Audit { response })
            .await?
    }

    /// Run `f` against the asset book and return its result. Queued like
    /// any other message, so it never observes a transition half-applied.
    pub async fn with_assets<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut A) -> R + Send + 'static,
    {
        self.request(|response| LedgerMessage::WithAssets {
            job: Box::new(move |assets: &mut A| {
                reply(response, f(assets));
            }),
        })
        .await
    }

    /// Ask the actor to stop once the messages ahead of this one are done.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| mailbox_closed())
    }
}

/// Spawn an actor over a fresh ledger. Must be called inside a tokio runtime.
pub fn spawn_ledger<A>(config: &LedgerConfig, assets: A) -> Result<LedgerHandle<A>>
where
    A: AssetTransfer + Send + 'static,
{
    let engine = SettlementEngine::new(config)?;
    Ok(spawn_engine(engine, assets, config.mailbox_capacity))
}

/// Spawn an actor over a ledger resumed from `snapshot`.
pub fn spawn_restored<A>(
    config: &LedgerConfig,
    snapshot: RegistrySnapshot,
    assets: A,
) -> Result<LedgerHandle<A>>
where
    A: AssetTransfer + Send + 'static,
{
    let engine = SettlementEngine::restore(config, snapshot)?;
    Ok(spawn_engine(engine, assets, config.mailbox_capacity))
}

fn spawn_engine<A>(engine: SettlementEngine, assets: A, capacity: usize) -> LedgerHandle<A>
where
    A: AssetTransfer + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let actor = LedgerActor::new(engine, assets, rx);
    tokio::spawn(actor.run());
    LedgerHandle::new(tx)
}
