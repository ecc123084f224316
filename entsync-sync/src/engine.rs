//! Sync engine: routes request actions to their handlers.
//!
//! Every dispatched request runs as its own tokio task. There is no
//! concurrency limit and no ordering between tasks; two saves of the same
//! record may race. Everything a handler emits goes through the engine:
//! replies are applied to the record store, every item is broadcast to
//! subscribers, and follow-up requests (chained saves, trailing removes)
//! are dispatched like any other action.

use crate::error::{SyncError, SyncResult};
use crate::handlers::{Context, fetch, remove, save, undo};
use crate::intent::{Emitted, Emitter};
use crate::remote::RemoteStore;
use crate::store::RecordStore;
use async_trait::async_trait;
use entsync_model::EntitySchema;
use entsync_types::{Action, Verb};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tracing::debug;

/// Default undo window offered after a soft delete, in seconds.
pub const DEFAULT_UNDO_WINDOW_SECS: u64 = 15;

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long the host should offer an undo after a soft delete.
    pub undo_window_secs: u64,
    /// Buffer of the subscriber channel. Slow subscribers miss items past it.
    pub event_capacity: usize,
    /// Channels the engine knows about.
    pub schemas: Vec<EntitySchema>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            undo_window_secs: DEFAULT_UNDO_WINDOW_SECS,
            event_capacity: 256,
            schemas: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Registers a channel.
    pub fn with_schema(mut self, schema: EntitySchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// The schema registered for `channel`.
    pub fn schema(&self, channel: &str) -> Option<&EntitySchema> {
        self.schemas.iter().find(|s| s.channel == channel)
    }
}

/// Hands one request to the handler for its verb.
pub async fn route(ctx: &Context, action: &Action) {
    match action.verb() {
        Verb::Fetch => fetch::handle(ctx, action).await,
        Verb::Save => save::handle(ctx, action).await,
        Verb::Remove => remove::handle(ctx, action).await,
        Verb::RemoveWithUndo => undo::remove_with_undo(ctx, action).await,
        Verb::UndoRemove => undo::undo_remove(ctx, action).await,
    }
}

/// The sync engine.
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: Context,
    events: broadcast::Sender<Emitted>,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl SyncEngine {
    /// Creates an engine over a record store and a remote store.
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| Inner {
            ctx: Context::new(
                config,
                store,
                remote,
                Arc::new(EngineEmitter {
                    inner: weak.clone(),
                }),
            ),
            events,
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        });
        Self { inner }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.ctx.config
    }

    /// Returns the record store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.inner.ctx.store
    }

    /// Subscribes to everything handlers emit, in emission order.
    pub fn subscribe(&self) -> broadcast::Receiver<Emitted> {
        self.inner.events.subscribe()
    }

    /// Starts handling a request action.
    ///
    /// Returns the handle of the task running the handler. Follow-up
    /// requests it dispatches run in tasks of their own; use
    /// [`SyncEngine::wait_idle`] to wait for those too.
    pub fn dispatch(&self, action: Action) -> SyncResult<JoinHandle<()>> {
        if !action.action_type.is_request() {
            return Err(SyncError::NotRoutable(action.action_type.to_string()));
        }
        Ok(self.inner.spawn(action))
    }

    /// Number of handler tasks still running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until no handler task is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Inner {
    fn spawn(self: &Arc<Self>, action: Action) -> JoinHandle<()> {
        debug!("Dispatching {} for {}", action.action_type, action.payload.key);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(self));
        tokio::spawn(async move {
            route(&guard.0.ctx, &action).await;
            drop(guard);
        })
    }
}

/// Counts one running handler task. Released on completion and on panic.
struct InFlight(Arc<Inner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Emitter handed to handlers. Applies replies, broadcasts every item and
/// dispatches follow-up requests.
struct EngineEmitter {
    inner: Weak<Inner>,
}

#[async_trait]
impl Emitter for EngineEmitter {
    async fn emit(&self, item: Emitted) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        let follow_up = match &item {
            Emitted::Action(action) if action.action_type.is_request() => Some(action.clone()),
            Emitted::Action(action) => {
                inner.ctx.store.apply(action).await;
                None
            }
            Emitted::Notification(_) | Emitted::Form(_) => None,
        };

        // No subscribers is fine.
        let _ = inner.events.send(item);

        if let Some(action) = follow_up {
            inner.spawn(action);
        }
    }
}
