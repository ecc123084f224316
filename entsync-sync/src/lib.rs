//! Action-driven entity sync engine.
//!
//! Reconciles records created, edited and deleted on the client against a
//! remote store. Records created locally carry a Local key until the server
//! assigns one; the engine re-keys them and keeps references consistent.
//!
//! # Architecture
//!
//! Requests are [`Action`](entsync_types::Action)s tagged
//! `<CHANNEL>__<VERB>`. The verb alone selects the handler:
//!
//! - **FETCH**: reads a record and cascades into its sub-collections
//! - **SAVE**: creates or updates, chaining a follow-up save or a trailing
//!   remove when the record changed while the request was in flight
//! - **REMOVE**: deletes, treating an already-deleted record as success
//! - **REMOVE_WITH_UNDO** / **UNDO_REMOVE**: soft delete with an undo offer
//!
//! Handlers reply with `_SUCCESS` / `_FAILURE` actions plus notification and
//! form intents. The [`SyncEngine`] applies replies to the [`RecordStore`]
//! and broadcasts everything to subscribers.
//!
//! # Example
//!
//! ```no_run
//! use entsync_model::EntitySchema;
//! use entsync_sync::{HttpRemoteConfig, HttpRemoteStore, MemoryStore, SyncConfig, SyncEngine};
//! use entsync_types::{Action, Payload, Verb};
//! use std::sync::Arc;
//!
//! # async fn run() -> entsync_sync::SyncResult<()> {
//! let config = SyncConfig::default().with_schema(EntitySchema::new("ORDERS", "orders"));
//! let store = Arc::new(MemoryStore::new(config.schemas.clone()));
//! let remote = Arc::new(HttpRemoteStore::new(HttpRemoteConfig::default())?);
//! let engine = SyncEngine::new(config, store.clone(), remote);
//!
//! let key = store.create_local("orders", serde_json::Map::new()).await;
//! engine.dispatch(Action::request("ORDERS", Verb::Save, Payload::for_key(key)))?;
//! engine.wait_idle().await;
//! # Ok(())
//! # }
//! ```

pub mod classify;
mod engine;
mod error;
pub mod handlers;
pub mod http;
pub mod intent;
pub mod remote;
pub mod store;

pub use classify::{ALREADY_REMOVED_EXCEPTION, ExceptionKind, error_intents, exception_kind};
pub use engine::{DEFAULT_UNDO_WINDOW_SECS, SyncConfig, SyncEngine, route};
pub use error::{SyncError, SyncResult};
pub use handlers::Context;
pub use http::{HttpRemoteConfig, HttpRemoteStore};
pub use intent::{Emitted, Emitter, FormIntent, Notification, PendingUndo, RemoveNotice};
pub use remote::{RemoteError, RemoteRequest, RemoteResult, RemoteStore};
pub use store::{MemoryStore, RecordStore};
