//! One handler per request verb.
//!
//! Handlers take a shared [`Context`] and the request action, make zero or
//! more remote calls, and emit replies and intents. They never return an
//! error: every failure becomes a `_FAILURE` reply.

pub mod fetch;
pub mod remove;
pub mod save;
pub mod undo;

use crate::classify::{ExceptionKind, error_intents, exception_kind};
use crate::engine::SyncConfig;
use crate::intent::{Emitted, Emitter};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};
use crate::store::RecordStore;
use entsync_model::Record;
use entsync_types::{Action, Response};
use std::sync::Arc;
use tracing::warn;

/// Everything a handler needs, shared by all handler tasks.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<SyncConfig>,
    pub store: Arc<dyn RecordStore>,
    pub remote: Arc<dyn RemoteStore>,
    pub emitter: Arc<dyn Emitter>,
}

impl Context {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteStore>,
        emitter: Arc<dyn Emitter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            remote,
            emitter,
        }
    }

    pub async fn emit(&self, item: impl Into<Emitted>) {
        self.emitter.emit(item.into()).await;
    }

    /// Table the action addresses: the payload's, then the record's, then
    /// the one registered for the channel.
    pub fn table_key(&self, action: &Action, record: Option<&Record>) -> Option<String> {
        action
            .payload
            .table_key
            .clone()
            .or_else(|| record.and_then(|r| r.table_key.clone()))
            .or_else(|| {
                self.config
                    .schema(action.channel())
                    .map(|s| s.table_key.clone())
            })
    }

    /// Emits the classifier intents (unless the action is silent) and the
    /// `_FAILURE` reply.
    pub async fn fail(&self, action: &Action, error: &RemoteError) {
        if !action.payload.is_silent {
            for intent in error_intents(error, action.payload.form.as_deref()) {
                self.emit(intent).await;
            }
        }
        self.emit(action.fail(error.to_info())).await;
    }
}

/// Outcome of a delete-like call.
pub(crate) enum Removal {
    Done(Response),
    /// The server no longer had the record; carries the error's response.
    Gone(Response),
    Failed(RemoteError),
}

pub(crate) fn settle_removal(action: &Action, result: RemoteResult<Response>) -> Removal {
    match result {
        Ok(response) => Removal::Done(response),
        Err(error) => match (exception_kind(&error), error.response()) {
            (ExceptionKind::AlreadyRemoved, Some(response)) => {
                warn!(
                    "{} already removed on the server, treating as success",
                    action.payload.key
                );
                Removal::Gone(response.clone())
            }
            _ => Removal::Failed(error),
        },
    }
}
