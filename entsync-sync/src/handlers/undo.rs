//! Reversible delete: soft delete with an undo offer, and the undo itself.

use super::{Context, Removal, settle_removal};
use crate::intent::{Notification, PendingUndo};
use crate::remote::{RemoteError, RemoteRequest};
use entsync_types::{Action, Payload, Verb};
use serde_json::json;
use tracing::{debug, warn};

/// Custom server action performing a soft delete.
pub const DELETE_WITH_UNDO_BUTTON: &str = "custom.delete_with_undo";

/// Header selecting the server-side function on the side channel.
pub const FUNCTION_HEADER: &str = "Function";

/// Side-channel function restoring a soft-deleted record.
pub const UNDO_DELETE_FUNCTION: &str = "undoDelete";

/// Soft-deletes a record and offers an undo for the configured window.
///
/// When the server already lost the record there is nothing to restore, so
/// only the success reply is emitted.
pub async fn remove_with_undo(ctx: &Context, action: &Action) {
    let payload = &action.payload;
    let record = ctx.store.get(&payload.key).await;
    let table_key = ctx.table_key(action, record.as_ref());

    let request = RemoteRequest::for_key(table_key.clone(), payload.key.clone())
        .with_button(DELETE_WITH_UNDO_BUTTON);

    match settle_removal(action, ctx.remote.post(&request).await) {
        Removal::Done(response) => {
            let mut undo = Payload::for_key(payload.key.clone());
            undo.table_key = table_key;
            let pending = PendingUndo {
                duration: ctx.config.undo_window_secs,
                action: Action::new(action.action_type.with_verb(Verb::UndoRemove), undo),
            };
            debug!(
                "Offering undo for {} during {}s",
                payload.key, pending.duration
            );
            ctx.emit(Notification::undo(pending)).await;

            let mut reply = payload.clone();
            reply.response = Some(response);
            ctx.emit(action.succeed(reply)).await;
        }
        Removal::Gone(response) => {
            let mut reply = payload.clone();
            reply.response = Some(response);
            ctx.emit(action.succeed(reply)).await;
        }
        Removal::Failed(error) => {
            warn!("Soft delete of {} failed: {}", payload.key, error);
            ctx.fail(action, &error).await;
        }
    }
}

/// Restores a soft-deleted record. The undo banner is dismissed before the
/// call and is not shown again if the call fails.
pub async fn undo_remove(ctx: &Context, action: &Action) {
    let payload = &action.payload;
    ctx.emit(Notification::dismiss_undo()).await;

    let record = ctx.store.get(&payload.key).await;
    let Some(table_key) = ctx.table_key(action, record.as_ref()) else {
        let error = RemoteError::InvalidRequest(format!("no table for {}", action.channel()));
        warn!("Undo of {} failed: {}", payload.key, error);
        ctx.fail(action, &error).await;
        return;
    };

    let path = format!("/{table_key}/json/v2");
    let body = json!({ "parameters": { "key": payload.key.to_json() } });
    let headers = [(FUNCTION_HEADER, UNDO_DELETE_FUNCTION)];

    match ctx.remote.request_post(&path, body, &headers).await {
        Ok(response) => {
            debug!("Restored {}", payload.key);
            let mut reply = payload.clone();
            reply.table_key = Some(table_key);
            reply.response = Some(response);
            ctx.emit(action.succeed(reply)).await;
        }
        Err(error) => {
            warn!("Undo of {} failed: {}", payload.key, error);
            ctx.fail(action, &error).await;
        }
    }
}
