//! Remove handler.

use super::{Context, Removal, settle_removal};
use crate::remote::RemoteRequest;
use entsync_types::Action;
use tracing::{debug, warn};

/// Deletes a record. Records that never reached the server, or are flagged
/// local-only, are removed without a call. A record the server already lost
/// counts as removed.
pub async fn handle(ctx: &Context, action: &Action) {
    let payload = &action.payload;

    let record = ctx.store.get(&payload.key).await;

    let local_only = payload.is_local || record.as_ref().is_some_and(|r| r.is_local);
    if payload.key.is_local() || local_only {
        debug!("{} was never persisted, removing locally", payload.key);
        ctx.emit(action.succeed(payload.clone())).await;
        return;
    }

    let table_key = ctx.table_key(action, record.as_ref());
    let request = RemoteRequest::for_key(table_key, payload.key.clone());

    match settle_removal(action, ctx.remote.del(&request).await) {
        Removal::Done(response) | Removal::Gone(response) => {
            let mut reply = payload.clone();
            reply.response = Some(response);
            ctx.emit(action.succeed(reply)).await;
        }
        Removal::Failed(error) => {
            warn!("Remove of {} failed: {}", payload.key, error);
            ctx.fail(action, &error).await;
        }
    }
}
