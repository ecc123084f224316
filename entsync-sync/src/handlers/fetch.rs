//! Fetch handler.

use super::Context;
use crate::remote::{RemoteError, RemoteRequest};
use entsync_model::SubCollection;
use entsync_types::{Action, ActionType, Payload, Verb};
use futures::future::join_all;
use tracing::{debug, warn};

/// Reads the record, then every declared sub-collection concurrently.
///
/// Each cascade reply is emitted as soon as it arrives. The parent reply is
/// emitted after all cascades have settled; any failure turns it into a
/// `_FAILURE` without undoing cascades already emitted.
pub async fn handle(ctx: &Context, action: &Action) {
    let payload = &action.payload;
    let record = ctx.store.get(&payload.key).await;
    let table_key = ctx.table_key(action, record.as_ref());

    let request = RemoteRequest::from_payload(payload, table_key.clone());
    let response = match ctx.remote.get(&request).await {
        Ok(response) => response,
        Err(error) => {
            warn!("Fetch of {} failed: {}", payload.key, error);
            ctx.fail(action, &error).await;
            return;
        }
    };

    let subs = ctx
        .config
        .schema(action.channel())
        .map(|s| s.sub_collections.clone())
        .unwrap_or_default();

    let cascades = subs.iter().map(|sub| cascade(ctx, payload, sub));
    let failed = join_all(cascades)
        .await
        .into_iter()
        .find_map(Result::err);

    if let Some(error) = failed {
        warn!("Cascade fetch under {} failed: {}", payload.key, error);
        ctx.fail(action, &error).await;
        return;
    }

    let mut reply = payload.clone();
    reply.table_key = table_key;
    reply.response = Some(response);
    ctx.emit(action.succeed(reply)).await;
}

async fn cascade(ctx: &Context, parent: &Payload, sub: &SubCollection) -> Result<(), RemoteError> {
    debug!("Cascading fetch of {} under {}", sub.channel, parent.key);

    let request = RemoteRequest {
        table_key: Some(sub.table_key.clone()),
        ..Default::default()
    }
    .with_param(sub.parent_field.clone(), parent.key.to_json());

    let response = ctx.remote.get(&request).await?;

    let mut payload = Payload::for_key(parent.key.clone()).with_table_key(sub.table_key.clone());
    payload.response = Some(response);
    let reply = ActionType::new(sub.channel.clone(), Verb::Fetch).success();
    ctx.emit(Action::new(reply, payload)).await;
    Ok(())
}
