//! Save handler: the optimistic write state machine.
//!
//! A save creates the record when its key is still Local and updates it
//! otherwise. After a create the record carries a server key; the success
//! reply reports both keys so the store can re-key it. Two follow-ups may be
//! dispatched once the reply is out:
//!
//! - a chained save, when the record was edited again while the create was
//!   in flight (`isShouldSaved`)
//! - a trailing remove, when the record was deleted while the save was in
//!   flight (`markToDelete`)

use super::Context;
use crate::intent::{FormIntent, Notification};
use crate::remote::{RemoteError, RemoteRequest};
use entsync_model::{Record, server_projection};
use entsync_types::{Action, Key, Payload, Response, Verb};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

pub async fn handle(ctx: &Context, action: &Action) {
    let payload = &action.payload;

    if payload.with_notification {
        ctx.emit(Notification::processing()).await;
    }
    if let Some(form) = &payload.form {
        ctx.emit(FormIntent::start(form.clone())).await;
    }

    if let Err(error) = submit(ctx, action).await {
        error!("Save of {} on {} failed: {}", payload.key, action.channel(), error);
        ctx.fail(action, &error).await;
    }
}

async fn submit(ctx: &Context, action: &Action) -> Result<(), RemoteError> {
    let payload = &action.payload;

    let record = ctx.store.get(&payload.key).await;
    let key = record
        .as_ref()
        .map(|r| r.key.clone())
        .unwrap_or_else(|| payload.key.clone());
    let table_key = ctx.table_key(action, record.as_ref());

    let data = match &record {
        Some(record) => record.server_fields(),
        None => payload
            .data
            .as_ref()
            .map(server_projection)
            .unwrap_or_default(),
    };
    let response = if should_send(payload, record.as_ref(), &data) {
        let request = RemoteRequest {
            table_key: table_key.clone(),
            key: None,
            data: Some(data.clone()),
            params: Map::new(),
            button: None,
        };
        let response = if key.is_local() {
            debug!("Creating {} in {:?}", key, table_key);
            ctx.remote.post(&request).await?
        } else {
            debug!("Updating {} in {:?}", key, table_key);
            ctx.remote
                .put(&RemoteRequest {
                    key: Some(key.clone()),
                    ..request
                })
                .await?
        };
        Some(response)
    } else {
        debug!("Nothing to send for {}", key);
        None
    };

    let new_key = response
        .as_ref()
        .and_then(assigned_key)
        .filter(|assigned| !assigned.is_local() && *assigned != key);

    // The store may have changed while the request was in flight.
    let current = ctx.store.get(&payload.key).await;

    let mut reply = payload.clone();
    reply.table_key = table_key.clone();
    if response.is_some() {
        reply.data = Some(data);
    }
    reply.response = response;
    if let Some(new_key) = &new_key {
        info!("{} assigned server key {}", key, new_key);
        reply.key = new_key.clone();
        reply.replaced_key = Some(key.clone());
    }
    ctx.emit(action.succeed(reply)).await;

    let current_key = new_key.clone().unwrap_or_else(|| key.clone());

    if new_key.is_some() && current.as_ref().is_some_and(|r| r.is_should_saved) {
        debug!("Chaining save for {}", current_key);
        let follow_up = Payload {
            key: current_key.clone(),
            table_key: table_key.clone(),
            data: Some(Map::new()),
            response: None,
            error: None,
            replaced_key: None,
            ..payload.clone()
        };
        ctx.emit(Action::new(action.action_type.clone(), follow_up)).await;
    }

    if let Some(form) = &payload.form {
        ctx.emit(FormIntent::stop(form.clone())).await;
    }
    if payload.with_notification {
        ctx.emit(Notification::done()).await;
    }

    if current.as_ref().is_some_and(|r| r.mark_to_delete) {
        debug!("Removing {} after save", current_key);
        let mut remove = Payload::for_key(current_key);
        remove.table_key = table_key;
        let remove = Action::new(action.action_type.with_verb(Verb::Remove), remove);
        ctx.emit(remove).await;
    }

    Ok(())
}

/// A call is made only for a non-empty, fully resolvable field set on a
/// record that may reach the server and is not already waiting for a
/// follow-up save.
fn should_send(payload: &Payload, record: Option<&Record>, data: &Map<String, Value>) -> bool {
    let local_only = payload.is_local || record.is_some_and(|r| r.is_local);
    let should_saved = record.is_some_and(|r| r.is_should_saved);
    !data.is_empty() && !local_only && !Record::has_local_reference(data) && !should_saved
}

fn assigned_key(response: &Response) -> Option<Key> {
    response.data.get("key").and_then(Key::from_json)
}
