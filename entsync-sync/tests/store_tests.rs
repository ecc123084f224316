mod common;

use common::{fields, order, orders_config};
use entsync_model::{EntitySchema, Record, SubCollection};
use entsync_sync::{MemoryStore, RecordStore};
use entsync_types::{Action, ActionType, ErrorInfo, Key, Payload, Response, Verb};
use pretty_assertions::assert_eq;
use serde_json::json;

fn store() -> MemoryStore {
    MemoryStore::new(orders_config().schemas)
}

fn reply(channel: &str, verb: Verb, payload: Payload) -> Action {
    Action::new(ActionType::new(channel, verb).success(), payload)
}

fn line(key: &str, order_key: &str) -> Record {
    let mut record = Record::new(Key::remote(key)).with_table_key("order_lines");
    record.fields = fields(json!({ "orderKey": order_key }));
    record
}

// ── Host helpers ────────────────────────────────────────────────

#[tokio::test]
async fn create_local_mints_pending_record() {
    let store = store();
    let key = store
        .create_local("orders", fields(json!({ "name": "A" })))
        .await;

    assert!(key.is_local());
    let record = store.get(&key).await.unwrap();
    assert_eq!(record.table_key.as_deref(), Some("orders"));
    assert_eq!(record.server_fields(), fields(json!({ "name": "A" })));
}

#[tokio::test]
async fn edit_unknown_record_reports_false() {
    let store = store();
    assert!(!store.edit(&Key::remote("1"), |r| r.mark_to_delete = true).await);
    assert!(store.is_empty().await);
}

// ── Fetch ───────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_upserts_collection() {
    let store = store();
    let mut payload = Payload::for_key(Key::remote("42"));
    payload.response = Some(Response::ok(json!([
        { "key": "42", "name": "A" },
        { "key": 43, "name": "B" },
        { "name": "no key" },
    ])));

    store.apply(&reply("ORDERS", Verb::Fetch, payload)).await;

    assert_eq!(store.len().await, 2);
    let record = store.get(&Key::remote("43")).await.unwrap();
    assert_eq!(record.table_key.as_deref(), Some("orders"));
    assert_eq!(record.get("name"), Some(&json!("B")));
}

#[tokio::test]
async fn fetch_keeps_pending_changes() {
    let store = store();
    store
        .insert(order(Key::remote("42"), json!({ "name": "local edit" })))
        .await;
    let mut payload = Payload::for_key(Key::remote("42"));
    payload.response = Some(Response::ok(json!({ "key": "42", "name": "server" })));

    store.apply(&reply("ORDERS", Verb::Fetch, payload)).await;

    let record = store.get(&Key::remote("42")).await.unwrap();
    assert_eq!(record.fields.get("name"), Some(&json!("server")));
    assert_eq!(record.get("name"), Some(&json!("local edit")));
}

// ── Save ────────────────────────────────────────────────────────

#[tokio::test]
async fn promotion_rekeys_and_rewrites_references() {
    let store = store();
    let mut created = order(Key::local("tmp1"), json!({ "name": "A" }));
    created.is_should_saved = true;
    store.insert(created).await;
    let mut child = Record::new(Key::local("line1")).with_table_key("order_lines");
    child.set("orderKey", json!("local:tmp1"));
    store.insert(child).await;

    let mut payload = Payload::for_key(Key::remote("42"));
    payload.replaced_key = Some(Key::local("tmp1"));
    payload.data = Some(fields(json!({ "name": "A" })));
    payload.response = Some(Response::ok(json!({ "key": "42" })));
    store.apply(&reply("ORDERS", Verb::Save, payload)).await;

    assert!(store.get(&Key::local("tmp1")).await.is_none());
    let promoted = store.get(&Key::remote("42")).await.unwrap();
    assert!(promoted.changes.is_empty());
    assert!(!promoted.is_should_saved);
    assert_eq!(promoted.fields, fields(json!({ "name": "A" })));

    let child = store.get(&Key::local("line1")).await.unwrap();
    assert_eq!(child.get("orderKey"), Some(&json!("42")));
}

#[tokio::test]
async fn acknowledge_keeps_edits_made_in_flight() {
    let store = store();
    store
        .insert(order(Key::remote("7"), json!({ "name": "newer", "qty": 3 })))
        .await;

    let mut payload = Payload::for_key(Key::remote("7"));
    payload.data = Some(fields(json!({ "name": "older", "qty": 3 })));
    payload.response = Some(Response::ok(json!(null)));
    store.apply(&reply("ORDERS", Verb::Save, payload)).await;

    let record = store.get(&Key::remote("7")).await.unwrap();
    assert_eq!(record.changes, fields(json!({ "name": "newer" })));
    assert_eq!(record.fields.get("qty"), Some(&json!(3)));
}

#[tokio::test]
async fn save_without_call_changes_nothing() {
    let store = store();
    let before = order(Key::remote("7"), json!({ "name": "B" }));
    store.insert(before.clone()).await;

    let mut payload = Payload::for_key(Key::remote("7"));
    payload.data = Some(fields(json!({ "name": "B" })));
    store.apply(&reply("ORDERS", Verb::Save, payload)).await;

    assert_eq!(store.get(&Key::remote("7")).await, Some(before));
}

#[tokio::test]
async fn failures_are_not_applied() {
    let store = store();
    store.insert(order(Key::remote("7"), json!({}))).await;

    let request = Action::request("ORDERS", Verb::Remove, Payload::for_key(Key::remote("7")));
    store
        .apply(&request.fail(ErrorInfo {
            message: "boom".to_string(),
            status: Some(500),
            response: None,
        }))
        .await;
    store.apply(&request).await;

    assert_eq!(store.len().await, 1);
}

// ── Remove ──────────────────────────────────────────────────────

#[tokio::test]
async fn remove_cascades_to_children() {
    let store = store();
    store.insert(order(Key::remote("42"), json!({}))).await;
    store.insert(order(Key::remote("43"), json!({}))).await;
    store.insert(line("100", "42")).await;
    store.insert(line("101", "42")).await;
    store.insert(line("102", "43")).await;

    store
        .apply(&reply("ORDERS", Verb::Remove, Payload::for_key(Key::remote("42"))))
        .await;

    let mut left: Vec<Key> = store.records().await.into_iter().map(|r| r.key).collect();
    left.sort();
    assert_eq!(left, vec![Key::remote("102"), Key::remote("43")]);
}

#[tokio::test]
async fn remove_survives_reference_cycles() {
    let schema = EntitySchema::new("NODES", "nodes").with_sub_collection(SubCollection::new(
        "NODES", "nodes", "parent",
    ));
    let store = MemoryStore::new(vec![schema]);
    for (key, parent) in [("1", "3"), ("2", "1"), ("3", "2")] {
        let mut node = Record::new(Key::remote(key)).with_table_key("nodes");
        node.fields = fields(json!({ "parent": parent }));
        store.insert(node).await;
    }

    store
        .apply(&reply("NODES", Verb::Remove, Payload::for_key(Key::remote("1"))))
        .await;

    assert!(store.is_empty().await);
}

// ── Soft delete ─────────────────────────────────────────────────

#[tokio::test]
async fn soft_delete_and_restore() {
    let store = store();
    store.insert(order(Key::remote("42"), json!({}))).await;
    let payload = Payload::for_key(Key::remote("42"));

    store
        .apply(&reply("ORDERS", Verb::RemoveWithUndo, payload.clone()))
        .await;
    assert!(store.get(&Key::remote("42")).await.unwrap().soft_deleted);

    store
        .apply(&reply("ORDERS", Verb::UndoRemove, payload))
        .await;
    assert!(!store.get(&Key::remote("42")).await.unwrap().soft_deleted);
}
