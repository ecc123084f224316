#![allow(dead_code)]

use entsync_model::{EntitySchema, Record, SubCollection};
use entsync_sync::intent::mock::RecordingEmitter;
use entsync_sync::remote::mock::MockRemote;
use entsync_sync::{Context, MemoryStore, RemoteError, SyncConfig};
use entsync_types::{Key, Response};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once. Set `RUST_LOG` to see handler logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Orders with order lines cascading from them through `orderKey`.
pub fn orders_config() -> SyncConfig {
    SyncConfig::default().with_schema(
        EntitySchema::new("ORDERS", "orders").with_sub_collection(SubCollection::new(
            "ORDER_LINES",
            "order_lines",
            "orderKey",
        )),
    )
}

/// Handlers wired to recording collaborators.
pub struct Harness {
    pub ctx: Context,
    pub store: Arc<MemoryStore>,
    pub remote: Arc<MockRemote>,
    pub emitter: Arc<RecordingEmitter>,
}

pub fn harness(config: SyncConfig) -> Harness {
    init_tracing();
    let store = Arc::new(MemoryStore::new(config.schemas.clone()));
    let remote = Arc::new(MockRemote::new());
    let emitter = Arc::new(RecordingEmitter::new());
    let ctx = Context::new(config, store.clone(), remote.clone(), emitter.clone());
    Harness {
        ctx,
        store,
        remote,
        emitter,
    }
}

pub fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// A record in `orders` with pending changes.
pub fn order(key: Key, changes: Value) -> Record {
    let mut record = Record::new(key).with_table_key("orders");
    record.changes = fields(changes);
    record
}

/// The failure a server reports when deleting a record it no longer has.
pub fn already_removed() -> RemoteError {
    RemoteError::Status(Response::new(
        500,
        json!({
            "exception": {
                "type": "NullReferenceException",
                "message": "Object reference not set to an instance of an object."
            }
        }),
    ))
}

pub fn server_error(message: &str) -> RemoteError {
    RemoteError::Status(Response::new(500, json!({ "message": message })))
}

/// Yields until `check` holds.
pub async fn until(mut check: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never held");
}
