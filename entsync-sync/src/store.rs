//! Record store and reducer.
//!
//! The store is the single shared mutable resource. Handlers only read
//! owned snapshots from it; every write the engine makes goes through
//! [`RecordStore::apply`], which folds a reply action into the records.

use async_trait::async_trait;
use entsync_model::{EntitySchema, Record};
use entsync_types::{Action, Key, Outcome, Payload, Verb};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Host-owned record state as seen by the engine.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point-in-time snapshot of a record.
    async fn get(&self, key: &Key) -> Option<Record>;

    /// Reducer entry point for emitted actions.
    async fn apply(&self, action: &Action);
}

/// In-memory record store.
pub struct MemoryStore {
    records: RwLock<HashMap<Key, Record>>,
    schemas: Vec<EntitySchema>,
}

impl MemoryStore {
    /// Creates an empty store that knows the given schemas (used to resolve
    /// table keys and cascading removals).
    pub fn new(schemas: Vec<EntitySchema>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            schemas,
        }
    }

    /// Inserts or replaces a record.
    pub async fn insert(&self, record: Record) {
        self.records.write().await.insert(record.key.clone(), record);
    }

    /// Creates a Local record with pending fields and returns its key.
    pub async fn create_local(&self, table_key: &str, fields: Map<String, Value>) -> Key {
        let mut record = Record::new_local(table_key);
        record.changes = fields;
        let key = record.key.clone();
        self.insert(record).await;
        key
    }

    /// Applies a host-side edit. Returns false if the record is unknown.
    pub async fn edit(&self, key: &Key, f: impl FnOnce(&mut Record)) -> bool {
        match self.records.write().await.get_mut(key) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Snapshot of every record.
    pub async fn records(&self) -> Vec<Record> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn table_for_channel(&self, channel: &str) -> Option<&str> {
        self.schemas
            .iter()
            .find(|s| s.channel == channel)
            .map(|s| s.table_key.as_str())
    }

    fn schema_for_table(&self, table_key: &str) -> Option<&EntitySchema> {
        self.schemas.iter().find(|s| s.table_key == table_key)
    }

    fn upsert_fetched(&self, records: &mut HashMap<Key, Record>, action: &Action) {
        let payload = &action.payload;
        let Some(response) = &payload.response else {
            return;
        };
        let table_key = payload
            .table_key
            .clone()
            .or_else(|| self.table_for_channel(action.channel()).map(str::to_string));

        let objects: Vec<&Map<String, Value>> = match &response.data {
            Value::Object(object) => vec![object],
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        };

        for object in objects {
            let Some(fetched) = Record::from_remote(object) else {
                continue;
            };
            match records.get_mut(&fetched.key) {
                Some(existing) => existing.merge_remote(object),
                None => {
                    let mut fetched = fetched;
                    fetched.table_key = table_key.clone();
                    records.insert(fetched.key.clone(), fetched);
                }
            }
        }
    }

    fn settle_save(records: &mut HashMap<Key, Record>, payload: &Payload) {
        // Nothing was sent, nothing to fold.
        if payload.response.is_none() {
            return;
        }

        let mut key = payload.key.clone();
        if let Some(old) = &payload.replaced_key {
            if let Some(mut record) = records.remove(old) {
                record.key = key.clone();
                record.is_should_saved = false;
                records.insert(key.clone(), record);
                info!("Promoted record {} to {}", old, key);
            } else {
                key = old.clone();
            }
            for record in records.values_mut() {
                if record.replace_reference(old, &payload.key) {
                    debug!("Rewrote reference {} -> {} in {}", old, payload.key, record.key);
                }
            }
        }

        if let (Some(record), Some(sent)) = (records.get_mut(&key), &payload.data) {
            record.acknowledge(sent);
        }
    }

    /// Removes a record and, transitively, the sub-collection records that
    /// point at it. Cycles are visited once.
    fn remove_cascading(&self, records: &mut HashMap<Key, Record>, key: &Key) {
        let mut visited: HashSet<Key> = HashSet::new();
        let mut pending = vec![key.clone()];

        while let Some(key) = pending.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let Some(removed) = records.remove(&key) else {
                continue;
            };
            let Some(schema) = removed
                .table_key
                .as_deref()
                .and_then(|t| self.schema_for_table(t))
            else {
                continue;
            };

            for sub in &schema.sub_collections {
                pending.extend(
                    records
                        .values()
                        .filter(|r| r.table_key.as_deref() == Some(sub.table_key.as_str()))
                        .filter(|r| r.refers_to(&sub.parent_field, &key))
                        .map(|r| r.key.clone()),
                );
            }
        }

        if visited.len() > 1 {
            info!("Removed {} with {} related records", key, visited.len() - 1);
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &Key) -> Option<Record> {
        self.records.read().await.get(key).cloned()
    }

    async fn apply(&self, action: &Action) {
        if action.action_type.outcome != Some(Outcome::Success) {
            return;
        }
        let payload = &action.payload;
        let mut records = self.records.write().await;

        match action.verb() {
            Verb::Fetch => self.upsert_fetched(&mut records, action),
            Verb::Save => Self::settle_save(&mut records, payload),
            Verb::Remove => self.remove_cascading(&mut records, &payload.key),
            Verb::RemoveWithUndo => {
                if let Some(record) = records.get_mut(&payload.key) {
                    record.soft_deleted = true;
                }
            }
            Verb::UndoRemove => {
                if let Some(record) = records.get_mut(&payload.key) {
                    record.soft_deleted = false;
                }
            }
        }
    }
}
