use entsync_types::{Key, is_local_key};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names that only exist on the client and are never sent.
pub const CLIENT_ONLY_FIELDS: &[&str] = &[
    "key",
    "tableKey",
    "markToDelete",
    "isShouldSaved",
    "isLocal",
    "softDeleted",
];

/// Returns true for bookkeeping fields and `_`-prefixed UI state.
pub fn is_client_only(name: &str) -> bool {
    name.starts_with('_') || CLIENT_ONLY_FIELDS.contains(&name)
}

/// A single entity as the client sees it.
///
/// `fields` is the state last confirmed by the remote store; `changes`
/// holds local edits that have not been persisted yet. Reading a field
/// prefers the pending value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub key: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_key: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub changes: Map<String, Value>,
    /// Remove once the pending save completes.
    #[serde(default)]
    pub mark_to_delete: bool,
    /// Edited again while a save was in flight; needs a follow-up persist.
    #[serde(default)]
    pub is_should_saved: bool,
    /// Never to be sent to the remote store.
    #[serde(default)]
    pub is_local: bool,
    /// Hidden pending an undo window.
    #[serde(default)]
    pub soft_deleted: bool,
}

impl Record {
    /// Creates an empty record under `key`.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            table_key: None,
            fields: Map::new(),
            changes: Map::new(),
            mark_to_delete: false,
            is_should_saved: false,
            is_local: false,
            soft_deleted: false,
        }
    }

    /// Creates a not-yet-persisted record with a fresh Local key.
    pub fn new_local(table_key: impl Into<String>) -> Self {
        let mut record = Self::new(Key::new_local());
        record.table_key = Some(table_key.into());
        record
    }

    /// Builds a confirmed record from a server object carrying a `key`.
    /// Client-only names in the object are dropped.
    pub fn from_remote(object: &Map<String, Value>) -> Option<Self> {
        let key = object.get("key").and_then(Key::from_json)?;
        let mut record = Self::new(key);
        record.fields = server_projection(object);
        Some(record)
    }

    pub fn with_table_key(mut self, table_key: impl Into<String>) -> Self {
        self.table_key = Some(table_key.into());
        self
    }

    /// Reads a field, pending value first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.changes.get(name).or_else(|| self.fields.get(name))
    }

    /// Records a local edit.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.changes.insert(name.into(), value);
    }

    /// The field set to send: pending changes, minus client-only names.
    pub fn server_fields(&self) -> Map<String, Value> {
        server_projection(&self.changes)
    }

    /// Whether any outgoing value still points at a Local record.
    pub fn has_local_reference(data: &Map<String, Value>) -> bool {
        data.values().any(is_local_key)
    }

    /// Folds a sent field set into the confirmed state.
    ///
    /// A pending change is cleared only if it still holds the value that was
    /// sent; edits made while the request was in flight stay pending.
    pub fn acknowledge(&mut self, sent: &Map<String, Value>) {
        for (name, value) in sent {
            if self.changes.get(name) == Some(value) {
                self.changes.remove(name);
            }
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Replaces confirmed fields with a fresh server copy. Pending changes
    /// are kept.
    pub fn merge_remote(&mut self, object: &Map<String, Value>) {
        self.fields = server_projection(object);
    }

    /// Rewrites every field value equal to `from` into `to`. Returns true if
    /// anything changed.
    pub fn replace_reference(&mut self, from: &Key, to: &Key) -> bool {
        let from = from.to_json();
        let to = to.to_json();
        let mut changed = false;
        for value in self.fields.values_mut().chain(self.changes.values_mut()) {
            if *value == from {
                *value = to.clone();
                changed = true;
            }
        }
        changed
    }

    /// Whether a field (pending or confirmed) refers to `key`.
    pub fn refers_to(&self, field: &str, key: &Key) -> bool {
        self.get(field).and_then(Key::from_json).as_ref() == Some(key)
    }
}

/// Drops client-only names from a field set.
pub fn server_projection(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .filter(|(name, _)| !is_client_only(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
