use serde::{Deserialize, Serialize};

/// Describes how a channel maps onto the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Action channel, e.g. `ORDERS`.
    pub channel: String,
    /// Remote table the channel's records live in.
    pub table_key: String,
    /// Dependent collections fetched and removed together with a record.
    #[serde(default)]
    pub sub_collections: Vec<SubCollection>,
}

impl EntitySchema {
    pub fn new(channel: impl Into<String>, table_key: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            table_key: table_key.into(),
            sub_collections: Vec::new(),
        }
    }

    /// Declares a sub-collection.
    pub fn with_sub_collection(mut self, sub: SubCollection) -> Self {
        self.sub_collections.push(sub);
        self
    }
}

/// A collection whose records point back at a parent through a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCollection {
    /// Channel the cascaded fetch replies on.
    pub channel: String,
    /// Remote table of the child records.
    pub table_key: String,
    /// Field on the child holding the parent's key.
    pub parent_field: String,
}

impl SubCollection {
    pub fn new(
        channel: impl Into<String>,
        table_key: impl Into<String>,
        parent_field: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            table_key: table_key.into(),
            parent_field: parent_field.into(),
        }
    }
}
