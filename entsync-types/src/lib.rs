//! Core type definitions for entsync.
//!
//! This crate defines the vocabulary shared by the model and the sync
//! engine:
//! - Record keys, Local (client-minted) or Remote (server-issued)
//! - Action type tags (`<channel>__<VERB>`) and their reply forms
//! - The action payload and the remote response/error shapes it carries
//!
//! Nothing here performs I/O.

mod action;
mod key;

pub use action::{
    Action, ActionType, CHANNEL_SEPARATOR, ErrorInfo, Outcome, ParseActionTypeError, Payload,
    Response, Verb,
};
pub use key::{Key, LOCAL_KEY_PREFIX, is_local_key};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    ActionType(#[from] ParseActionTypeError),
}

/// Builds an action from a raw type tag.
pub fn action(tag: &str, payload: Payload) -> Result<Action> {
    Ok(Action::new(tag.parse()?, payload))
}

/// Decodes an action from its JSON wire form.
pub fn action_from_json(json: &str) -> Result<Action> {
    Ok(serde_json::from_str(json)?)
}
