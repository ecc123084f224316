//! Error types for the sync layer.

use crate::remote::RemoteError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur outside a handler.
///
/// Handler failures never surface here; they become `_FAILURE` replies.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote store error.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The action is a reply and has no handler.
    #[error("not a routable action: {0}")]
    NotRoutable(String),
}
