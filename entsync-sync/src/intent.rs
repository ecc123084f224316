//! Everything a handler hands back to the host.
//!
//! Handlers never render anything. They emit result actions plus
//! notification and form intents through an [`Emitter`]; the host decides
//! how to show them.

use async_trait::async_trait;
use entsync_types::Action;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// One item emitted by a handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Emitted {
    /// A reply (`_SUCCESS` / `_FAILURE`) or a follow-up request.
    Action(Action),
    Notification(Notification),
    Form(FormIntent),
}

impl From<Action> for Emitted {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

impl From<Notification> for Emitted {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

impl From<FormIntent> for Emitted {
    fn from(intent: FormIntent) -> Self {
        Self::Form(intent)
    }
}

/// Where a notification is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationScope {
    Global,
}

/// A banner intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub scope: NotificationScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_process: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_remove: Option<RemoveNotice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Notification {
    fn global() -> Self {
        Self {
            scope: NotificationScope::Global,
            is_process: None,
            is_done: None,
            is_remove: None,
            message: None,
        }
    }

    /// "Saving…"
    pub fn processing() -> Self {
        Self {
            is_process: Some(true),
            ..Self::global()
        }
    }

    /// "Saved."
    pub fn done() -> Self {
        Self {
            is_done: Some(true),
            is_process: Some(false),
            ..Self::global()
        }
    }

    /// Offers an undo for a soft delete.
    pub fn undo(pending: PendingUndo) -> Self {
        Self {
            is_remove: Some(RemoveNotice::Pending(pending)),
            ..Self::global()
        }
    }

    /// Dismisses a shown undo offer.
    pub fn dismiss_undo() -> Self {
        Self {
            is_remove: Some(RemoveNotice::Dismissed),
            ..Self::global()
        }
    }

    /// A failure without field detail.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::global()
        }
    }

    /// The pending undo this notification carries, if any.
    pub fn pending_undo(&self) -> Option<&PendingUndo> {
        match &self.is_remove {
            Some(RemoveNotice::Pending(pending)) => Some(pending),
            _ => None,
        }
    }
}

/// State of the undo banner. Serializes as the descriptor, or `false`.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveNotice {
    Pending(PendingUndo),
    Dismissed,
}

impl Serialize for RemoveNotice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pending(pending) => pending.serialize(serializer),
            Self::Dismissed => serializer.serialize_bool(false),
        }
    }
}

/// An undo offer: the action that reverts a soft delete, and how long the
/// host should keep offering it. The window is advisory; the engine does not
/// enforce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingUndo {
    /// Seconds.
    pub duration: u64,
    pub action: Action,
}

/// Form submission intents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FormIntent {
    StartSubmit {
        form: String,
    },
    /// Ends a submission; `errors` maps field name to message.
    StopSubmit {
        form: String,
        errors: BTreeMap<String, String>,
    },
}

impl FormIntent {
    pub fn start(form: impl Into<String>) -> Self {
        Self::StartSubmit { form: form.into() }
    }

    pub fn stop(form: impl Into<String>) -> Self {
        Self::StopSubmit {
            form: form.into(),
            errors: BTreeMap::new(),
        }
    }
}

/// Sink for everything a handler produces.
#[async_trait]
pub trait Emitter: Send + Sync {
    async fn emit(&self, item: Emitted);
}

/// An emitter that only records, for testing handlers in isolation.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct RecordingEmitter {
        items: Mutex<Vec<Emitted>>,
    }

    impl RecordingEmitter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn items(&self) -> Vec<Emitted> {
            self.items.lock().unwrap().clone()
        }

        /// Emitted actions only, in order.
        pub fn actions(&self) -> Vec<Action> {
            self.items()
                .into_iter()
                .filter_map(|item| match item {
                    Emitted::Action(action) => Some(action),
                    _ => None,
                })
                .collect()
        }

        /// Emitted notifications only, in order.
        pub fn notifications(&self) -> Vec<Notification> {
            self.items()
                .into_iter()
                .filter_map(|item| match item {
                    Emitted::Notification(n) => Some(n),
                    _ => None,
                })
                .collect()
        }

        /// Emitted form intents only, in order.
        pub fn forms(&self) -> Vec<FormIntent> {
            self.items()
                .into_iter()
                .filter_map(|item| match item {
                    Emitted::Form(f) => Some(f),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Emitter for RecordingEmitter {
        async fn emit(&self, item: Emitted) {
            self.items.lock().unwrap().push(item);
        }
    }
}
