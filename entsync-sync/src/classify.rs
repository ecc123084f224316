//! Classification of remote failures.
//!
//! Turns a [`RemoteError`] into the exception kind the handlers branch on
//! and into the field-level intents shown to the user.

use crate::intent::{Emitted, FormIntent, Notification};
use crate::remote::RemoteError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Exception type the server reports when the record to delete no longer
/// exists. Remote store implementations must use this exact literal.
pub const ALREADY_REMOVED_EXCEPTION: &str = "NullReferenceException";

/// Recognized kinds of remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// The record was already deleted on the server.
    AlreadyRemoved,
    Other,
}

/// Reads `response.data.exception.type`. Message text is never consulted.
pub fn exception_kind(error: &RemoteError) -> ExceptionKind {
    let exception_type = error
        .response()
        .and_then(|r| r.data.pointer("/exception/type"))
        .and_then(Value::as_str);

    match exception_type {
        Some(ALREADY_REMOVED_EXCEPTION) => ExceptionKind::AlreadyRemoved,
        _ => ExceptionKind::Other,
    }
}

/// Field-level messages from `response.data.errors`.
///
/// Accepts an object of `field -> message` (or `field -> [messages]`, first
/// one wins) and an array of `{field, message}` entries.
pub fn field_errors(error: &RemoteError) -> BTreeMap<String, String> {
    let Some(errors) = error.response().and_then(|r| r.data.get("errors")) else {
        return BTreeMap::new();
    };

    match errors {
        Value::Object(map) => map
            .iter()
            .filter_map(|(field, message)| Some((field.clone(), message_text(message)?)))
            .collect(),
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| {
                let field = entry.get("field")?.as_str()?;
                let message = message_text(entry.get("message")?)?;
                Some((field.to_string(), message))
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Best human-readable message for a failure.
pub fn error_message(error: &RemoteError) -> String {
    error
        .response()
        .and_then(|r| {
            r.data
                .get("message")
                .or_else(|| r.data.pointer("/exception/message"))
        })
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Intents to emit for a failure.
///
/// With a form, the submission is stopped with the field errors attached.
/// Without a form, or when the server gave no field detail, a global error
/// notification carries the message.
pub fn error_intents(error: &RemoteError, form: Option<&str>) -> Vec<Emitted> {
    let errors = field_errors(error);
    let mut intents = Vec::new();

    let has_fields = !errors.is_empty();
    if let Some(form) = form {
        intents.push(Emitted::Form(FormIntent::StopSubmit {
            form: form.to_string(),
            errors,
        }));
    }

    if form.is_none() || !has_fields {
        intents.push(Emitted::Notification(Notification::error(error_message(
            error,
        ))));
    }

    intents
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(message_text),
        _ => None,
    }
}
