//! Actions and their type tags.
//!
//! Every request the engine handles is an [`Action`] whose tag has the form
//! `<channel>__<VERB>`. The channel is free-form and only used to build the
//! reply tags (`<channel>__<VERB>_SUCCESS` / `_FAILURE`); the verb selects
//! the handler.

use crate::Key;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Separator between the channel and the verb in a type tag.
pub const CHANNEL_SEPARATOR: &str = "__";

/// The five request verbs the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Fetch,
    Save,
    Remove,
    RemoveWithUndo,
    UndoRemove,
}

impl Verb {
    /// All verbs, in routing order.
    pub const ALL: [Verb; 5] = [
        Verb::Fetch,
        Verb::Save,
        Verb::Remove,
        Verb::RemoveWithUndo,
        Verb::UndoRemove,
    ];

    /// The tag suffix for this verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Fetch => "FETCH",
            Verb::Save => "SAVE",
            Verb::Remove => "REMOVE",
            Verb::RemoveWithUndo => "REMOVE_WITH_UNDO",
            Verb::UndoRemove => "UNDO_REMOVE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply suffix appended to a request tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
        }
    }
}

/// Error returned when a tag carries none of the known verbs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized action type: {0}")]
pub struct ParseActionTypeError(pub String);

/// A parsed action type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionType {
    /// Entity channel, e.g. `ORDERS`.
    pub channel: String,
    /// Request verb.
    pub verb: Verb,
    /// Set on reply actions.
    pub outcome: Option<Outcome>,
}

impl ActionType {
    /// Creates a request tag.
    pub fn new(channel: impl Into<String>, verb: Verb) -> Self {
        Self {
            channel: channel.into(),
            verb,
            outcome: None,
        }
    }

    /// The success reply tag for this request.
    #[must_use]
    pub fn success(&self) -> Self {
        self.reply(Outcome::Success)
    }

    /// The failure reply tag for this request.
    #[must_use]
    pub fn failure(&self) -> Self {
        self.reply(Outcome::Failure)
    }

    fn reply(&self, outcome: Outcome) -> Self {
        Self {
            channel: self.channel.clone(),
            verb: self.verb,
            outcome: Some(outcome),
        }
    }

    /// Same channel, different verb.
    #[must_use]
    pub fn with_verb(&self, verb: Verb) -> Self {
        Self::new(self.channel.clone(), verb)
    }

    /// Whether this tag is a request the router hands to a handler.
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.outcome.is_none()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{CHANNEL_SEPARATOR}{}", self.channel, self.verb)?;
        if let Some(outcome) = self.outcome {
            write!(f, "_{}", outcome.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for ActionType {
    type Err = ParseActionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, outcome) = if let Some(rest) = s.strip_suffix("_SUCCESS") {
            (rest, Some(Outcome::Success))
        } else if let Some(rest) = s.strip_suffix("_FAILURE") {
            (rest, Some(Outcome::Failure))
        } else {
            (s, None)
        };

        // Suffixes are mutually exclusive: "__REMOVE" never matches the tail
        // of "__UNDO_REMOVE" or "__REMOVE_WITH_UNDO".
        for verb in Verb::ALL {
            let suffix = format!("{CHANNEL_SEPARATOR}{}", verb.as_str());
            if let Some(channel) = rest.strip_suffix(suffix.as_str()) {
                return Ok(Self {
                    channel: channel.to_string(),
                    verb,
                    outcome,
                });
            }
        }

        Err(ParseActionTypeError(s.to_string()))
    }
}

impl TryFrom<String> for ActionType {
    type Error = ParseActionTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.to_string()
    }
}

/// A response from the remote store, successful or not.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// Decoded response body.
    #[serde(default)]
    pub data: Value,
}

impl Response {
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    pub fn ok(data: Value) -> Self {
        Self::new(200, data)
    }
}

/// A failure attached to a `_FAILURE` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
}

/// Action payload. A superset: each handler reads only what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub key: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Extra query parameters for fetches.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_local: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_silent: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub with_notification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// The Local key a record carried before a create promoted it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_key: Option<Key>,
}

impl Payload {
    /// A payload addressing a single record.
    pub fn for_key(key: Key) -> Self {
        Self {
            key,
            table_key: None,
            form: None,
            data: None,
            params: Map::new(),
            is_local: false,
            is_silent: false,
            with_notification: false,
            response: None,
            error: None,
            replaced_key: None,
        }
    }

    pub fn with_table_key(mut self, table_key: impl Into<String>) -> Self {
        self.table_key = Some(table_key.into());
        self
    }

    pub fn with_form(mut self, form: impl Into<String>) -> Self {
        self.form = Some(form.into());
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_notification(mut self) -> Self {
        self.with_notification = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.is_silent = true;
        self
    }

    pub fn local_only(mut self) -> Self {
        self.is_local = true;
        self
    }
}

/// A typed action: tag plus payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub payload: Payload,
}

impl Action {
    pub fn new(action_type: ActionType, payload: Payload) -> Self {
        Self {
            action_type,
            payload,
        }
    }

    /// Builds a request action for a channel.
    pub fn request(channel: impl Into<String>, verb: Verb, payload: Payload) -> Self {
        Self::new(ActionType::new(channel, verb), payload)
    }

    pub fn channel(&self) -> &str {
        &self.action_type.channel
    }

    pub fn verb(&self) -> Verb {
        self.action_type.verb
    }

    /// The success reply for this request carrying `payload`.
    pub fn succeed(&self, payload: Payload) -> Self {
        Self::new(self.action_type.success(), payload)
    }

    /// The failure reply for this request, carrying the original payload
    /// with `error` attached.
    pub fn fail(&self, error: ErrorInfo) -> Self {
        let mut payload = self.payload.clone();
        payload.error = Some(error);
        Self::new(self.action_type.failure(), payload)
    }
}
