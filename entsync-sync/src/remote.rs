//! Remote store abstraction.
//!
//! The engine talks to the server only through [`RemoteStore`], so any
//! backend (the HTTP adapter in [`crate::http`], the mock below, a host's
//! own client) can be plugged in.

use async_trait::async_trait;
use entsync_types::{ErrorInfo, Key, Payload, Response};
use serde::Serialize;
use serde_json::{Map, Value};

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A failed remote call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("remote store responded with status {}", .0.status)]
    Status(Response),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteError {
    /// The server's response, when there was one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Status(response) => Some(response),
            Self::Transport(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Serializable form attached to `_FAILURE` replies.
    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            message: self.to_string(),
            status: self.response().map(|r| r.status),
            response: self.response().cloned(),
        }
    }
}

/// A CRUD request against one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRequest {
    /// Table the request addresses.
    pub table_key: Option<String>,
    /// Record the request addresses; absent on create.
    pub key: Option<Key>,
    /// Field set to write.
    pub data: Option<Map<String, Value>>,
    /// Extra query parameters.
    pub params: Map<String, Value>,
    /// Server-side custom action selector.
    pub button: Option<String>,
}

impl RemoteRequest {
    /// A request addressing a single record.
    pub fn for_key(table_key: Option<String>, key: Key) -> Self {
        Self {
            table_key,
            key: Some(key),
            ..Default::default()
        }
    }

    /// A read built from an action payload.
    pub fn from_payload(payload: &Payload, table_key: Option<String>) -> Self {
        Self {
            table_key,
            key: Some(payload.key.clone()),
            data: None,
            params: payload.params.clone(),
            button: None,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_button(mut self, button: impl Into<String>) -> Self {
        self.button = Some(button.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

/// The remote store the engine reconciles against.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Reads one record or collection.
    async fn get(&self, request: &RemoteRequest) -> RemoteResult<Response>;

    /// Creates a record, or triggers a custom action when `button` is set.
    async fn post(&self, request: &RemoteRequest) -> RemoteResult<Response>;

    /// Updates a record.
    async fn put(&self, request: &RemoteRequest) -> RemoteResult<Response>;

    /// Deletes a record.
    async fn del(&self, request: &RemoteRequest) -> RemoteResult<Response>;

    /// Generic POST for side channels selected by headers, e.g.
    /// `Function: undoDelete`.
    async fn request_post(
        &self,
        path: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> RemoteResult<Response>;
}

/// A mock remote store for testing.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Which remote operation was called.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Method {
        Get,
        Post,
        Put,
        Del,
        RequestPost,
    }

    /// A recorded call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RemoteCall {
        pub method: Method,
        /// Set for the CRUD methods.
        pub request: Option<RemoteRequest>,
        /// Set for `request_post`.
        pub path: Option<String>,
        pub body: Option<Value>,
        pub headers: Vec<(String, String)>,
    }

    /// Records every call and answers from per-method queues. An empty
    /// queue answers `200` with a `null` body.
    #[derive(Debug, Default)]
    pub struct MockRemote {
        calls: Mutex<Vec<RemoteCall>>,
        responses: Mutex<HashMap<Method, VecDeque<RemoteResult<Response>>>>,
        gates: Mutex<HashMap<Method, Arc<Notify>>>,
    }

    impl MockRemote {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues the answer for the next call of `method`.
        pub fn respond(&self, method: Method, result: RemoteResult<Response>) {
            self.responses
                .lock()
                .unwrap()
                .entry(method)
                .or_default()
                .push_back(result);
        }

        /// Makes every call of `method` wait until the returned handle is
        /// notified once per call.
        pub fn hold(&self, method: Method) -> Arc<Notify> {
            self.gates
                .lock()
                .unwrap()
                .entry(method)
                .or_insert_with(|| Arc::new(Notify::new()))
                .clone()
        }

        /// All calls so far, in order.
        pub fn calls(&self) -> Vec<RemoteCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Number of calls of `method` so far.
        pub fn count(&self, method: Method) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.method == method)
                .count()
        }

        async fn answer(&self, call: RemoteCall) -> RemoteResult<Response> {
            let method = call.method;
            self.calls.lock().unwrap().push(call);
            let gate = self.gates.lock().unwrap().get(&method).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.responses
                .lock()
                .unwrap()
                .get_mut(&method)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(Response::ok(Value::Null)))
        }

        fn crud(method: Method, request: &RemoteRequest) -> RemoteCall {
            RemoteCall {
                method,
                request: Some(request.clone()),
                path: None,
                body: None,
                headers: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl RemoteStore for MockRemote {
        async fn get(&self, request: &RemoteRequest) -> RemoteResult<Response> {
            self.answer(Self::crud(Method::Get, request)).await
        }

        async fn post(&self, request: &RemoteRequest) -> RemoteResult<Response> {
            self.answer(Self::crud(Method::Post, request)).await
        }

        async fn put(&self, request: &RemoteRequest) -> RemoteResult<Response> {
            self.answer(Self::crud(Method::Put, request)).await
        }

        async fn del(&self, request: &RemoteRequest) -> RemoteResult<Response> {
            self.answer(Self::crud(Method::Del, request)).await
        }

        async fn request_post(
            &self,
            path: &str,
            body: Value,
            headers: &[(&str, &str)],
        ) -> RemoteResult<Response> {
            self.answer(RemoteCall {
                method: Method::RequestPost,
                request: None,
                path: Some(path.to_string()),
                body: Some(body),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
            .await
        }
    }
}
