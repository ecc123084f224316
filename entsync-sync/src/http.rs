//! HTTP remote store.
//!
//! Every table is served at `{base_url}/{tableKey}/json/v2`:
//! - `GET` with the key and extra parameters in the query string
//! - `POST` (create or custom action) and `PUT` (update) with a
//!   `{ "parameters": {...}, "data": {...} }` body
//! - `DELETE` with the key in the query string
//!
//! The undo side channel posts to an explicit path with extra headers.

use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteError, RemoteRequest, RemoteResult, RemoteStore};
use async_trait::async_trait;
use entsync_types::Response;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// HTTP remote store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRemoteConfig {
    /// Server root, e.g. `https://example.com/api`. No trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 60,
        }
    }
}

/// [`RemoteStore`] over HTTP/JSON.
pub struct HttpRemoteStore {
    config: HttpRemoteConfig,
    client: Client,
}

impl HttpRemoteStore {
    /// Creates a new HTTP remote store.
    pub fn new(config: HttpRemoteConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn table_url(&self, request: &RemoteRequest) -> RemoteResult<String> {
        let table_key = request
            .table_key
            .as_deref()
            .ok_or_else(|| RemoteError::InvalidRequest("missing table key".to_string()))?;
        Ok(format!(
            "{}/{}/json/v2",
            self.config.base_url.trim_end_matches('/'),
            table_key
        ))
    }

    fn query(request: &RemoteRequest) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(key) = &request.key {
            query.push(("key".to_string(), key.to_string()));
        }
        for (name, value) in &request.params {
            query.push((name.clone(), query_value(value)));
        }
        query
    }

    fn body(request: &RemoteRequest) -> Value {
        let mut parameters = request.params.clone();
        if let Some(key) = &request.key {
            parameters.insert("key".to_string(), key.to_json());
        }
        if let Some(button) = &request.button {
            parameters.insert("button".to_string(), Value::String(button.clone()));
        }
        json!({
            "parameters": parameters,
            "data": request.data.clone().unwrap_or_default(),
        })
    }

    async fn with_body(&self, method: Method, request: &RemoteRequest) -> RemoteResult<Response> {
        let url = self.table_url(request)?;
        debug!("{} {}", method, url);
        send(self.client.request(method, url).json(&Self::body(request))).await
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn get(&self, request: &RemoteRequest) -> RemoteResult<Response> {
        let url = self.table_url(request)?;
        debug!("GET {}", url);
        send(self.client.get(url).query(&Self::query(request))).await
    }

    async fn post(&self, request: &RemoteRequest) -> RemoteResult<Response> {
        self.with_body(Method::POST, request).await
    }

    async fn put(&self, request: &RemoteRequest) -> RemoteResult<Response> {
        self.with_body(Method::PUT, request).await
    }

    async fn del(&self, request: &RemoteRequest) -> RemoteResult<Response> {
        let url = self.table_url(request)?;
        debug!("DELETE {}", url);
        send(self.client.delete(url).query(&Self::query(request))).await
    }

    async fn request_post(
        &self,
        path: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> RemoteResult<Response> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!("POST {} {:?}", url, headers);
        let mut builder = self.client.post(url).json(&body);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        send(builder).await
    }
}

async fn send(builder: RequestBuilder) -> RemoteResult<Response> {
    let response = builder
        .send()
        .await
        .map_err(|e| RemoteError::Transport(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| RemoteError::Transport(format!("failed to read response: {e}")))?;
    let data = decode(&text);

    let response = Response::new(status.as_u16(), data);
    if status.is_success() {
        Ok(response)
    } else {
        Err(RemoteError::Status(response))
    }
}

/// Empty bodies decode to `null`, non-JSON bodies to a string.
fn decode(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
