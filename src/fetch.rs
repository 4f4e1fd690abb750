//! Content fetching: one HTTP call in, one uniform envelope out.
//!
//! Every section of the site gets its data through [`fetch_json`], which
//! never fails from the caller's point of view. Transport errors, upstream
//! errors and malformed bodies all come back as an [`Envelope`] with
//! `success: false`, a readable `error`, and a `status` that is the upstream
//! HTTP status, or `0` when the failure happened on our side.
//!
//! ## Transport seam
//!
//! The HTTP layer sits behind the [`Transport`] trait. Production uses
//! [`HttpTransport`] (reqwest's blocking client); tests use a recording mock
//! so the envelope and unwrapping logic can be exercised without a network.
//!
//! ## Cancellation
//!
//! A [`CancelToken`] is passed into every fetch. A cancelled token means the
//! request is never sent; a token cancelled while a request is in flight
//! means its result is discarded. The underlying request is not aborted.
//!
//! There are no retries, no caching and no deduplication: two sections that
//! need the same collection fetch it twice.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Message used for every body that does not have the expected shape.
pub const INVALID_RESPONSE: &str = "Invalid response";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Invalid response: {detail}")]
    InvalidResponse { status: u16, detail: String },
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Status reported in the envelope: upstream status, or 0 for
    /// client-side failures.
    pub fn status(&self) -> u16 {
        match self {
            FetchError::Upstream { status, .. } | FetchError::InvalidResponse { status, .. } => {
                *status
            }
            FetchError::Transport(_) | FetchError::Cancelled => 0,
        }
    }
}

/// Uniform result of a fetch: `{success, data, error, status}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: u16,
}

impl<T> Envelope<T> {
    pub fn ok(data: T, status: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status,
        }
    }

    pub fn failed(error: impl Into<String>, status: u16) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status,
        }
    }

    pub fn from_result(result: Result<(T, u16), FetchError>) -> Self {
        match result {
            Ok((data, status)) => Self::ok(data, status),
            Err(e) => Self::failed(e.to_string(), e.status()),
        }
    }

    /// Fallible form of the envelope for code that wants `?`.
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self
                .error
                .unwrap_or_else(|| INVALID_RESPONSE.to_string())),
        }
    }
}

/// Shared cancellation flag for a group of fetches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound request, independent of the HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client abstraction. `Sync` so one transport serves the rayon pool.
pub trait Transport: Sync {
    /// Perform the request. `Err` only for failures before a status arrives.
    fn send(&self, request: &Request) -> Result<RawResponse, String>;
}

/// Production transport over reqwest's blocking client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport. `timeout: None` leaves requests unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        // The blocking client defaults to a 30s timeout; `None` clears it.
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("nulp-site/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("HTTP client error: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<RawResponse, String> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        let mut builder = builder
            .query(&request.query)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let resp = builder.send().map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| e.to_string())?;
        Ok(RawResponse { status, body })
    }
}

/// Send a request and parse the JSON body.
///
/// Returns the parsed body with its status, or the classified failure.
pub fn send_json(
    transport: &impl Transport,
    request: &Request,
    cancel: &CancelToken,
) -> Result<(Value, u16), FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    tracing::debug!(method = ?request.method, url = %request.url, query = ?request.query, "fetch");

    let response = transport.send(request).map_err(FetchError::Transport)?;

    if cancel.is_cancelled() {
        tracing::debug!(url = %request.url, "discarding response for cancelled fetch");
        return Err(FetchError::Cancelled);
    }

    if !(200..300).contains(&response.status) {
        return Err(FetchError::Upstream {
            status: response.status,
            message: upstream_message(&response.body),
        });
    }

    let body: Value =
        serde_json::from_str(&response.body).map_err(|e| FetchError::InvalidResponse {
            status: response.status,
            detail: e.to_string(),
        })?;
    Ok((body, response.status))
}

/// Fetch a JSON document. Never fails; see the [module docs](self).
pub fn fetch_json(
    transport: &impl Transport,
    request: &Request,
    cancel: &CancelToken,
) -> Envelope<Value> {
    let result = send_json(transport, request, cancel);
    if let Err(e) = &result {
        tracing::warn!(url = %request.url, error = %e, "fetch failed");
    }
    Envelope::from_result(result)
}

/// Best-effort error message from an upstream error body.
fn upstream_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["error", "message"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

/// Unwrap a collection out of a CMS envelope body.
///
/// The CMS answers `{success, data, meta}` where `data` is either the item
/// array or a nested `{data: [...]}`. A body with `success: false` is an
/// upstream error even when the HTTP status was 2xx.
pub fn unwrap_collection(body: Value, status: u16) -> Result<Vec<Value>, FetchError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(FetchError::Upstream {
            status,
            message: upstream_message(&body.to_string()),
        });
    }
    let data = match body {
        Value::Object(mut map) => map.remove("data"),
        Value::Array(items) => Some(Value::Array(items)),
        _ => None,
    };
    match data {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Object(mut nested)) => match nested.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(invalid(status, "nested data is not an array")),
        },
        Some(Value::Null) => Ok(Vec::new()),
        _ => Err(invalid(status, "missing data")),
    }
}

pub(crate) fn invalid(status: u16, detail: &str) -> FetchError {
    FetchError::InvalidResponse {
        status,
        detail: detail.to_string(),
    }
}
