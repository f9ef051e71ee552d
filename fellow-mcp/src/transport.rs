//! HTTP transport for the Fellow API.
//!
//! The transport performs exactly one network attempt per call and classifies
//! every failure into a [`FailureKind`] at this boundary. Callers above it
//! (the retry executor) only ever look at the kind, never at raw HTTP or
//! reqwest errors.

use crate::config::FellowConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Header carrying the Fellow API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// HTTP method of a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read.
    Get,
    /// Write / query with body.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A single outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,

    /// Path relative to the configured base URL.
    pub path: String,

    /// Optional JSON body.
    pub body: Option<Value>,
}

impl RequestDescriptor {
    /// Create a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Create a POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Classified failure of a single transport attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    /// Any other non-success status.
    ClientError,
    /// Connection failure, timeout, or other transport fault.
    Network,
    /// Success status with an undecodable body.
    InvalidResponse,
}

impl FailureKind {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => FailureKind::RateLimited,
            500..=599 => FailureKind::ServerError,
            _ => FailureKind::ClientError,
        }
    }

    /// Whether a failure of this kind may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::RateLimited | FailureKind::ServerError)
    }
}

/// Error returned by a transport attempt.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}", describe(.kind, .status, .message))]
pub struct TransportError {
    /// Failure classification.
    pub kind: FailureKind,

    /// HTTP status, when the upstream answered.
    pub status: Option<u16>,

    /// Upstream message or transport error text.
    pub message: String,
}

fn describe(kind: &FailureKind, status: &Option<u16>, message: &str) -> String {
    match (kind, status) {
        (_, Some(status)) => format!("Fellow API error ({}): {}", status, message),
        (FailureKind::InvalidResponse, None) => format!("Invalid Fellow API response: {}", message),
        _ => format!("Fellow API request failed: {}", message),
    }
}

impl TransportError {
    /// Error for a non-success HTTP status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::from_status(status),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Error for a network-level fault.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Network,
            status: None,
            message: message.into(),
        }
    }

    /// Error for an undecodable response body.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::InvalidResponse,
            status: None,
            message: message.into(),
        }
    }

    /// Whether the failure may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// One network attempt against the upstream API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the decoded JSON body.
    async fn send(&self, request: &RequestDescriptor) -> Result<Value, TransportError>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    /// HTTP client instance.
    client: Client,

    /// Immutable API configuration.
    config: FellowConfig,
}

impl HttpTransport {
    /// Create a transport for the given configuration.
    pub fn new(config: FellowConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("fellow-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Turn a response into a decoded body or a classified error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value, TransportError> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                });
            warn!("Fellow API error ({}): {}", status.as_u16(), message);
            return Err(TransportError::status(status.as_u16(), message));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| TransportError::invalid_response(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: &RequestDescriptor) -> Result<Value, TransportError> {
        let url = self.config.url(&request.path);
        debug!("Sending Fellow API request to {}", url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        builder = builder
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        self.handle_response(response).await
    }
}
