//! # Fellow MCP
//!
//! This crate provides an MCP (Model Context Protocol) server for the Fellow.ai
//! meeting-notes API, exposing notes and recordings as tools and resources.
//!
//! ## Overview
//!
//! The fellow-mcp crate handles:
//! - **Transport**: Authenticated HTTP calls to `https://{subdomain}.fellow.app`
//! - **Retries**: Bounded retry with exponential backoff and jitter on 429/5xx
//! - **Pagination**: Cursor-following aggregation over the list endpoints
//! - **Tools**: `list_notes`, `get_note`, `list_recordings`, `get_recording`
//! - **Resources**: `fellow://note/{id}` and `fellow://recording/{id}`
//! - **JSON-RPC**: Newline-delimited MCP over stdio
//!
//! ## Failure model
//!
//! Rate limiting (429) and server errors (5xx) are retried up to four attempts
//! with a 300ms initial delay that doubles each time, plus up to 200ms of
//! jitter. Exhausting the attempts yields [`FellowError::RetriesExhausted`],
//! distinct from the terminal upstream error returned for anything else.
//! A failure on any page discards the items collected so far.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fellow_mcp::{FellowClient, FellowConfig, McpServer};
//! use std::sync::Arc;
//!
//! async fn serve() -> anyhow::Result<()> {
//!     let config = FellowConfig::from_env()?;
//!     let client = FellowClient::new(config)?;
//!     Arc::new(McpServer::fellow(client)).run_stdio().await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Calling the API directly
//!
//! ```rust,no_run
//! use fellow_mcp::{FellowClient, FellowConfig, NoteQuery};
//!
//! async fn recent_notes() -> anyhow::Result<()> {
//!     let client = FellowClient::new(FellowConfig::new("acme", "api-key")?)?;
//!     let notes = client.list_notes(&NoteQuery::default()).await?;
//!     println!("{} notes", notes.count);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod pagination;
pub mod resources;
pub mod retry;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export main types
pub use client::{FellowClient, ListFilters, NoteInclude, NoteQuery, RecordingQuery};
pub use config::{ConfigError, FellowConfig};
pub use error::{FellowError, FellowResult};
pub use executor::CallExecutor;
pub use pagination::{aggregate, normalize_page, Aggregate, Page, PagePolicy, PageRequest};
pub use resources::FellowResource;
pub use retry::{with_retry_if, RetryError, RetryPolicy, Sleeper, TokioSleeper};
pub use server::{McpServer, McpServerError, McpServerResult, Tool};
pub use transport::{FailureKind, HttpTransport, Method, RequestDescriptor, Transport, TransportError};
pub use types::{
    ContentBlock, McpError, McpRequest, McpResponse, RequestId, ResourceCapabilities,
    ResourceContents, ResourceTemplate, ServerCapabilities, ServerInfo, ToolCall,
    ToolCapabilities, ToolDefinition, ToolResult,
};

// Re-export tool collections
pub use tools::{all_tools, note_tools, recording_tools};
