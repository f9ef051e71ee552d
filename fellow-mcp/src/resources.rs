//! Resource templates for notes and recordings.
//!
//! Notes and recordings are addressable as `fellow://note/{id}` and
//! `fellow://recording/{id}`. Reading one fetches the entity through the
//! client and returns it as JSON text.

use crate::client::FellowClient;
use crate::error::FellowError;
use crate::server::{McpServerError, McpServerResult};
use crate::types::{ResourceContents, ResourceTemplate};

/// URI scheme of Fellow resources.
pub const SCHEME: &str = "fellow://";

const JSON_MIME: &str = "application/json";

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FellowResource {
    /// `fellow://note/{id}`
    Note(String),
    /// `fellow://recording/{id}`
    Recording(String),
}

impl FellowResource {
    /// Parse a `fellow://` URI. Returns `None` for unknown URIs.
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(SCHEME)?;
        let (kind, id) = rest.split_once('/')?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        match kind {
            "note" => Some(FellowResource::Note(id.to_string())),
            "recording" => Some(FellowResource::Recording(id.to_string())),
            _ => None,
        }
    }

    /// Fetch the resource and render it as JSON text.
    pub async fn read(&self, client: &FellowClient, uri: &str) -> McpServerResult<ResourceContents> {
        let entity = match self {
            FellowResource::Note(id) => client.get_note(id).await,
            FellowResource::Recording(id) => client.get_recording(id).await,
        }
        .map_err(|e| match e {
            FellowError::NotFound { .. } => McpServerError::ResourceNotFound(uri.to_string()),
            FellowError::InvalidArgument(message) => McpServerError::InvalidParams(message),
            other => McpServerError::ExecutionError(other.to_string()),
        })?;

        let text = serde_json::to_string_pretty(&entity)
            .map_err(|e| McpServerError::Internal(e.to_string()))?;

        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: Some(JSON_MIME.to_string()),
            text,
        })
    }
}

/// Resource templates advertised by the server.
pub fn resource_templates() -> Vec<ResourceTemplate> {
    vec![
        ResourceTemplate {
            uri_template: format!("{}note/{{note_id}}", SCHEME),
            name: "Fellow note".to_string(),
            description: Some("A Fellow meeting note, as JSON".to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        },
        ResourceTemplate {
            uri_template: format!("{}recording/{{recording_id}}", SCHEME),
            name: "Fellow recording".to_string(),
            description: Some("A Fellow meeting recording, as JSON".to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        },
    ]
}
