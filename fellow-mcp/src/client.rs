//! Fellow API client.
//!
//! HTTP client for the Fellow.ai meeting-notes API. Provides note and
//! recording listing (paginated) and lookup by identifier. Every request goes
//! through the retrying [`CallExecutor`].

use crate::config::FellowConfig;
use crate::error::{FellowError, FellowResult};
use crate::executor::CallExecutor;
use crate::pagination::{aggregate, Aggregate, PagePolicy, PageRequest};
use crate::retry::Sleeper;
use crate::transport::{HttpTransport, RequestDescriptor, Transport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Notes list endpoint.
pub const NOTES_PATH: &str = "/api/v1/notes";
/// Recordings list endpoint.
pub const RECORDINGS_PATH: &str = "/api/v1/recordings";

/// Default page size for list calls.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Default page ceiling for notes.
pub const DEFAULT_NOTE_PAGES: u32 = 3;
/// Default page ceiling for recordings.
pub const DEFAULT_RECORDING_PAGES: u32 = 2;

/// Fellow service client.
///
/// Cheap to clone; all clones share the same immutable transport.
#[derive(Clone)]
pub struct FellowClient {
    executor: CallExecutor,
    pages: PagePolicy,
}

impl FellowClient {
    /// Create a client talking HTTP to the configured workspace.
    pub fn new(config: FellowConfig) -> FellowResult<Self> {
        let retry = config.retry.clone();
        let pages = config.pages.clone();
        let transport = HttpTransport::new(config)?;
        Ok(Self::from_executor(
            CallExecutor::new(Arc::new(transport), retry),
            pages,
        ))
    }

    /// Create a client over an arbitrary transport and wait implementation.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        config: &FellowConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self::from_executor(
            CallExecutor::with_sleeper(transport, config.retry.clone(), sleeper),
            config.pages.clone(),
        )
    }

    fn from_executor(executor: CallExecutor, pages: PagePolicy) -> Self {
        Self { executor, pages }
    }

    /// List notes matching the query, across up to `max_pages` pages.
    #[instrument(skip(self, query))]
    pub async fn list_notes(&self, query: &NoteQuery) -> FellowResult<Aggregate> {
        let request = PageRequest::new(
            NOTES_PATH,
            "notes",
            query.body(),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            query.max_pages.unwrap_or(DEFAULT_NOTE_PAGES),
        )?;
        let result = aggregate(&self.executor, &request, &self.pages).await?;
        debug!(count = result.count, "Listed notes");
        Ok(result)
    }

    /// List recordings matching the query, across up to `max_pages` pages.
    #[instrument(skip(self, query))]
    pub async fn list_recordings(&self, query: &RecordingQuery) -> FellowResult<Aggregate> {
        let request = PageRequest::new(
            RECORDINGS_PATH,
            "recordings",
            query.body(),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            query.max_pages.unwrap_or(DEFAULT_RECORDING_PAGES),
        )?;
        let result = aggregate(&self.executor, &request, &self.pages).await?;
        debug!(count = result.count, "Listed recordings");
        Ok(result)
    }

    /// Get a note by ID.
    #[instrument(skip(self))]
    pub async fn get_note(&self, note_id: &str) -> FellowResult<Value> {
        self.get_entity("note", note_id).await
    }

    /// Get a recording by ID.
    #[instrument(skip(self))]
    pub async fn get_recording(&self, recording_id: &str) -> FellowResult<Value> {
        self.get_entity("recording", recording_id).await
    }

    async fn get_entity(&self, kind: &'static str, id: &str) -> FellowResult<Value> {
        let id = validate_id(kind, id)?;
        let path = format!("/api/v1/{}/{}", kind, id);
        let body = self.executor.execute(&RequestDescriptor::get(path)).await?;

        extract_entity(body, kind).ok_or_else(|| FellowError::NotFound {
            kind,
            id: id.to_string(),
        })
    }
}

/// Reject identifiers that would escape their path segment.
fn validate_id<'a>(kind: &str, id: &'a str) -> FellowResult<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(FellowError::InvalidArgument(format!("{} id must not be empty", kind)));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        || id == "."
        || id == ".."
    {
        return Err(FellowError::InvalidArgument(format!(
            "{} id '{}' contains unsupported characters",
            kind, id
        )));
    }
    Ok(id)
}

/// Pull the entity out of a get-by-id response.
///
/// The entity is expected under `kind`; a root object carrying an `id` is
/// accepted as the entity itself. Anything else counts as empty.
fn extract_entity(body: Value, kind: &str) -> Option<Value> {
    match body {
        Value::Object(mut map) => match map.remove(kind) {
            Some(entity @ Value::Object(_)) => Some(entity),
            Some(_) => None,
            None if map.get("id").is_some_and(|id| !id.is_null()) => Some(Value::Object(map)),
            None => None,
        },
        _ => None,
    }
}

/// Filters shared by the list endpoints. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFilters {
    /// Title substring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Created at or after (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_start: Option<String>,

    /// Created at or before (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_end: Option<String>,

    /// Updated at or after (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at_start: Option<String>,

    /// Updated at or before (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at_end: Option<String>,

    /// Calendar event GUID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_guid: Option<String>,

    /// Fellow channel ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl ListFilters {
    /// Whether no filter is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Optional note fields to embed in list results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteInclude {
    /// Include the note body as markdown.
    #[serde(default)]
    pub content_markdown: bool,

    /// Include calendar event attendees.
    #[serde(default)]
    pub event_attendees: bool,
}

/// Query for the notes list endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteQuery {
    pub filters: ListFilters,
    pub include: NoteInclude,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
}

impl NoteQuery {
    /// Request body template, without pagination.
    pub fn body(&self) -> Value {
        let mut body = serde_json::Map::new();
        if !self.filters.is_empty() {
            body.insert("filters".to_string(), serde_json::json!(self.filters));
        }
        if self.include != NoteInclude::default() {
            body.insert("include".to_string(), serde_json::json!(self.include));
        }
        Value::Object(body)
    }
}

/// Query for the recordings list endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingQuery {
    pub filters: ListFilters,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
}

impl RecordingQuery {
    /// Request body template, without pagination.
    pub fn body(&self) -> Value {
        if self.filters.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::json!({ "filters": self.filters })
        }
    }
}
