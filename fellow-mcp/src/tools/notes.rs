//! Note tools
//!
//! Tools for listing and fetching Fellow meeting notes.

use super::{
    entity_result, failure_result, filter_schema_properties, list_result, parse_args,
    pagination_schema_properties, FilterArgs,
};
use crate::client::{FellowClient, NoteInclude, NoteQuery, DEFAULT_NOTE_PAGES};
use crate::server::{McpServerResult, Tool};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Tool to list meeting notes.
///
/// Walks the notes endpoint page by page (up to `max_pages`) and returns the
/// collected notes.
pub struct ListNotesTool {
    client: FellowClient,
}

impl ListNotesTool {
    /// Create the tool over a client.
    pub fn new(client: FellowClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListNotesTool {
    fn definition(&self) -> ToolDefinition {
        let mut properties = filter_schema_properties();
        properties.extend(pagination_schema_properties(DEFAULT_NOTE_PAGES));
        properties.insert(
            "include_content".to_string(),
            serde_json::json!({
                "type": "boolean",
                "description": "Include each note's body as markdown",
                "default": false
            }),
        );
        properties.insert(
            "include_attendees".to_string(),
            serde_json::json!({
                "type": "boolean",
                "description": "Include calendar event attendees",
                "default": false
            }),
        );

        ToolDefinition::new(
            "list_notes",
            "List Fellow meeting notes, optionally filtered by title, dates, event or channel",
        )
        .with_title("List meeting notes")
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": []
        }))
        .read_only()
    }

    #[instrument(skip(self, args), fields(tool = "list_notes"))]
    async fn execute(&self, args: serde_json::Value) -> McpServerResult<ToolResult> {
        let params: ListNotesParams = parse_args(args)?;

        let query = NoteQuery {
            filters: params.filters.into_filters()?,
            include: NoteInclude {
                content_markdown: params.include_content,
                event_attendees: params.include_attendees,
            },
            page_size: params.page_size,
            max_pages: params.max_pages,
        };
        debug!(?query, "Listing notes");

        match self.client.list_notes(&query).await {
            Ok(result) => Ok(list_result("note", result)),
            Err(e) => failure_result("list notes", e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListNotesParams {
    #[serde(flatten)]
    filters: FilterArgs,
    #[serde(default)]
    include_content: bool,
    #[serde(default)]
    include_attendees: bool,
    page_size: Option<u32>,
    max_pages: Option<u32>,
}

/// Tool to fetch one note by ID.
pub struct GetNoteTool {
    client: FellowClient,
}

impl GetNoteTool {
    /// Create the tool over a client.
    pub fn new(client: FellowClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetNoteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_note", "Get a Fellow meeting note by ID, including its content")
            .with_title("Get meeting note")
            .with_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "note_id": {
                        "type": "string",
                        "description": "The note ID"
                    }
                },
                "required": ["note_id"]
            }))
            .read_only()
    }

    #[instrument(skip(self, args), fields(tool = "get_note"))]
    async fn execute(&self, args: serde_json::Value) -> McpServerResult<ToolResult> {
        let params: GetNoteParams = parse_args(args)?;
        debug!("Fetching note: {}", params.note_id);

        match self.client.get_note(&params.note_id).await {
            Ok(note) => Ok(entity_result(note)),
            Err(e) => failure_result("get note", e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetNoteParams {
    note_id: String,
}

/// Get all note tools bound to `client`.
pub fn note_tools(client: &FellowClient) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListNotesTool::new(client.clone())),
        Arc::new(GetNoteTool::new(client.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FellowConfig;
    use crate::server::McpServerError;

    fn client() -> FellowClient {
        FellowClient::new(FellowConfig::new("acme", "key").unwrap()).unwrap()
    }

    #[test]
    fn test_list_notes_definition() {
        let def = ListNotesTool::new(client()).definition();
        assert_eq!(def.name, "list_notes");

        let properties = &def.input_schema["properties"];
        assert_eq!(properties["max_pages"]["default"], 3);
        assert_eq!(properties["page_size"]["maximum"], 50);
        assert!(properties.get("created_at_start").is_some());
        assert!(properties.get("include_content").is_some());
    }

    #[test]
    fn test_get_note_definition_requires_id() {
        let def = GetNoteTool::new(client()).definition();
        assert_eq!(def.input_schema["required"], serde_json::json!(["note_id"]));
    }

    #[tokio::test]
    async fn test_get_note_missing_id_is_invalid_params() {
        let err = GetNoteTool::new(client())
            .execute(serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_list_notes_rejects_bad_date_before_calling_api() {
        let err = ListNotesTool::new(client())
            .execute(serde_json::json!({"created_at_start": "yesterday"}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));
    }
}
