//! Recording tools
//!
//! Tools for listing and fetching Fellow meeting recordings.

use super::{
    entity_result, failure_result, filter_schema_properties, list_result, parse_args,
    pagination_schema_properties, FilterArgs,
};
use crate::client::{FellowClient, RecordingQuery, DEFAULT_RECORDING_PAGES};
use crate::server::{McpServerResult, Tool};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Tool to list meeting recordings.
pub struct ListRecordingsTool {
    client: FellowClient,
}

impl ListRecordingsTool {
    /// Create the tool over a client.
    pub fn new(client: FellowClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListRecordingsTool {
    fn definition(&self) -> ToolDefinition {
        let mut properties = filter_schema_properties();
        properties.extend(pagination_schema_properties(DEFAULT_RECORDING_PAGES));

        ToolDefinition::new(
            "list_recordings",
            "List Fellow meeting recordings, optionally filtered by title, dates, event or channel",
        )
        .with_title("List meeting recordings")
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": []
        }))
        .read_only()
    }

    #[instrument(skip(self, args), fields(tool = "list_recordings"))]
    async fn execute(&self, args: serde_json::Value) -> McpServerResult<ToolResult> {
        let params: ListRecordingsParams = parse_args(args)?;

        let query = RecordingQuery {
            filters: params.filters.into_filters()?,
            page_size: params.page_size,
            max_pages: params.max_pages,
        };
        debug!(?query, "Listing recordings");

        match self.client.list_recordings(&query).await {
            Ok(result) => Ok(list_result("recording", result)),
            Err(e) => failure_result("list recordings", e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListRecordingsParams {
    #[serde(flatten)]
    filters: FilterArgs,
    page_size: Option<u32>,
    max_pages: Option<u32>,
}

/// Tool to fetch one recording by ID.
pub struct GetRecordingTool {
    client: FellowClient,
}

impl GetRecordingTool {
    /// Create the tool over a client.
    pub fn new(client: FellowClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetRecordingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_recording",
            "Get a Fellow meeting recording by ID, including its transcript when available",
        )
        .with_title("Get meeting recording")
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "recording_id": {
                    "type": "string",
                    "description": "The recording ID"
                }
            },
            "required": ["recording_id"]
        }))
        .read_only()
    }

    #[instrument(skip(self, args), fields(tool = "get_recording"))]
    async fn execute(&self, args: serde_json::Value) -> McpServerResult<ToolResult> {
        let params: GetRecordingParams = parse_args(args)?;
        debug!("Fetching recording: {}", params.recording_id);

        match self.client.get_recording(&params.recording_id).await {
            Ok(recording) => Ok(entity_result(recording)),
            Err(e) => failure_result("get recording", e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetRecordingParams {
    recording_id: String,
}

/// Get all recording tools bound to `client`.
pub fn recording_tools(client: &FellowClient) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListRecordingsTool::new(client.clone())),
        Arc::new(GetRecordingTool::new(client.clone())),
    ]
}
