//! Fellow MCP tools
//!
//! Each tool decodes its arguments, calls the [`FellowClient`], and renders
//! the outcome as text plus structured content. Upstream and not-found
//! failures become error results; malformed arguments are rejected as
//! invalid params.

pub mod notes;
pub mod recordings;

pub use notes::*;
pub use recordings::*;

use crate::client::{FellowClient, ListFilters};
use crate::error::FellowError;
use crate::pagination::Aggregate;
use crate::server::{McpServerError, McpServerResult, Tool};
use crate::types::ToolResult;
use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Get all available MCP tools, bound to one client.
///
/// # Example
///
/// ```rust,no_run
/// use fellow_mcp::{tools::all_tools, FellowClient, FellowConfig};
///
/// let client = FellowClient::new(FellowConfig::from_env().unwrap()).unwrap();
/// let tools = all_tools(&client);
/// assert_eq!(tools.len(), 4);
/// ```
pub fn all_tools(client: &FellowClient) -> Vec<Arc<dyn Tool>> {
    let mut tools = Vec::new();
    tools.extend(note_tools(client));
    tools.extend(recording_tools(client));
    tools
}

/// Decode tool arguments; `null` is treated as an empty object.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> McpServerResult<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| McpServerError::InvalidParams(e.to_string()))
}

/// Filter arguments shared by the list tools.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FilterArgs {
    title: Option<String>,
    created_at_start: Option<String>,
    created_at_end: Option<String>,
    updated_at_start: Option<String>,
    updated_at_end: Option<String>,
    event_guid: Option<String>,
    channel_id: Option<String>,
}

impl FilterArgs {
    /// Validate date bounds and convert into client filters.
    pub(crate) fn into_filters(self) -> McpServerResult<ListFilters> {
        Ok(ListFilters {
            title: non_empty(self.title),
            created_at_start: validate_timestamp("created_at_start", self.created_at_start)?,
            created_at_end: validate_timestamp("created_at_end", self.created_at_end)?,
            updated_at_start: validate_timestamp("updated_at_start", self.updated_at_start)?,
            updated_at_end: validate_timestamp("updated_at_end", self.updated_at_end)?,
            event_guid: non_empty(self.event_guid),
            channel_id: non_empty(self.channel_id),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
pub(crate) fn validate_timestamp(
    field: &str,
    value: Option<String>,
) -> McpServerResult<Option<String>> {
    let Some(value) = non_empty(value) else {
        return Ok(None);
    };

    if DateTime::parse_from_rfc3339(&value).is_ok()
        || NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_ok()
    {
        Ok(Some(value))
    } else {
        Err(McpServerError::InvalidParams(format!(
            "{} must be an ISO 8601 date or timestamp, got '{}'",
            field, value
        )))
    }
}

/// JSON Schema fragment for the shared filter arguments.
pub(crate) fn filter_schema_properties() -> serde_json::Map<String, Value> {
    let date = |description: &str| {
        serde_json::json!({
            "type": "string",
            "description": description
        })
    };

    let mut properties = serde_json::Map::new();
    properties.insert(
        "title".to_string(),
        serde_json::json!({"type": "string", "description": "Match on title"}),
    );
    properties.insert(
        "created_at_start".to_string(),
        date("Created on or after (ISO 8601 date or timestamp)"),
    );
    properties.insert(
        "created_at_end".to_string(),
        date("Created on or before (ISO 8601 date or timestamp)"),
    );
    properties.insert(
        "updated_at_start".to_string(),
        date("Updated on or after (ISO 8601 date or timestamp)"),
    );
    properties.insert(
        "updated_at_end".to_string(),
        date("Updated on or before (ISO 8601 date or timestamp)"),
    );
    properties.insert(
        "event_guid".to_string(),
        serde_json::json!({"type": "string", "description": "Calendar event GUID"}),
    );
    properties.insert(
        "channel_id".to_string(),
        serde_json::json!({"type": "string", "description": "Fellow channel ID"}),
    );
    properties
}

/// JSON Schema fragments for the pagination arguments.
pub(crate) fn pagination_schema_properties(default_pages: u32) -> serde_json::Map<String, Value> {
    let mut properties = serde_json::Map::new();
    properties.insert(
        "page_size".to_string(),
        serde_json::json!({
            "type": "integer",
            "minimum": crate::pagination::MIN_PAGE_SIZE,
            "maximum": crate::pagination::MAX_PAGE_SIZE,
            "default": crate::client::DEFAULT_PAGE_SIZE,
            "description": "Items per page"
        }),
    );
    properties.insert(
        "max_pages".to_string(),
        serde_json::json!({
            "type": "integer",
            "minimum": crate::pagination::MIN_PAGES,
            "maximum": crate::pagination::MAX_PAGES,
            "default": default_pages,
            "description": "Maximum number of pages to fetch"
        }),
    );
    properties
}

/// Render a list result: a count line followed by one line per item.
pub(crate) fn list_result(noun: &str, result: Aggregate) -> ToolResult {
    let mut text = format!(
        "Found {} {}{}",
        result.count,
        noun,
        if result.count == 1 { "" } else { "s" }
    );
    for item in &result.items {
        text.push('\n');
        text.push_str("- ");
        text.push_str(&summarize_item(item));
    }
    ToolResult::structured(text, result.to_value())
}

/// Render a single entity as pretty JSON with structured content.
pub(crate) fn entity_result(entity: Value) -> ToolResult {
    let text = serde_json::to_string_pretty(&entity).unwrap_or_else(|_| entity.to_string());
    ToolResult::structured(text, entity)
}

/// One-line summary: title, id, and creation time when present.
pub(crate) fn summarize_item(item: &Value) -> String {
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or("(untitled)");

    let mut line = title.to_string();
    match item.get("id") {
        Some(Value::String(id)) => line.push_str(&format!(" [{}]", id)),
        Some(Value::Null) | None => {}
        Some(other) => line.push_str(&format!(" [{}]", other)),
    }
    if let Some(created) = item.get("created_at").and_then(Value::as_str) {
        line.push_str(&format!(" created {}", created));
    }
    line
}

/// Map a client failure onto the tool boundary.
///
/// Argument problems are protocol errors; everything else is reported to the
/// model as an error result carrying the failure message.
pub(crate) fn failure_result(action: &str, err: FellowError) -> McpServerResult<ToolResult> {
    match err {
        FellowError::InvalidArgument(message) => Err(McpServerError::InvalidParams(message)),
        other => {
            tracing::error!("Failed to {}: {}", action, other);
            Ok(ToolResult::error(format!("Failed to {}: {}", action, other)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FellowConfig;
    use serde_json::json;

    fn client() -> FellowClient {
        FellowClient::new(FellowConfig::new("acme", "key").unwrap()).unwrap()
    }

    #[test]
    fn test_all_tools_unique_names() {
        let tools = all_tools(&client());
        assert_eq!(tools.len(), 4);

        let mut names = std::collections::HashSet::new();
        for tool in tools {
            let def = tool.definition();
            assert!(names.insert(def.name.clone()), "Duplicate tool name: {}", def.name);
        }
        assert!(names.contains("list_notes"));
        assert!(names.contains("get_note"));
        assert!(names.contains("list_recordings"));
        assert!(names.contains("get_recording"));
    }

    #[test]
    fn test_validate_timestamp() {
        assert_eq!(
            validate_timestamp("f", Some("2025-01-31".to_string())).unwrap(),
            Some("2025-01-31".to_string())
        );
        assert!(validate_timestamp("f", Some("2025-01-31T09:00:00Z".to_string()))
            .unwrap()
            .is_some());
        assert_eq!(validate_timestamp("f", Some("  ".to_string())).unwrap(), None);
        assert!(matches!(
            validate_timestamp("f", Some("last tuesday".to_string())),
            Err(McpServerError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_parse_args_null_is_empty_object() {
        let args: FilterArgs = parse_args(Value::Null).unwrap();
        assert!(args.into_filters().unwrap().is_empty());

        let err = parse_args::<FilterArgs>(json!({"title": 5})).unwrap_err();
        assert!(matches!(err, McpServerError::InvalidParams(_)));
    }

    #[test]
    fn test_list_result_rendering() {
        let result = list_result(
            "note",
            Aggregate::from_items(vec![
                json!({"id": "n1", "title": "Standup", "created_at": "2025-01-02T10:00:00Z"}),
                json!({"id": 7}),
            ]),
        );
        let text = result.text_content();
        assert!(text.starts_with("Found 2 notes"));
        assert!(text.contains("- Standup [n1] created 2025-01-02T10:00:00Z"));
        assert!(text.contains("- (untitled) [7]"));
        assert_eq!(result.structured_content.unwrap()["count"], 2);
    }

    #[test]
    fn test_failure_result_mapping() {
        let invalid = failure_result("list notes", FellowError::InvalidArgument("bad".into()));
        assert!(matches!(invalid, Err(McpServerError::InvalidParams(_))));

        let exhausted =
            failure_result("list notes", FellowError::RetriesExhausted { attempts: 4 }).unwrap();
        assert!(exhausted.is_error);
        assert!(exhausted.text_content().contains("unavailable after 4 attempts"));
    }
}
