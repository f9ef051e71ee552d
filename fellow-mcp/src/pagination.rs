//! Cursor-based page aggregation.
//!
//! Fellow list endpoints answer with a page of items plus a continuation
//! cursor. Depending on the endpoint and API version the page is either nested
//! under a resource key:
//!
//! ```json
//! { "notes": { "data": [ ... ], "page_info": { "cursor": "abc", "page_size": 20 } } }
//! ```
//!
//! or placed at the root:
//!
//! ```json
//! { "data": [ ... ], "page_info": { "cursor": null } }
//! ```
//!
//! [`normalize_page`] reduces both to a [`Page`]; [`aggregate`] walks pages
//! until the cursor runs out or the page ceiling is hit.

use crate::error::{FellowError, FellowResult};
use crate::executor::CallExecutor;
use crate::transport::RequestDescriptor;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Smallest accepted page size.
pub const MIN_PAGE_SIZE: u32 = 1;
/// Largest page size the Fellow API accepts.
pub const MAX_PAGE_SIZE: u32 = 50;
/// Smallest accepted page ceiling.
pub const MIN_PAGES: u32 = 1;
/// Largest page ceiling a single call may request.
pub const MAX_PAGES: u32 = 20;

/// Pacing between successive page fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePolicy {
    /// Fixed pause before fetching the next page.
    pub page_delay: Duration,
}

impl Default for PagePolicy {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(350),
        }
    }
}

/// One page reduced to its items and continuation cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_cursor: Option<String>,
}

/// Items collected across pages, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    /// Always equal to `items.len()`.
    pub count: usize,
    pub items: Vec<Value>,
}

impl Aggregate {
    /// Build an aggregate from collected items.
    pub fn from_items(items: Vec<Value>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }

    /// Serialize as a `{count, items}` JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "count": self.count,
            "items": self.items,
        })
    }
}

/// A validated paginated list request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Endpoint path, fetched with POST.
    pub endpoint: String,

    /// Key the nested envelope lives under (e.g. `notes`).
    pub envelope_key: String,

    /// Filters and include flags merged into every page body.
    pub body_template: Map<String, Value>,

    /// Items requested per page.
    pub page_size: u32,

    /// Maximum pages to fetch.
    pub max_pages: u32,
}

impl PageRequest {
    /// Create a request, validating the page bounds and body template.
    pub fn new(
        endpoint: impl Into<String>,
        envelope_key: impl Into<String>,
        body_template: Value,
        page_size: u32,
        max_pages: u32,
    ) -> FellowResult<Self> {
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(FellowError::InvalidArgument(format!(
                "page_size must be between {} and {}, got {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE, page_size
            )));
        }
        if !(MIN_PAGES..=MAX_PAGES).contains(&max_pages) {
            return Err(FellowError::InvalidArgument(format!(
                "max_pages must be between {} and {}, got {}",
                MIN_PAGES, MAX_PAGES, max_pages
            )));
        }

        let body_template = match body_template {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(FellowError::InvalidArgument(format!(
                    "request body must be a JSON object, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            endpoint: endpoint.into(),
            envelope_key: envelope_key.into(),
            body_template,
            page_size,
            max_pages,
        })
    }

    /// Body for one page: the template plus a `pagination` object.
    ///
    /// The cursor is omitted entirely when absent.
    pub fn page_body(&self, cursor: Option<&str>) -> Value {
        let mut pagination = Map::new();
        if let Some(cursor) = cursor {
            pagination.insert("cursor".to_string(), Value::String(cursor.to_string()));
        }
        pagination.insert("page_size".to_string(), Value::from(self.page_size));

        let mut body = self.body_template.clone();
        body.insert("pagination".to_string(), Value::Object(pagination));
        Value::Object(body)
    }
}

/// Reduce a raw page body to its items and next cursor.
///
/// Items and cursor are each looked up under `envelope_key` first and at the
/// root second. Missing items default to an empty list; a missing, `null`
/// or empty-string cursor means the listing is exhausted.
pub fn normalize_page(body: &Value, envelope_key: &str) -> Page {
    let nested = body.get(envelope_key).filter(|v| v.is_object());

    let items = nested
        .and_then(|n| n.get("data"))
        .and_then(Value::as_array)
        .or_else(|| body.get("data").and_then(Value::as_array))
        .cloned()
        .unwrap_or_default();

    let next_cursor = nested
        .and_then(extract_cursor)
        .or_else(|| extract_cursor(body));

    Page { items, next_cursor }
}

fn extract_cursor(envelope: &Value) -> Option<String> {
    match envelope.get("page_info")?.get("cursor")? {
        Value::Null => None,
        Value::String(cursor) if cursor.is_empty() => None,
        Value::String(cursor) => Some(cursor.clone()),
        other => Some(other.to_string()),
    }
}

/// Fetch pages until the cursor runs out or `max_pages` is reached.
///
/// Pages are fetched strictly one after another since each request carries
/// the cursor returned by the previous one. Hitting the ceiling is not an
/// error; any failed fetch aborts the whole aggregation.
#[instrument(skip(executor, request, policy), fields(endpoint = %request.endpoint, max_pages = request.max_pages))]
pub async fn aggregate(
    executor: &CallExecutor,
    request: &PageRequest,
    policy: &PagePolicy,
) -> FellowResult<Aggregate> {
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    for page_index in 0..request.max_pages {
        let descriptor =
            RequestDescriptor::post(request.endpoint.clone(), request.page_body(cursor.as_deref()));
        let body = executor.execute(&descriptor).await?;

        let page = normalize_page(&body, &request.envelope_key);
        debug!(
            page = page_index + 1,
            items = page.items.len(),
            has_more = page.next_cursor.is_some(),
            "Fetched page"
        );
        items.extend(page.items);

        match page.next_cursor {
            None => break,
            Some(next) => {
                cursor = Some(next);
                if page_index + 1 < request.max_pages {
                    executor.sleeper().sleep(policy.page_delay).await;
                }
            }
        }
    }

    Ok(Aggregate::from_items(items))
}
