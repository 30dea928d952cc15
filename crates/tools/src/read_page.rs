//! Read clean text or extract structured data from an open browser tab.

use async_trait::async_trait;
use serde_json::{json, Value};
use tabscout_core::{Error, Result};
use tracing::debug;

use crate::devtools::evaluate::{
    CLEAN_TEXT_JS, EXTRACT_EMAILS_JS, EXTRACT_IMAGES_JS, EXTRACT_LINKS_JS, EXTRACT_PRICES_JS,
    EXTRACT_TABLES_JS,
};
use crate::devtools::{evaluate, ProtocolSession, TabDirectory};
use crate::{safe_truncate, Tool, ToolContext, ToolSchema};

/// Cap on returned page text, characters.
const MAX_TEXT_CHARS: usize = 20_000;

const DATA_TYPES: &[&str] = &["links", "images", "emails", "prices", "tables"];

/// Extraction script for a structured `data_type`.
fn extract_script(data_type: &str) -> Option<&'static str> {
    match data_type {
        "links" => Some(EXTRACT_LINKS_JS),
        "images" => Some(EXTRACT_IMAGES_JS),
        "emails" => Some(EXTRACT_EMAILS_JS),
        "prices" => Some(EXTRACT_PRICES_JS),
        "tables" => Some(EXTRACT_TABLES_JS),
        _ => None,
    }
}

pub struct ReadPageTool;

#[async_trait]
impl Tool for ReadPageTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "read_page",
            description: "Read the main content of an open browser tab. Extracts clean readable text (stripping navigation, ads and sidebars) or structured data: links, images, emails, prices, tables.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["read", "extract"],
                        "description": "Action: read (clean main-content text), extract (structured data from the page)"
                    },
                    "data_type": {
                        "type": "string",
                        "enum": DATA_TYPES,
                        "description": "What to extract with the extract action (default: links)"
                    },
                    "url": {
                        "type": "string",
                        "description": "URL pattern to pick a tab (case-insensitive substring)"
                    },
                    "title": {
                        "type": "string",
                        "description": "Title pattern to pick a tab (case-insensitive substring)"
                    },
                    "tab_index": {
                        "type": "integer",
                        "description": "Tab index in discovery order (0-based)"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let action = params.get("action").and_then(Value::as_str).unwrap_or("");
        if !["read", "extract"].contains(&action) {
            return Err(Error::Validation(format!(
                "Invalid action '{}'. Valid: read, extract",
                action
            )));
        }
        if action == "extract" {
            let data_type = params
                .get("data_type")
                .and_then(Value::as_str)
                .unwrap_or("links");
            if extract_script(data_type).is_none() {
                return Err(Error::Validation(format!(
                    "Invalid data_type '{}'. Valid: {}",
                    data_type,
                    DATA_TYPES.join(", ")
                )));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let action = params.get("action").and_then(Value::as_str).unwrap_or("read");

        let directory = TabDirectory::new(&ctx.config.devtools);
        let target = directory
            .resolve_target(
                params.get("url").and_then(Value::as_str),
                params.get("title").and_then(Value::as_str),
                params.get("tab_index").and_then(Value::as_u64).map(|i| i as usize),
            )
            .await?;

        debug!(target = %target.id, action, "reading page");
        let mut session = ProtocolSession::open(&target, &ctx.config.devtools).await?;
        let outcome = match action {
            "read" => evaluate(&mut session, CLEAN_TEXT_JS).await.map(|value| {
                let text = value.as_str().unwrap_or_default();
                json!({
                    "title": target.title,
                    "url": target.url,
                    "text": safe_truncate(text, MAX_TEXT_CHARS),
                })
            }),
            _ => {
                let data_type = params
                    .get("data_type")
                    .and_then(Value::as_str)
                    .unwrap_or("links");
                // validate() vouched for data_type
                let script = extract_script(data_type).unwrap_or(EXTRACT_LINKS_JS);
                evaluate(&mut session, script).await.map(|value| {
                    json!({
                        "title": target.title,
                        "url": target.url,
                        "data_type": data_type,
                        "data": value,
                    })
                })
            }
        };
        session.close().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let tool = ReadPageTool;
        assert_eq!(tool.schema().name, "read_page");
    }

    #[test]
    fn test_validate() {
        let tool = ReadPageTool;
        assert!(tool.validate(&json!({"action": "read"})).is_ok());
        assert!(tool.validate(&json!({"action": "extract", "url": "docs"})).is_ok());
        assert!(tool.validate(&json!({"action": "markdown"})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[test]
    fn test_validate_data_types() {
        let tool = ReadPageTool;
        for data_type in DATA_TYPES {
            assert!(tool
                .validate(&json!({"action": "extract", "data_type": data_type}))
                .is_ok());
        }
        assert!(tool
            .validate(&json!({"action": "extract", "data_type": "cookies"}))
            .is_err());
        // data_type only constrains the extract action
        assert!(tool
            .validate(&json!({"action": "read", "data_type": "cookies"}))
            .is_ok());
    }

    #[test]
    fn test_extract_script_covers_every_data_type() {
        for data_type in DATA_TYPES {
            assert!(extract_script(data_type).is_some(), "{}", data_type);
        }
        assert!(extract_script("markdown").is_none());
    }
}
