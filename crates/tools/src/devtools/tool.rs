//! Tool surface over the DevTools client: list tabs, evaluate
//! expressions, inspect elements and capture screenshots.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tabscout_core::{Error, Result};
use tracing::debug;

use super::evaluate::{evaluate, inspect_element_js};
use super::session::ProtocolSession;
use super::tabs::{TabDirectory, TargetDescriptor};
use crate::{Tool, ToolContext, ToolSchema};

const ACTIONS: &[&str] = &["tabs", "evaluate", "inspect", "screenshot"];

pub struct DevtoolsTool;

#[async_trait]
impl Tool for DevtoolsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "devtools",
            description: "Inspect a DevTools-enabled browser. List open tabs, evaluate a JavaScript expression, inspect a DOM element, or capture a screenshot of a chosen tab.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ACTIONS,
                        "description": "Action: tabs (list inspectable tabs), evaluate (run JavaScript in a tab), inspect (summarize a DOM element), screenshot (capture the visible page)"
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
                    },
                    "expression": {
                        "type": "string",
                        "description": "JavaScript expression for the evaluate action"
                    },
                    "selector": {
                        "type": "string",
                        "description": "CSS selector for the inspect action"
                    },
                    "path": {
                        "type": "string",
                        "description": "File to write the screenshot PNG to; omit to get base64 data back"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let action = params.get("action").and_then(Value::as_str).unwrap_or("");
        if !ACTIONS.contains(&action) {
            return Err(Error::Validation(format!(
                "Invalid action '{}'. Valid: {}",
                action,
                ACTIONS.join(", ")
            )));
        }
        if action == "evaluate" && params.get("expression").and_then(Value::as_str).is_none() {
            return Err(Error::Validation(
                "'expression' is required for the evaluate action".to_string(),
            ));
        }
        if action == "inspect" && params.get("selector").and_then(Value::as_str).is_none() {
            return Err(Error::Validation(
                "'selector' is required for the inspect action".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let action = params.get("action").and_then(Value::as_str).unwrap_or("tabs");
        let directory = TabDirectory::new(&ctx.config.devtools);

        if action == "tabs" {
            let targets = directory.list_targets().await?;
            let tabs: Vec<Value> = targets
                .iter()
                .enumerate()
                .map(|(index, t)| {
                    json!({
                        "index": index,
                        "type": t.kind,
                        "title": t.title,
                        "url": t.url,
                        "debuggable": t.ws_url.is_some(),
                    })
                })
                .collect();
            return Ok(json!({ "count": tabs.len(), "tabs": tabs }));
        }

        let target = directory
            .resolve_target(
                params.get("url").and_then(Value::as_str),
                params.get("title").and_then(Value::as_str),
                params.get("tab_index").and_then(Value::as_u64).map(|i| i as usize),
            )
            .await?;

        debug!(target = %target.id, action, "running devtools action");
        let mut session = ProtocolSession::open(&target, &ctx.config.devtools).await?;
        let outcome = match action {
            "evaluate" => {
                let expression = params["expression"].as_str().unwrap();
                evaluate(&mut session, expression).await.map(|value| {
                    json!({
                        "title": target.title,
                        "url": target.url,
                        "value": value,
                    })
                })
            }
            "inspect" => {
                let selector = params["selector"].as_str().unwrap();
                inspect_element(&mut session, &target, selector).await
            }
            _ => {
                capture_screenshot(
                    &mut session,
                    &target,
                    params.get("path").and_then(Value::as_str),
                )
                .await
            }
        };
        session.close().await;
        outcome
    }
}

/// Summarize the first element matching `selector`. A null evaluation
/// means the selector matched nothing, which is a `NotFound`.
async fn inspect_element(
    session: &mut ProtocolSession,
    target: &TargetDescriptor,
    selector: &str,
) -> Result<Value> {
    let value = evaluate(session, &inspect_element_js(selector)).await?;
    if value.is_null() {
        return Err(Error::NotFound(format!(
            "No element matches selector '{}'",
            selector
        )));
    }
    Ok(json!({
        "title": target.title,
        "url": target.url,
        "selector": selector,
        "element": value,
    }))
}

/// Capture the visible page as PNG. With a `path` the decoded image is
/// written there; otherwise the base64 data comes back in the result.
async fn capture_screenshot(
    session: &mut ProtocolSession,
    target: &TargetDescriptor,
    path: Option<&str>,
) -> Result<Value> {
    let raw = session
        .send("Page.captureScreenshot", json!({ "format": "png" }))
        .await?;
    let data = raw
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Protocol {
            method: "Page.captureScreenshot".to_string(),
            payload: raw.clone(),
        })?;

    match path {
        Some(path) => {
            let bytes = BASE64
                .decode(data)
                .map_err(|e| Error::Other(format!("Invalid screenshot payload: {}", e)))?;
            std::fs::write(path, &bytes)?;
            Ok(json!({
                "title": target.title,
                "url": target.url,
                "path": path,
                "bytes": bytes.len(),
            }))
        }
        None => Ok(json!({
            "title": target.title,
            "url": target.url,
            "format": "png",
            "data": data,
        })),
    }
}
