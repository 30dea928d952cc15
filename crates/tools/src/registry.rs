use std::collections::HashMap;
use std::sync::Arc;
use serde_json::{json, Value};
use tabscout_core::{Error, Result};
use tracing::{debug, warn};

use crate::devtools::DevtoolsTool;
use crate::read_page::ReadPageTool;
use crate::research::ResearchTool;
use crate::{Tool, ToolContext};

/// Explicit tool table built at start-up.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DevtoolsTool));
        registry.register(Arc::new(ReadPageTool));
        registry.register(Arc::new(ResearchTool));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn get_tool_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                let schema = tool.schema();
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "parameters": schema.parameters,
                })
            })
            .collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return Err(e);
        }

        debug!(tool = name, "Executing tool");
        tool.execute(ctx, params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabscout_core::Config;

    #[test]
    fn test_registry_new_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("research").is_none());
    }

    #[test]
    fn test_registry_with_defaults() {
        let reg = ToolRegistry::with_defaults();
        let names = reg.tool_names();
        assert!(names.contains(&"devtools".to_string()));
        assert!(names.contains(&"read_page".to_string()));
        assert!(names.contains(&"research".to_string()));
    }

    #[test]
    fn test_registry_get_tool_schemas() {
        let reg = ToolRegistry::with_defaults();
        let schemas = reg.get_tool_schemas();
        assert_eq!(schemas.len(), 3);
        for schema in &schemas {
            assert!(schema["name"].is_string());
            assert!(schema["description"].is_string());
            assert!(schema["parameters"].is_object());
        }
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let reg = ToolRegistry::with_defaults();
        let ctx = ToolContext::new(Config::default());
        let err = reg
            .execute("nonexistent", ctx, json!({}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Tool(_)));
    }

    #[tokio::test]
    async fn test_execute_rejects_invalid_params() {
        let reg = ToolRegistry::with_defaults();
        let ctx = ToolContext::new(Config::default());
        let err = reg
            .execute("research", ctx, json!({"action": "bogus"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Validation(_)));
    }
}
