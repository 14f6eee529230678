// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool abstractions for the skill runtime.
//!
//! - [`ToolHandler`] trait that all skill tools implement
//! - [`ToolSet`] for name lookup while preserving declaration order
//! - [`ToolOutput`] for returning results from tool execution

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::context::SkillContext;
use crate::error::ToolError;
use crate::types::ToolDefinition;

/// Output from executing a tool, reported to the language model.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    /// Create a successful output.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error output.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Serialize to the `tools/call` result shape.
    pub fn to_rpc_result(&self) -> Value {
        serde_json::json!({
            "content": [{"type": "text", "text": self.content}],
            "isError": self.is_error,
        })
    }
}

impl From<ToolError> for ToolOutput {
    fn from(err: ToolError) -> Self {
        Self::error(err.to_string())
    }
}

/// Trait that all skill tools must implement.
///
/// Each tool is a struct providing its definition and execution logic. The
/// context gives tools reverse-RPC access to host state, data files, the
/// entity graph, and trigger firing.
///
/// # Example
///
/// ```rust,ignore
/// struct PingTool;
///
/// #[async_trait]
/// impl ToolHandler for PingTool {
///     fn definition(&self) -> ToolDefinition {
///         ToolDefinition::new("ping", "Reply with pong")
///     }
///
///     async fn execute(&self, _input: Value, _ctx: &SkillContext) -> Result<ToolOutput, ToolError> {
///         Ok(ToolOutput::success("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition (name, description, input schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given input parameters.
    async fn execute(&self, input: Value, ctx: &SkillContext) -> Result<ToolOutput, ToolError>;
}

/// The skill's declared tools, indexed by name with declaration order kept.
pub struct ToolSet {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    order: Vec<String>,
}

impl ToolSet {
    /// Build a tool set from handlers in declaration order.
    ///
    /// Duplicate names are rejected by `SkillDefinition::validate`; a later
    /// duplicate here would silently win, so callers validate first.
    pub fn new(tools: &[Arc<dyn ToolHandler>]) -> Self {
        let mut handlers = HashMap::new();
        let mut order = Vec::new();
        for tool in tools {
            let name = tool.definition().name;
            order.push(name.clone());
            handlers.insert(name, Arc::clone(tool));
        }
        Self { handlers, order }
    }

    /// Get a handler by tool name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Tool names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Definitions in declaration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|h| h.definition())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Parse JSON arguments into a typed struct.
///
/// Helper for tool handlers to deserialize their input.
pub fn parse_arguments<T>(arguments: &Value) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(arguments.clone())
        .map_err(|err| ToolError::InvalidInput(format!("Failed to parse arguments: {err}")))
}
