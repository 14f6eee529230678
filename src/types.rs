// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for the skill runtime.
//!
//! This module defines the fundamental data structures used throughout the
//! runtime: the immutable skill definition, tool and option declarations,
//! entity schema declarations, and the lifecycle hooks trait implemented by
//! skill authors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::SkillContext;
use crate::error::Result;
use crate::setup::{SetupResult, SetupStep};
use crate::tools::ToolHandler;
use crate::triggers::{TriggerInstance, TriggerSchema};

// ============================================================================
// Tool Definitions
// ============================================================================

/// JSON Schema for tool input parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String, // Always "object"
    pub properties: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl InputSchema {
    /// Create a new input schema with object type.
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: serde_json::Map::new(),
            required: None,
        }
    }

    /// Add a property to the schema.
    pub fn with_property(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark properties as required.
    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = Some(required);
        self
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition of a tool that can be called by the AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::new(),
        }
    }

    /// Set the input schema for this tool.
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }
}

// ============================================================================
// Option Definitions
// ============================================================================

/// Value type of a user-configurable option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Boolean,
    Number,
    Text,
    Select,
}

/// A choice offered by a select option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectChoice {
    pub label: String,
    pub value: String,
}

impl SelectChoice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Declaration of a typed, persisted runtime setting.
///
/// Boolean options may carry a `tool_filter`: when the option is false, the
/// listed tools are hidden from the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub default: Value,
    /// Choices for select options.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectChoice>,
    /// Free-form category string for UI grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Tools hidden when this boolean option is false.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_filter: Vec<String>,
}

impl OptionDefinition {
    /// Create a boolean option.
    pub fn boolean(name: impl Into<String>, label: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            option_type: OptionType::Boolean,
            label: label.into(),
            description: String::new(),
            default: Value::Bool(default),
            options: Vec::new(),
            group: None,
            tool_filter: Vec::new(),
        }
    }

    /// Create a number option.
    pub fn number(name: impl Into<String>, label: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            option_type: OptionType::Number,
            label: label.into(),
            description: String::new(),
            default: serde_json::json!(default),
            options: Vec::new(),
            group: None,
            tool_filter: Vec::new(),
        }
    }

    /// Create a text option.
    pub fn text(name: impl Into<String>, label: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            option_type: OptionType::Text,
            label: label.into(),
            description: String::new(),
            default: Value::String(default.into()),
            options: Vec::new(),
            group: None,
            tool_filter: Vec::new(),
        }
    }

    /// Create a select option with the given choices.
    pub fn select(
        name: impl Into<String>,
        label: impl Into<String>,
        default: impl Into<String>,
        choices: Vec<SelectChoice>,
    ) -> Self {
        Self {
            name: name.into(),
            option_type: OptionType::Select,
            label: label.into(),
            description: String::new(),
            default: Value::String(default.into()),
            options: choices,
            group: None,
            tool_filter: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the UI group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the tool filter (meaningful on boolean options only).
    pub fn with_tool_filter<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_filter = tools.into_iter().map(Into::into).collect();
        self
    }
}

// ============================================================================
// Entity Schema Declarations
// ============================================================================

/// Describes a property on an entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPropertySchema {
    pub name: String,
    /// JSON Schema type: string, number, boolean, array, object.
    #[serde(rename = "type")]
    pub property_type: String,
    pub description: String,
    #[serde(default)]
    pub optional: bool,
}

/// Declares an entity type a skill produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTypeDeclaration {
    /// Namespaced type identifier, e.g. "chat.contact".
    #[serde(rename = "type")]
    pub entity_type: String,
    pub label: String,
    pub description: String,
    #[serde(default)]
    pub properties: Vec<EntityPropertySchema>,
}

/// Declares a relationship type between entity types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipTypeDeclaration {
    /// Relationship identifier, e.g. "member_of".
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub source_type: String,
    pub target_type: String,
    pub description: String,
}

/// Entity and relationship types a skill surfaces into the host graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySchema {
    #[serde(default)]
    pub entity_types: Vec<EntityTypeDeclaration>,
    #[serde(default)]
    pub relationship_types: Vec<RelationshipTypeDeclaration>,
}

// ============================================================================
// Lifecycle Hooks
// ============================================================================

/// Lifecycle hooks implemented by skill authors.
///
/// Every method has a default implementation equivalent to "hook absent":
/// lifecycle slots are no-ops, the message transforms leave the message
/// unchanged, and `on_status` errors until the skill provides one. Setup
/// handlers error by default and are additionally guarded by the skill's
/// `has_setup` flag.
///
/// # Example
///
/// ```rust,ignore
/// use skillrt::types::SkillHooks;
///
/// struct MyHooks;
///
/// #[async_trait]
/// impl SkillHooks for MyHooks {
///     async fn on_status(&self, _ctx: &SkillContext) -> Result<Value> {
///         Ok(serde_json::json!({"connected": true}))
///     }
/// }
/// ```
#[async_trait]
pub trait SkillHooks: Send + Sync {
    /// Called once after `skill/load`, after options and triggers are restored.
    async fn on_load(&self, _ctx: &SkillContext) -> Result<()> {
        Ok(())
    }

    /// Called on `skill/unload`, before triggers are cleared.
    async fn on_unload(&self, _ctx: &SkillContext) -> Result<()> {
        Ok(())
    }

    async fn on_session_start(&self, _ctx: &SkillContext, _session_id: &str) -> Result<()> {
        Ok(())
    }

    async fn on_session_end(&self, _ctx: &SkillContext, _session_id: &str) -> Result<()> {
        Ok(())
    }

    /// Transform an inbound user message. `Ok(None)` leaves it unchanged.
    async fn on_before_message(
        &self,
        _ctx: &SkillContext,
        _message: &str,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    /// Transform an outbound model response. `Ok(None)` leaves it unchanged.
    async fn on_after_response(
        &self,
        _ctx: &SkillContext,
        _response: &str,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    /// Periodic tick, scheduled by the host at the declared `tick_interval`.
    async fn on_tick(&self, _ctx: &SkillContext) -> Result<()> {
        Ok(())
    }

    /// Return a skill-defined status dictionary. Mandatory for skills whose
    /// host observes `skill/status`.
    async fn on_status(&self, _ctx: &SkillContext) -> Result<Value> {
        Err(anyhow::anyhow!("Skill must implement on_status hook"))
    }

    /// Called after every successful option mutation with the new values.
    async fn on_options_change(
        &self,
        _ctx: &SkillContext,
        _options: &HashMap<String, Value>,
    ) -> Result<()> {
        Ok(())
    }

    /// Called on `skill/disconnect`; conventionally clears credentials.
    async fn on_disconnect(&self, _ctx: &SkillContext) -> Result<()> {
        Err(anyhow::anyhow!("Skill has no on_disconnect hook"))
    }

    /// Return the first setup wizard step.
    async fn on_setup_start(&self, _ctx: &SkillContext) -> Result<SetupStep> {
        Err(anyhow::anyhow!("Skill does not implement setup flow"))
    }

    /// Process submitted values for a setup step.
    async fn on_setup_submit(
        &self,
        _ctx: &SkillContext,
        _step_id: &str,
        _values: &serde_json::Map<String, Value>,
    ) -> Result<SetupResult> {
        Err(anyhow::anyhow!("Skill does not implement setup flow"))
    }

    async fn on_setup_cancel(&self, _ctx: &SkillContext) -> Result<()> {
        Ok(())
    }

    /// Called when a trigger is created or rehydrated from persistence.
    async fn on_trigger_register(&self, _ctx: &SkillContext, _trigger: &TriggerInstance) -> Result<()> {
        Ok(())
    }

    /// Called when a trigger is deleted.
    async fn on_trigger_remove(&self, _ctx: &SkillContext, _trigger_id: &str) -> Result<()> {
        Ok(())
    }
}

/// No-op hooks for skills that only expose tools.
pub struct NoHooks;

#[async_trait]
impl SkillHooks for NoHooks {}

// ============================================================================
// Skill Definition
// ============================================================================

/// Top-level skill definition: the immutable bundle handed to the runtime at
/// process start.
#[derive(Clone)]
pub struct SkillDefinition {
    /// Skill name (lowercase-hyphens, matches the skill directory).
    pub name: String,
    /// Brief description.
    pub description: String,
    /// Semver version string.
    pub version: String,
    /// Tools exposed to the AI model, in declaration order.
    pub tools: Vec<Arc<dyn ToolHandler>>,
    /// Lifecycle hooks.
    pub hooks: Arc<dyn SkillHooks>,
    /// User-configurable options, in declaration order.
    pub options: Vec<OptionDefinition>,
    /// Periodic tick interval in milliseconds (minimum 1000).
    pub tick_interval: Option<u64>,
    /// Whether this skill has an interactive setup flow.
    pub has_setup: bool,
    /// Whether this skill supports `skill/disconnect`.
    pub has_disconnect: bool,
    /// Trigger types this skill supports, if any.
    pub trigger_schema: Option<TriggerSchema>,
    /// Entity and relationship types this skill surfaces.
    pub entity_schema: Option<EntitySchema>,
}

impl SkillDefinition {
    /// Create a new skill definition with the given name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: "1.0.0".to_string(),
            tools: Vec::new(),
            hooks: Arc::new(NoHooks),
            options: Vec::new(),
            tick_interval: None,
            has_setup: false,
            has_disconnect: false,
            trigger_schema: None,
            entity_schema: None,
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Register a tool.
    pub fn with_tool<T: ToolHandler + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Set the lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn SkillHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Declare an option.
    pub fn with_option(mut self, option: OptionDefinition) -> Self {
        self.options.push(option);
        self
    }

    /// Set the tick interval in milliseconds.
    pub fn with_tick_interval(mut self, millis: u64) -> Self {
        self.tick_interval = Some(millis);
        self
    }

    /// Enable the setup wizard.
    pub fn with_setup(mut self) -> Self {
        self.has_setup = true;
        self
    }

    /// Enable `skill/disconnect`.
    pub fn with_disconnect(mut self) -> Self {
        self.has_disconnect = true;
        self
    }

    /// Declare the trigger schema.
    pub fn with_trigger_schema(mut self, schema: TriggerSchema) -> Self {
        self.trigger_schema = Some(schema);
        self
    }

    /// Declare the entity schema.
    pub fn with_entity_schema(mut self, schema: EntitySchema) -> Self {
        self.entity_schema = Some(schema);
        self
    }

    /// Validate the definition.
    ///
    /// Returns non-fatal warnings (unknown `tool_filter` entries); duplicate
    /// names, a malformed skill name, and an undersized tick interval are
    /// errors.
    pub fn validate(&self) -> Result<Vec<String>> {
        if !is_kebab_case(&self.name) {
            anyhow::bail!("Skill name must be lowercase-hyphens: '{}'", self.name);
        }

        let mut tool_names = HashSet::new();
        for tool in &self.tools {
            let def = tool.definition();
            if !tool_names.insert(def.name.clone()) {
                anyhow::bail!("Duplicate tool name: '{}'", def.name);
            }
        }

        let mut option_names = HashSet::new();
        for option in &self.options {
            if !option_names.insert(option.name.clone()) {
                anyhow::bail!("Duplicate option name: '{}'", option.name);
            }
        }

        if let Some(interval) = self.tick_interval {
            if interval < 1000 {
                anyhow::bail!("tick_interval must be at least 1000ms, got {}", interval);
            }
        }

        let mut warnings = Vec::new();
        for option in &self.options {
            for filtered in &option.tool_filter {
                if !tool_names.contains(filtered) {
                    warnings.push(format!(
                        "Option '{}' filters unknown tool '{}'",
                        option.name, filtered
                    ));
                }
            }
        }

        Ok(warnings)
    }
}

fn is_kebab_case(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutput;
    use crate::error::ToolError;

    struct EchoTool(&'static str);

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.0, "Echoes input")
        }

        async fn execute(&self, input: Value, _ctx: &SkillContext) -> std::result::Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success(input.to_string()))
        }
    }

    #[test]
    fn test_input_schema_builder() {
        let schema = InputSchema::new()
            .with_property("text", serde_json::json!({"type": "string"}))
            .with_required(vec!["text".to_string()]);
        assert_eq!(schema.schema_type, "object");
        assert!(schema.properties.contains_key("text"));
        assert_eq!(schema.required.as_deref(), Some(&["text".to_string()][..]));
    }

    #[test]
    fn test_tool_definition_serialization() {
        let def = ToolDefinition::new("send", "Send a thing");
        let json = serde_json::to_string(&def).unwrap();
        assert!(json.contains("\"inputSchema\""));
        assert!(json.contains("\"type\":\"object\""));
    }

    #[test]
    fn test_option_builders() {
        let opt = OptionDefinition::boolean("enable_read", "Enable read", true)
            .with_tool_filter(["read"])
            .with_group("general");
        assert_eq!(opt.option_type, OptionType::Boolean);
        assert_eq!(opt.default, Value::Bool(true));
        assert_eq!(opt.tool_filter, vec!["read".to_string()]);
        assert_eq!(opt.group.as_deref(), Some("general"));
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let skill = SkillDefinition::new("notes", "Note keeping")
            .with_tool(EchoTool("send"))
            .with_tool(EchoTool("read"))
            .with_option(
                OptionDefinition::boolean("enable_read", "Enable read", true)
                    .with_tool_filter(["read"]),
            );
        let warnings = skill.validate().unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicate_tools() {
        let skill = SkillDefinition::new("notes", "Note keeping")
            .with_tool(EchoTool("send"))
            .with_tool(EchoTool("send"));
        assert!(skill.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        let skill = SkillDefinition::new("My Skill", "desc");
        assert!(skill.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_tick() {
        let skill = SkillDefinition::new("notes", "desc").with_tick_interval(500);
        assert!(skill.validate().is_err());
    }

    #[test]
    fn test_validate_warns_unknown_filter_target() {
        let skill = SkillDefinition::new("notes", "desc")
            .with_tool(EchoTool("send"))
            .with_option(
                OptionDefinition::boolean("enable_read", "Enable read", true)
                    .with_tool_filter(["read"]),
            );
        let warnings = skill.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("read"));
    }

    #[test]
    fn test_kebab_case() {
        assert!(is_kebab_case("kitchen-sink"));
        assert!(is_kebab_case("email"));
        assert!(!is_kebab_case("Email"));
        assert!(!is_kebab_case("-leading"));
        assert!(!is_kebab_case("trailing-"));
        assert!(!is_kebab_case(""));
    }
}
