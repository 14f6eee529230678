// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Auto-generated trigger CRUD tools.
//!
//! When a skill declares a trigger schema, the runtime exposes six tools to
//! the language model for managing trigger instances. They are always
//! visible and never subject to option-based tool filtering; their schemas
//! are derived from the declaration.

use serde_json::{json, Value};

use super::types::TriggerSchema;
use crate::types::{InputSchema, ToolDefinition};

pub const LIST_TRIGGER_TYPES: &str = "list-trigger-types";
pub const LIST_TRIGGERS: &str = "list-triggers";
pub const GET_TRIGGER: &str = "get-trigger";
pub const CREATE_TRIGGER: &str = "create-trigger";
pub const UPDATE_TRIGGER: &str = "update-trigger";
pub const DELETE_TRIGGER: &str = "delete-trigger";

/// All auto-generated tool names.
pub const TRIGGER_TOOL_NAMES: [&str; 6] = [
    LIST_TRIGGER_TYPES,
    LIST_TRIGGERS,
    GET_TRIGGER,
    CREATE_TRIGGER,
    UPDATE_TRIGGER,
    DELETE_TRIGGER,
];

/// Whether a tool name belongs to the auto-generated trigger tools.
pub fn is_trigger_tool(name: &str) -> bool {
    TRIGGER_TOOL_NAMES.contains(&name)
}

/// Build the six tool definitions from the declared schema.
pub fn definitions(schema: &TriggerSchema) -> Vec<ToolDefinition> {
    let type_names = schema.type_names();

    let id_schema = InputSchema::new()
        .with_property("id", json!({"type": "string", "description": "Trigger ID"}))
        .with_required(vec!["id".to_string()]);

    vec![
        ToolDefinition::new(
            LIST_TRIGGER_TYPES,
            "List available trigger types and their condition field schemas",
        ),
        ToolDefinition::new(LIST_TRIGGERS, "List all registered triggers"),
        ToolDefinition::new(GET_TRIGGER, "Get details of a specific trigger")
            .with_schema(id_schema.clone()),
        ToolDefinition::new(
            CREATE_TRIGGER,
            "Create a new trigger with conditions and config",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "type",
                    json!({
                        "type": "string",
                        "enum": type_names,
                        "description": "Trigger type (must match a declared type)",
                    }),
                )
                .with_property(
                    "name",
                    json!({"type": "string", "description": "Human-readable trigger name"}),
                )
                .with_property(
                    "description",
                    json!({"type": "string", "description": "Trigger description"}),
                )
                .with_property(
                    "conditions",
                    json!({
                        "type": "array",
                        "description": "Condition objects (at least one required)",
                        "items": {"type": "object"},
                    }),
                )
                .with_property(
                    "config",
                    json!({"type": "object", "description": "Trigger-type-specific config"}),
                )
                .with_property(
                    "enabled",
                    json!({"type": "boolean", "description": "Whether trigger is enabled (default true)"}),
                )
                .with_property("metadata", json!({"type": "object", "description": "Optional metadata"}))
                .with_required(vec![
                    "type".to_string(),
                    "name".to_string(),
                    "conditions".to_string(),
                ]),
        ),
        ToolDefinition::new(UPDATE_TRIGGER, "Update an existing trigger's fields").with_schema(
            InputSchema::new()
                .with_property("id", json!({"type": "string", "description": "Trigger ID to update"}))
                .with_property("name", json!({"type": "string", "description": "New name"}))
                .with_property("description", json!({"type": "string", "description": "New description"}))
                .with_property("conditions", json!({"type": "array", "items": {"type": "object"}}))
                .with_property("config", json!({"type": "object"}))
                .with_property("enabled", json!({"type": "boolean"}))
                .with_property("metadata", json!({"type": "object"}))
                .with_required(vec!["id".to_string()]),
        ),
        ToolDefinition::new(DELETE_TRIGGER, "Delete a trigger by ID").with_schema(id_schema),
    ]
}

/// Payload for `triggers/types` and the `list-trigger-types` tool.
pub fn types_payload(schema: Option<&TriggerSchema>) -> Value {
    match schema {
        Some(schema) => json!({
            "triggerTypes": schema.trigger_types,
        }),
        None => json!({"triggerTypes": []}),
    }
}
