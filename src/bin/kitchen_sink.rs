// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Kitchen-sink demo skill.
//!
//! Exercises every runtime surface: tools, lifecycle hooks, options with
//! tool filtering, a trigger schema with config prefilters, and a two-step
//! setup wizard. Spawn it from a host and drive it over stdin/stdout.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use skillrt::setup::{SetupField, SetupFieldError, SetupFieldType, SetupResult, SetupStep};
use skillrt::tools::{parse_arguments, ToolHandler, ToolOutput};
use skillrt::types::{OptionDefinition, SkillHooks, ToolDefinition};
use skillrt::{
    InputSchema, Result, SkillContext, SkillDefinition, SkillServer, ToolError,
    TriggerFieldSchema, TriggerSchema, TriggerTypeDefinition,
};

const NOTES_FILE: &str = "notes.json";

async fn read_notes(ctx: &SkillContext) -> Vec<Value> {
    match ctx.read_data(NOTES_FILE).await {
        Ok(raw) if !raw.is_empty() => serde_json::from_str(&raw).unwrap_or_default(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

struct AddNoteTool;

#[derive(Deserialize)]
struct AddNoteArgs {
    text: String,
    #[serde(default)]
    outgoing: bool,
}

#[async_trait]
impl ToolHandler for AddNoteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("add-note", "Append a note to the notebook").with_schema(
            InputSchema::new()
                .with_property("text", json!({"type": "string", "description": "Note body"}))
                .with_property(
                    "outgoing",
                    json!({"type": "boolean", "description": "Mark the note as written by the assistant"}),
                )
                .with_required(vec!["text".to_string()]),
        )
    }

    async fn execute(&self, input: Value, ctx: &SkillContext) -> std::result::Result<ToolOutput, ToolError> {
        let args: AddNoteArgs = parse_arguments(&input)?;

        let mut notes = read_notes(ctx).await;
        notes.push(json!({"text": args.text, "outgoing": args.outgoing}));
        ctx.write_data(NOTES_FILE, &serde_json::to_string(&notes).unwrap_or_default())
            .await?;

        // Let note_added triggers react to the new note. The prefilter
        // honours each trigger's exclude_outgoing config.
        let event = json!({"note": {"text": args.text, "is_outgoing": args.outgoing}});
        let matched = ctx.match_triggers("note_added", &event, |trigger| {
            let exclude_outgoing = trigger
                .config
                .get("exclude_outgoing")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            !(exclude_outgoing && args.outgoing)
        });
        for trigger in matched {
            let _ = ctx
                .fire_trigger(&trigger.id, json!({"note_text": args.text}), None)
                .await;
        }

        Ok(ToolOutput::success(format!("Added note ({} total)", notes.len())))
    }
}

struct ListNotesTool;

#[async_trait]
impl ToolHandler for ListNotesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("list-notes", "List all notes in the notebook")
    }

    async fn execute(&self, _input: Value, ctx: &SkillContext) -> std::result::Result<ToolOutput, ToolError> {
        let notes = read_notes(ctx).await;
        if notes.is_empty() {
            return Ok(ToolOutput::success("No notes yet"));
        }
        let lines: Vec<String> = notes
            .iter()
            .enumerate()
            .map(|(i, note)| {
                format!(
                    "{}. {}",
                    i + 1,
                    note.get("text").and_then(Value::as_str).unwrap_or("?")
                )
            })
            .collect();
        Ok(ToolOutput::success(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

struct KitchenSinkHooks;

#[async_trait]
impl SkillHooks for KitchenSinkHooks {
    async fn on_load(&self, ctx: &SkillContext) -> Result<()> {
        ctx.log(&format!("kitchen-sink loaded, data dir {}", ctx.data_dir()));
        Ok(())
    }

    async fn on_unload(&self, ctx: &SkillContext) -> Result<()> {
        ctx.log("kitchen-sink unloading");
        Ok(())
    }

    async fn on_session_start(&self, ctx: &SkillContext, session_id: &str) -> Result<()> {
        ctx.set_state(json!({"last_session": session_id})).await?;
        Ok(())
    }

    async fn on_before_message(&self, ctx: &SkillContext, message: &str) -> Result<Option<String>> {
        let options = ctx.get_options();
        let prefix = options
            .get("note_prefix")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if prefix.is_empty() {
            Ok(None)
        } else {
            Ok(Some(format!("{prefix} {message}")))
        }
    }

    async fn on_tick(&self, ctx: &SkillContext) -> Result<()> {
        let notes = read_notes(ctx).await;
        ctx.emit_event("notes.count", json!({"count": notes.len()}))
            .await?;
        Ok(())
    }

    async fn on_status(&self, ctx: &SkillContext) -> Result<Value> {
        let notes = read_notes(ctx).await;
        Ok(json!({
            "connected": true,
            "notes": notes.len(),
            "triggers": ctx.get_triggers().len(),
        }))
    }

    async fn on_setup_start(&self, _ctx: &SkillContext) -> Result<SetupStep> {
        Ok(profile_step())
    }

    async fn on_setup_submit(
        &self,
        ctx: &SkillContext,
        step_id: &str,
        values: &serde_json::Map<String, Value>,
    ) -> Result<SetupResult> {
        match step_id {
            "profile" => {
                let name = values.get("name").and_then(Value::as_str).unwrap_or("");
                if name.is_empty() {
                    return Ok(SetupResult::error(vec![SetupFieldError::new(
                        "name",
                        "Name is required",
                    )]));
                }
                ctx.set_state(json!({"profile_name": name})).await?;
                Ok(SetupResult::next(preferences_step()))
            }
            "preferences" => Ok(SetupResult::complete("Setup complete")),
            other => Ok(SetupResult::error(vec![SetupFieldError::new(
                "step",
                format!("Unexpected step: {other}"),
            )])),
        }
    }
}

fn profile_step() -> SetupStep {
    SetupStep::new("profile", "Your profile")
        .with_description("Tell the notebook who you are")
        .with_field(
            SetupField::new("name", SetupFieldType::Text, "Display name")
                .required()
                .with_placeholder("Ada"),
        )
}

fn preferences_step() -> SetupStep {
    SetupStep::new("preferences", "Preferences").with_field(
        SetupField::new("daily_digest", SetupFieldType::Boolean, "Send a daily digest")
            .with_default(json!(false)),
    )
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

fn skill() -> SkillDefinition {
    SkillDefinition::new("kitchen-sink", "Demonstrates every skill runtime feature")
        .with_version("1.0.0")
        .with_tool(AddNoteTool)
        .with_tool(ListNotesTool)
        .with_hooks(Arc::new(KitchenSinkHooks))
        .with_option(
            OptionDefinition::boolean("enable_history", "Enable note history", true)
                .with_description("Expose the list-notes tool to the model")
                .with_tool_filter(["list-notes"]),
        )
        .with_option(
            OptionDefinition::text("note_prefix", "Message prefix", "")
                .with_description("Prefix prepended to every user message"),
        )
        .with_tick_interval(60_000)
        .with_setup()
        .with_trigger_schema(TriggerSchema::new(vec![TriggerTypeDefinition::new(
            "note_added",
            "Note added",
            "Fires when a new note matches the conditions",
        )
        .with_condition_field(TriggerFieldSchema::new(
            "note.text",
            "string",
            "Body of the added note",
        ))
        .with_config_schema(json!({
            "type": "object",
            "properties": {
                "exclude_outgoing": {
                    "type": "boolean",
                    "description": "Skip notes written by the assistant (default true)",
                }
            }
        }))]))
}

#[tokio::main]
async fn main() -> Result<()> {
    skillrt::logging::init(tracing::Level::INFO);
    SkillServer::new(skill())?.start().await
}
