// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trigger subsystem end-to-end: CRUD through host methods and generated
//! tools, validation failures, cooldown suppression, and persistence.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use common::TestHost;
use skillrt::tools::{ToolHandler, ToolOutput};
use skillrt::types::{SkillHooks, ToolDefinition};
use skillrt::{
    InputSchema, Result, SkillContext, SkillDefinition, ToolError, TriggerFieldSchema,
    TriggerSchema, TriggerTypeDefinition,
};

/// Feeds an event through the trigger registry and fires every match.
struct IngestTool;

#[async_trait]
impl ToolHandler for IngestTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("ingest", "Ingest a message event").with_schema(
            InputSchema::new()
                .with_property("text", json!({"type": "string"}))
                .with_required(vec!["text".to_string()]),
        )
    }

    async fn execute(&self, input: Value, ctx: &SkillContext) -> std::result::Result<ToolOutput, ToolError> {
        let text = input["text"].as_str().unwrap_or_default().to_string();
        let event = json!({"message": {"text": text}});
        let matched = ctx.match_triggers("message_match", &event, |_| true);
        let count = matched.len();
        for trigger in matched {
            ctx.fire_trigger(&trigger.id, json!({"message_text": text}), None)
                .await
                .map_err(ToolError::from)?;
        }
        Ok(ToolOutput::success(format!("fired {count}")))
    }
}

struct StatusHooks;

#[async_trait]
impl SkillHooks for StatusHooks {
    async fn on_status(&self, ctx: &SkillContext) -> Result<Value> {
        Ok(json!({"triggers": ctx.get_triggers().len()}))
    }
}

fn trigger_skill() -> SkillDefinition {
    SkillDefinition::new("watcher", "Trigger test skill")
        .with_tool(IngestTool)
        .with_hooks(Arc::new(StatusHooks))
        .with_trigger_schema(TriggerSchema::new(vec![TriggerTypeDefinition::new(
            "message_match",
            "Message match",
            "Fires when an incoming message matches",
        )
        .with_condition_field(TriggerFieldSchema::new(
            "message.text",
            "string",
            "Message body",
        ))]))
}

fn btc_trigger_params() -> Value {
    json!({
        "type": "message_match",
        "name": "BTC watch",
        "conditions": [
            {"type": "keyword", "field": "message.text", "keywords": ["btc"]}
        ],
    })
}

#[tokio::test]
async fn trigger_tools_are_always_listed() {
    let mut host = TestHost::start(trigger_skill());
    host.load_and_activate().await;

    let result = host.request_ok("tools/list", Value::Null).await;
    let names: Vec<&str> = result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "ingest",
            "list-trigger-types",
            "list-triggers",
            "get-trigger",
            "create-trigger",
            "update-trigger",
            "delete-trigger",
        ]
    );
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let mut host = TestHost::start(trigger_skill());
    host.load_and_activate().await;

    let created = host
        .request_ok("triggers/create", btc_trigger_params())
        .await;
    let trigger = &created["trigger"];
    let id = trigger["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert!(!trigger["createdAt"].as_str().unwrap().is_empty());
    assert_eq!(trigger["enabled"], json!(true));

    let fetched = host.request_ok("triggers/get", json!({"id": id})).await;
    assert_eq!(fetched["trigger"], created["trigger"]);

    let listed = host.request_ok("triggers/list", Value::Null).await;
    assert_eq!(listed["triggers"].as_array().unwrap().len(), 1);

    // Persisted through the host on every mutation.
    let persisted: Value =
        serde_json::from_str(host.files.get("triggers.json").expect("not persisted")).unwrap();
    assert_eq!(persisted[0]["id"], json!(id));
}

#[tokio::test]
async fn create_via_tool_and_invalid_regex_rejected() {
    let mut host = TestHost::start(trigger_skill());
    host.load_and_activate().await;

    // Happy path through the generated tool.
    let ok = host
        .request_ok(
            "tools/call",
            json!({"name": "create-trigger", "arguments": btc_trigger_params()}),
        )
        .await;
    assert_eq!(ok["isError"], json!(false));

    // A broken regex is a user-visible tool error, and nothing is added.
    let bad = host
        .request_ok(
            "tools/call",
            json!({
                "name": "create-trigger",
                "arguments": {
                    "type": "message_match",
                    "name": "broken",
                    "conditions": [
                        {"type": "regex", "field": "message.text", "pattern": "[unterminated"}
                    ],
                },
            }),
        )
        .await;
    assert_eq!(bad["isError"], json!(true));
    assert!(bad["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Invalid regex pattern"));

    let listed = host.request_ok("triggers/list", Value::Null).await;
    assert_eq!(listed["triggers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_type_and_empty_conditions_rejected() {
    let mut host = TestHost::start(trigger_skill());
    host.load_and_activate().await;

    let unknown = host
        .request_err(
            "triggers/create",
            json!({
                "type": "price_alert",
                "name": "x",
                "conditions": [{"type": "keyword", "field": "f", "keywords": ["k"]}],
            }),
        )
        .await;
    assert!(unknown.contains("Unknown trigger type: price_alert"));

    let empty = host
        .request_err(
            "triggers/create",
            json!({"type": "message_match", "name": "x", "conditions": []}),
        )
        .await;
    assert!(empty.contains("At least one condition is required"));
}

#[tokio::test]
async fn update_and_delete_lifecycle() {
    let mut host = TestHost::start(trigger_skill());
    host.load_and_activate().await;

    let created = host
        .request_ok("triggers/create", btc_trigger_params())
        .await;
    let id = created["trigger"]["id"].as_str().unwrap().to_string();

    let updated = host
        .request_ok(
            "triggers/update",
            json!({"id": id, "name": "renamed", "enabled": false}),
        )
        .await;
    assert_eq!(updated["trigger"]["name"], "renamed");
    assert_eq!(updated["trigger"]["enabled"], json!(false));

    let deleted = host.request_ok("triggers/delete", json!({"id": id})).await;
    assert_eq!(deleted, json!({"ok": true}));

    // Deleting again fails with a user-visible message.
    let message = host
        .request_err("triggers/delete", json!({"id": id}))
        .await;
    assert!(message.contains("Unknown trigger"));

    let persisted: Value =
        serde_json::from_str(host.files.get("triggers.json").unwrap()).unwrap();
    assert_eq!(persisted, json!([]));
}

#[tokio::test]
async fn matching_event_fires_once_within_cooldown() {
    let mut host = TestHost::start(trigger_skill());
    host.load_and_activate().await;
    host.request_ok("triggers/create", btc_trigger_params())
        .await;

    // First matching event fires.
    let first = host
        .request_ok(
            "tools/call",
            json!({"name": "ingest", "arguments": {"text": "btc pump"}}),
        )
        .await;
    assert_eq!(first["content"][0]["text"], "fired 1");
    assert_eq!(host.fired.len(), 1);
    assert_eq!(host.fired[0]["matchedData"]["message_text"], "btc pump");
    assert!(host.fired[0]["firedAt"].as_str().is_some());

    // A second match inside the 5s window is suppressed.
    let second = host
        .request_ok(
            "tools/call",
            json!({"name": "ingest", "arguments": {"text": "btc again"}}),
        )
        .await;
    assert_eq!(second["content"][0]["text"], "fired 0");
    assert_eq!(host.fired.len(), 1);

    // Non-matching events never fire.
    let miss = host
        .request_ok(
            "tools/call",
            json!({"name": "ingest", "arguments": {"text": "quiet day"}}),
        )
        .await;
    assert_eq!(miss["content"][0]["text"], "fired 0");
}

#[tokio::test]
async fn triggers_rehydrate_on_load() {
    let mut host = TestHost::start(trigger_skill());
    host.files.insert(
        "triggers.json".to_string(),
        json!([
            {
                "id": "persisted-1",
                "type": "message_match",
                "name": "from disk",
                "conditions": [
                    {"type": "keyword", "field": "message.text", "keywords": ["eth"]}
                ],
                "createdAt": "2026-01-01T00:00:00Z",
            },
            {
                "id": "persisted-2",
                "type": "legacy_type",
                "name": "undeclared but kept",
                "conditions": [
                    {"type": "keyword", "field": "x", "keywords": ["y"]}
                ],
                "created_at": "2025-06-01T00:00:00Z",
            }
        ])
        .to_string(),
    );
    host.load_and_activate().await;

    let listed = host.request_ok("triggers/list", Value::Null).await;
    let triggers = listed["triggers"].as_array().unwrap();
    assert_eq!(triggers.len(), 2);

    // Soft-compat: the undeclared type is present and queryable.
    let legacy = host
        .request_ok("triggers/get", json!({"id": "persisted-2"}))
        .await;
    assert_eq!(legacy["trigger"]["type"], "legacy_type");
    // Legacy snake_case timestamps survive the round trip.
    assert_eq!(legacy["trigger"]["createdAt"], "2025-06-01T00:00:00Z");

    // Rehydrated triggers are live.
    host.request_ok(
        "tools/call",
        json!({"name": "ingest", "arguments": {"text": "eth is moving"}}),
    )
    .await;
    assert_eq!(host.fired.len(), 1);
    assert_eq!(host.fired[0]["triggerId"], "persisted-1");
}

#[tokio::test]
async fn unload_clears_triggers_without_persisting() {
    let mut host = TestHost::start(trigger_skill());
    host.load_and_activate().await;
    host.request_ok("triggers/create", btc_trigger_params())
        .await;
    let persisted_before = host.files.get("triggers.json").unwrap().clone();

    host.request_ok("skill/unload", Value::Null).await;

    // In-memory registry is gone but the file is untouched.
    assert_eq!(host.files.get("triggers.json").unwrap(), &persisted_before);

    host.load_and_activate().await;
    let status = host.request_ok("skill/status", Value::Null).await;
    assert_eq!(status["status"]["triggers"], json!(1));
}

#[tokio::test]
async fn trigger_types_listing() {
    let mut host = TestHost::start(trigger_skill());
    let types = host.request_ok("triggers/types", Value::Null).await;
    assert_eq!(types["triggerTypes"][0]["type"], "message_match");
    assert_eq!(
        types["triggerTypes"][0]["conditionFields"][0]["name"],
        "message.text"
    );

    let via_tool = host
        .request_ok(
            "tools/call",
            json!({"name": "list-trigger-types", "arguments": {}}),
        )
        .await;
    assert_eq!(via_tool["isError"], json!(false));
    let text = via_tool["content"][0]["text"].as_str().unwrap();
    let parsed: Value = serde_json::from_str(text).unwrap();
    assert_eq!(parsed["triggerTypes"][0]["type"], "message_match");
}

#[tokio::test]
async fn fired_notifications_reach_host_with_context() {
    let mut host = TestHost::start(trigger_skill());
    host.load_and_activate().await;

    let created = host
        .request_ok("triggers/create", btc_trigger_params())
        .await;
    let id = created["trigger"]["id"].as_str().unwrap();

    host.request_ok(
        "tools/call",
        json!({"name": "ingest", "arguments": {"text": "btc!"}}),
    )
    .await;

    assert_eq!(host.fired.len(), 1);
    let fired = &host.fired[0];
    assert_eq!(fired["triggerId"], json!(id));
    assert_eq!(fired["triggerName"], "BTC watch");
    assert_eq!(fired["triggerType"], "message_match");
    assert_eq!(fired["context"], json!({}));

    // Cooldown state does not leak across triggers: a different trigger
    // still fires for its own first match.
    host.request_ok(
        "triggers/create",
        json!({
            "type": "message_match",
            "name": "ETH watch",
            "conditions": [
                {"type": "keyword", "field": "message.text", "keywords": ["eth"]}
            ],
        }),
    )
    .await;
    let _ = host
        .request_ok(
            "tools/call",
            json!({"name": "ingest", "arguments": {"text": "eth!"}}),
        )
        .await;
    assert_eq!(host.fired.len(), 2);
}
