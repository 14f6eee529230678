// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Skill context façade.
//!
//! The context object handed to every hook and tool execution. All host
//! state lives behind reverse RPC: the runtime never touches the filesystem
//! directly, so the host arbitrates concurrent access to the skill's data
//! directory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::RpcError;
use crate::options::OptionsStore;
use crate::rpc::{OutboundClient, SUMMARIZE_TIMEOUT};
use crate::triggers::{TriggerInstance, TriggerRegistry};

/// Mutable runtime metadata captured at `skill/load`.
#[derive(Default)]
pub(crate) struct RuntimeMeta {
    pub data_dir: String,
    pub manifest: Option<Value>,
}

/// Entity upsert parameters for the host entity graph.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpsert {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl EntityUpsert {
    pub fn new(entity_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Relationship upsert parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipUpsert {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Context object passed to skill lifecycle hooks and tools.
#[derive(Clone)]
pub struct SkillContext {
    skill_name: String,
    outbound: Arc<OutboundClient>,
    options: Arc<OptionsStore>,
    triggers: Arc<TriggerRegistry>,
    meta: Arc<Mutex<RuntimeMeta>>,
}

impl SkillContext {
    pub(crate) fn new(
        skill_name: String,
        outbound: Arc<OutboundClient>,
        options: Arc<OptionsStore>,
        triggers: Arc<TriggerRegistry>,
        meta: Arc<Mutex<RuntimeMeta>>,
    ) -> Self {
        Self {
            skill_name,
            outbound,
            options,
            triggers,
            meta,
        }
    }

    /// Path of the skill-scoped scratch directory, as told by the host.
    pub fn data_dir(&self) -> String {
        let meta = self.meta.lock().expect("runtime meta poisoned");
        if meta.data_dir.is_empty() {
            format!("skills/{}/data", self.skill_name)
        } else {
            meta.data_dir.clone()
        }
    }

    /// Write a log line to standard error.
    ///
    /// Standard output carries the wire protocol; stderr is the only place
    /// skill code may print.
    pub fn log(&self, message: &str) {
        eprintln!("[skill] {message}");
    }

    // ------------------------------------------------------------------
    // Data files (host-arbitrated)
    // ------------------------------------------------------------------

    /// Read a named data file via `data/read`.
    pub async fn read_data(&self, filename: &str) -> Result<String, RpcError> {
        let result = self
            .outbound
            .call("data/read", Some(serde_json::json!({"filename": filename})))
            .await?;
        Ok(match result.get("content") {
            Some(Value::String(content)) => content.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
    }

    /// Write a named data file via `data/write`.
    pub async fn write_data(&self, filename: &str, content: &str) -> Result<(), RpcError> {
        self.outbound
            .call(
                "data/write",
                Some(serde_json::json!({"filename": filename, "content": content})),
            )
            .await?;
        Ok(())
    }

    /// Memory namespace, routed through the data files.
    pub fn memory(&self) -> Memory<'_> {
        Memory { ctx: self }
    }

    // ------------------------------------------------------------------
    // Host state
    // ------------------------------------------------------------------

    /// Fetch the skill's persisted host-side state.
    pub async fn get_state(&self) -> Result<Value, RpcError> {
        let result = self.outbound.call("state/get", None).await?;
        Ok(result.get("state").cloned().unwrap_or(result))
    }

    /// Merge a partial update into the skill's host-side state.
    pub async fn set_state(&self, partial: Value) -> Result<(), RpcError> {
        self.outbound
            .call("state/set", Some(serde_json::json!({"partial": partial})))
            .await?;
        Ok(())
    }

    /// Emit a one-way event into the host intelligence pipeline.
    pub async fn emit_event(&self, event_type: &str, data: Value) -> Result<(), RpcError> {
        self.outbound
            .call(
                "intelligence/emitEvent",
                Some(serde_json::json!({"eventType": event_type, "data": data})),
            )
            .await?;
        Ok(())
    }

    /// Request AI summarization of a batch of messages (long timeout).
    pub async fn request_summarization(
        &self,
        messages: Vec<Value>,
        chats: Vec<Value>,
        current_user: Option<Value>,
    ) -> Result<Value, RpcError> {
        self.outbound
            .call_with_timeout(
                "intelligence/summarize",
                Some(serde_json::json!({
                    "messages": messages,
                    "chats": chats,
                    "currentUser": current_user,
                })),
                SUMMARIZE_TIMEOUT,
            )
            .await
    }

    // ------------------------------------------------------------------
    // Entity graph
    // ------------------------------------------------------------------

    /// Create or update an entity in the host graph.
    pub async fn upsert_entity(&self, entity: EntityUpsert) -> Result<(), RpcError> {
        let params = serde_json::to_value(entity)?;
        self.outbound.call("entities/upsert", Some(params)).await?;
        Ok(())
    }

    /// Create or update a relationship edge.
    pub async fn upsert_relationship(&self, relationship: RelationshipUpsert) -> Result<(), RpcError> {
        let params = serde_json::to_value(relationship)?;
        self.outbound
            .call("entities/upsertRelationship", Some(params))
            .await?;
        Ok(())
    }

    /// Full-text entity search.
    pub async fn search_entities(
        &self,
        query: &str,
        types: Option<Vec<String>>,
        limit: Option<u64>,
    ) -> Result<Vec<Value>, RpcError> {
        let mut params = serde_json::json!({"query": query});
        if let Some(types) = types {
            params["types"] = serde_json::json!(types);
        }
        if let Some(limit) = limit {
            params["limit"] = serde_json::json!(limit);
        }
        let result = self.outbound.call("entities/search", Some(params)).await?;
        Ok(result
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Relationships of an entity, optionally filtered by type.
    pub async fn get_relationships(
        &self,
        entity_id: &str,
        relationship_type: Option<&str>,
        direction: &str,
    ) -> Result<Vec<Value>, RpcError> {
        let mut params = serde_json::json!({"entityId": entity_id, "direction": direction});
        if let Some(relationship_type) = relationship_type {
            params["type"] = serde_json::json!(relationship_type);
        }
        let result = self
            .outbound
            .call("entities/getRelationships", Some(params))
            .await?;
        Ok(result
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Options & triggers
    // ------------------------------------------------------------------

    /// Snapshot of current option values.
    pub fn get_options(&self) -> HashMap<String, Value> {
        self.options.snapshot()
    }

    /// Snapshot of registered triggers.
    pub fn get_triggers(&self) -> Vec<TriggerInstance> {
        self.triggers.list()
    }

    /// Match an event against registered triggers of the given type.
    ///
    /// Applies the skill-supplied config prefilter and the per-trigger
    /// cooldown; matched triggers are stamped before this returns.
    pub fn match_triggers<F>(&self, event_type: &str, data: &Value, prefilter: F) -> Vec<TriggerInstance>
    where
        F: Fn(&TriggerInstance) -> bool,
    {
        self.triggers.match_event(event_type, data, prefilter)
    }

    /// Notify the host that a trigger fired.
    ///
    /// Unknown ids are logged and ignored so event handlers stay robust
    /// against racing deletes.
    pub async fn fire_trigger(
        &self,
        trigger_id: &str,
        matched_data: Value,
        context: Option<Value>,
    ) -> Result<(), RpcError> {
        let Some(trigger) = self.triggers.get(trigger_id) else {
            warn!(trigger_id, "fire_trigger: unknown trigger");
            return Ok(());
        };

        self.outbound
            .call(
                "triggers/fired",
                Some(serde_json::json!({
                    "triggerId": trigger.id,
                    "triggerName": trigger.name,
                    "triggerType": trigger.trigger_type,
                    "firedAt": Utc::now().to_rfc3339(),
                    "matchedData": matched_data,
                    "context": context.unwrap_or_else(|| Value::Object(Default::default())),
                })),
            )
            .await?;
        Ok(())
    }
}

/// Memory namespace on the context.
///
/// Reads and writes route through the host data files; search and listing
/// are host-side features the data channel does not expose, so they return
/// empty results.
pub struct Memory<'a> {
    ctx: &'a SkillContext,
}

impl Memory<'_> {
    /// Read a memory entry; absent entries yield `None`.
    pub async fn read(&self, name: &str) -> Option<String> {
        self.ctx.read_data(name).await.ok()
    }

    pub async fn write(&self, name: &str, content: &str) -> Result<(), RpcError> {
        self.ctx.write_data(name, content).await
    }

    pub async fn search(&self, _query: &str) -> Vec<HashMap<String, String>> {
        Vec::new()
    }

    pub async fn list(&self) -> Vec<String> {
        Vec::new()
    }

    pub async fn delete(&self, _name: &str) {}
}
