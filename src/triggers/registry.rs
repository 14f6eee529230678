// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory trigger registry.
//!
//! Stores trigger instances, validates creation and updates against the
//! declared schema, and matches incoming events against enabled triggers
//! with a per-trigger firing cooldown on a monotonic clock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::conditions::evaluate;
use super::types::{Condition, TriggerInstance, TriggerSchema};
use crate::error::TriggerError;

/// Minimum interval between successive firings of one trigger.
pub const COOLDOWN: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RegistryInner {
    triggers: HashMap<String, TriggerInstance>,
    last_fired: HashMap<String, Instant>,
}

/// Parameters accepted by `triggers/create` and the `create-trigger` tool.
#[derive(Debug, Deserialize)]
struct CreateParams {
    #[serde(rename = "type", default)]
    trigger_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default)]
    config: serde_json::Map<String, Value>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    metadata: serde_json::Map<String, Value>,
}

/// Parameters accepted by `triggers/update` and the `update-trigger` tool.
#[derive(Debug, Deserialize)]
struct UpdateParams {
    #[serde(default)]
    id: String,
    name: Option<String>,
    description: Option<String>,
    conditions: Option<Vec<Condition>>,
    config: Option<serde_json::Map<String, Value>>,
    enabled: Option<bool>,
    metadata: Option<serde_json::Map<String, Value>>,
}

/// Registry of trigger instances for one skill.
pub struct TriggerRegistry {
    schema: Option<TriggerSchema>,
    inner: Mutex<RegistryInner>,
}

impl TriggerRegistry {
    pub fn new(schema: Option<TriggerSchema>) -> Self {
        Self {
            schema,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// The declared trigger schema, if any.
    pub fn schema(&self) -> Option<&TriggerSchema> {
        self.schema.as_ref()
    }

    /// Whether this skill declared trigger support.
    pub fn has_schema(&self) -> bool {
        self.schema.is_some()
    }

    /// Get a trigger by id.
    pub fn get(&self, id: &str) -> Option<TriggerInstance> {
        self.lock().triggers.get(id).cloned()
    }

    /// All triggers, ordered by creation time then id.
    pub fn list(&self) -> Vec<TriggerInstance> {
        let mut triggers: Vec<_> = self.lock().triggers.values().cloned().collect();
        triggers.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        triggers
    }

    pub fn len(&self) -> usize {
        self.lock().triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().triggers.is_empty()
    }

    /// Remove all triggers and cooldown state (skill unload).
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.triggers.clear();
        inner.last_fired.clear();
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Validate creation params and insert a new trigger.
    ///
    /// Returns the created instance. Undeclared condition fields are logged
    /// as warnings, not errors.
    pub fn create(&self, params: &Value) -> Result<TriggerInstance, TriggerError> {
        let params: CreateParams = serde_json::from_value(params.clone())
            .map_err(|err| TriggerError::InvalidCondition(err.to_string()))?;

        if params.trigger_type.is_empty() {
            return Err(TriggerError::MissingType);
        }
        if params.name.is_empty() {
            return Err(TriggerError::MissingName);
        }
        if params.conditions.is_empty() {
            return Err(TriggerError::EmptyConditions);
        }

        self.check_type_declared(&params.trigger_type)?;
        self.validate_conditions(&params.conditions, &params.trigger_type)?;

        let trigger = TriggerInstance {
            id: Uuid::new_v4().to_string(),
            trigger_type: params.trigger_type,
            name: params.name,
            description: params.description,
            conditions: params.conditions,
            config: params.config,
            enabled: params.enabled.unwrap_or(true),
            created_at: Utc::now().to_rfc3339(),
            metadata: params.metadata,
        };

        self.lock()
            .triggers
            .insert(trigger.id.clone(), trigger.clone());
        debug!(id = %trigger.id, name = %trigger.name, "Registered trigger");
        Ok(trigger)
    }

    /// Apply a partial update to an existing trigger.
    pub fn update(&self, params: &Value) -> Result<TriggerInstance, TriggerError> {
        let params: UpdateParams = serde_json::from_value(params.clone())
            .map_err(|err| TriggerError::InvalidCondition(err.to_string()))?;

        let existing = self
            .get(&params.id)
            .ok_or_else(|| TriggerError::Unknown(params.id.clone()))?;

        if let Some(conditions) = &params.conditions {
            if conditions.is_empty() {
                return Err(TriggerError::EmptyConditions);
            }
            self.validate_conditions(conditions, &existing.trigger_type)?;
        }

        let updated = TriggerInstance {
            id: existing.id.clone(),
            trigger_type: existing.trigger_type,
            name: params.name.unwrap_or(existing.name),
            description: params.description.unwrap_or(existing.description),
            conditions: params.conditions.unwrap_or(existing.conditions),
            config: params.config.unwrap_or(existing.config),
            enabled: params.enabled.unwrap_or(existing.enabled),
            created_at: existing.created_at,
            metadata: params.metadata.unwrap_or(existing.metadata),
        };

        self.lock()
            .triggers
            .insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    /// Delete a trigger by id.
    pub fn delete(&self, id: &str) -> Result<(), TriggerError> {
        let mut inner = self.lock();
        if inner.triggers.remove(id).is_none() {
            return Err(TriggerError::Unknown(id.to_string()));
        }
        inner.last_fired.remove(id);
        debug!(id, "Removed trigger");
        Ok(())
    }

    /// Rehydrate triggers from their persisted form.
    ///
    /// Entries whose type is no longer declared are retained with a warning;
    /// entries that fail to parse are skipped.
    pub fn rehydrate(&self, items: &[Value]) -> Vec<TriggerInstance> {
        let mut loaded = Vec::new();
        for item in items {
            let trigger: TriggerInstance = match serde_json::from_value(item.clone()) {
                Ok(trigger) => trigger,
                Err(err) => {
                    warn!(%err, "Skipping unparseable persisted trigger");
                    continue;
                }
            };
            if self.check_type_declared(&trigger.trigger_type).is_err() {
                warn!(
                    trigger_type = %trigger.trigger_type,
                    id = %trigger.id,
                    "Persisted trigger type no longer declared, loading anyway"
                );
            }
            self.lock()
                .triggers
                .insert(trigger.id.clone(), trigger.clone());
            loaded.push(trigger);
        }
        loaded
    }

    /// Serialize the whole registry for `triggers.json`.
    pub fn to_persisted(&self) -> Value {
        Value::Array(
            self.list()
                .iter()
                .map(|t| serde_json::to_value(t).expect("trigger serialization cannot fail"))
                .collect(),
        )
    }

    // ------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------

    /// Match an event against enabled triggers of the given type.
    ///
    /// `prefilter` runs the skill's config-based filtering before condition
    /// evaluation. The cooldown timestamp is stamped as soon as a trigger
    /// matches, so back-to-back matches inside the window are suppressed
    /// regardless of how long firing takes.
    pub fn match_event<F>(&self, event_type: &str, data: &Value, prefilter: F) -> Vec<TriggerInstance>
    where
        F: Fn(&TriggerInstance) -> bool,
    {
        self.match_event_at(event_type, data, prefilter, Instant::now())
    }

    /// Match with an explicit monotonic timestamp (test hook).
    pub fn match_event_at<F>(
        &self,
        event_type: &str,
        data: &Value,
        prefilter: F,
        now: Instant,
    ) -> Vec<TriggerInstance>
    where
        F: Fn(&TriggerInstance) -> bool,
    {
        let mut inner = self.lock();
        let mut matched = Vec::new();

        let mut candidates: Vec<_> = inner
            .triggers
            .values()
            .filter(|t| t.enabled && t.trigger_type == event_type)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        for trigger in candidates {
            if let Some(last) = inner.last_fired.get(&trigger.id) {
                if now.duration_since(*last) < COOLDOWN {
                    continue;
                }
            }

            if !prefilter(&trigger) {
                continue;
            }

            if trigger.conditions.iter().all(|c| evaluate(c, data)) {
                inner.last_fired.insert(trigger.id.clone(), now);
                matched.push(trigger);
            }
        }

        matched
    }

    // ------------------------------------------------------------------
    // Validation helpers
    // ------------------------------------------------------------------

    fn check_type_declared(&self, trigger_type: &str) -> Result<(), TriggerError> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        if schema.get(trigger_type).is_none() {
            let mut valid = schema.type_names();
            valid.sort();
            return Err(TriggerError::UnknownType {
                given: trigger_type.to_string(),
                valid,
            });
        }
        Ok(())
    }

    /// Validate condition trees: depth, regex, keywords are errors;
    /// undeclared field references are warnings only.
    fn validate_conditions(
        &self,
        conditions: &[Condition],
        trigger_type: &str,
    ) -> Result<(), TriggerError> {
        for condition in conditions {
            condition.validate()?;
        }

        if let Some(declared) = self
            .schema
            .as_ref()
            .and_then(|s| s.get(trigger_type))
            .map(|t| {
                t.condition_fields
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
            })
        {
            let mut referenced = Vec::new();
            for condition in conditions {
                condition.referenced_fields(&mut referenced);
            }
            for field in referenced {
                if !declared.contains(&field) {
                    warn!(field, trigger_type, "Condition field not in declared fields");
                }
            }
        }

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().expect("trigger registry poisoned")
    }
}
