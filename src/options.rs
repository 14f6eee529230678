// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Options store.
//!
//! Typed, persisted runtime settings. Defaults apply at load and are
//! overlaid by `options.json`; mutations are validated per declared type.
//! Boolean options with a `tool_filter` hide tools from the language model
//! while false.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;
use tracing::debug;

use crate::error::OptionsError;
use crate::types::{OptionDefinition, OptionType};

/// Store of current option values for one skill.
pub struct OptionsStore {
    defs: Vec<OptionDefinition>,
    values: Mutex<HashMap<String, Value>>,
}

impl OptionsStore {
    /// Create a store with every option at its declared default.
    pub fn new(defs: Vec<OptionDefinition>) -> Self {
        let values = defs
            .iter()
            .map(|d| (d.name.clone(), d.default.clone()))
            .collect();
        Self {
            defs,
            values: Mutex::new(values),
        }
    }

    /// Declared options, in declaration order.
    pub fn definitions(&self) -> &[OptionDefinition] {
        &self.defs
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Current value of one option.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.lock().get(name).cloned()
    }

    /// Snapshot of all current values.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.lock().clone()
    }

    /// Set an option after per-type validation.
    pub fn set(&self, name: &str, value: Value) -> Result<(), OptionsError> {
        let def = self
            .defs
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| OptionsError::Unknown(name.to_string()))?;

        match def.option_type {
            OptionType::Boolean => {
                if !value.is_boolean() {
                    return Err(OptionsError::TypeMismatch {
                        name: name.to_string(),
                        expected: "boolean",
                    });
                }
            }
            OptionType::Number => {
                if !value.is_number() {
                    return Err(OptionsError::TypeMismatch {
                        name: name.to_string(),
                        expected: "numeric",
                    });
                }
            }
            OptionType::Text => {
                if !value.is_string() {
                    return Err(OptionsError::TypeMismatch {
                        name: name.to_string(),
                        expected: "string",
                    });
                }
            }
            OptionType::Select => {
                let given = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if !def.options.iter().any(|c| c.value == given) {
                    return Err(OptionsError::InvalidChoice {
                        name: name.to_string(),
                        valid: def.options.iter().map(|c| c.value.clone()).collect(),
                    });
                }
            }
        }

        self.lock().insert(name.to_string(), value);
        Ok(())
    }

    /// Restore every option to its declared default.
    pub fn reset(&self) {
        let mut values = self.lock();
        values.clear();
        for def in &self.defs {
            values.insert(def.name.clone(), def.default.clone());
        }
    }

    /// Overlay persisted values from `options.json`.
    ///
    /// Read-lenient: unknown keys are ignored, missing keys keep their
    /// defaults, and a non-object payload is ignored entirely.
    pub fn merge_persisted(&self, raw: &Value) {
        let Some(obj) = raw.as_object() else {
            return;
        };
        let mut values = self.lock();
        for def in &self.defs {
            if let Some(value) = obj.get(&def.name) {
                values.insert(def.name.clone(), value.clone());
            }
        }
    }

    /// Tools currently hidden by false boolean options.
    pub fn hidden_tools(&self) -> HashSet<String> {
        let values = self.lock();
        let mut hidden = HashSet::new();
        for def in &self.defs {
            if def.option_type != OptionType::Boolean || def.tool_filter.is_empty() {
                continue;
            }
            let enabled = values
                .get(&def.name)
                .or(Some(&def.default))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !enabled {
                hidden.extend(def.tool_filter.iter().cloned());
            }
        }
        if !hidden.is_empty() {
            debug!(?hidden, "Tool filter active");
        }
        hidden
    }

    /// Payload for `options/list`: full descriptors plus current values.
    pub fn list_payload(&self) -> Value {
        let values = self.lock();
        let options: Vec<Value> = self
            .defs
            .iter()
            .map(|def| {
                serde_json::json!({
                    "name": def.name,
                    "type": def.option_type,
                    "label": def.label,
                    "description": def.description,
                    "default": def.default,
                    "options": if def.options.is_empty() {
                        Value::Null
                    } else {
                        serde_json::to_value(&def.options).expect("choices serialize")
                    },
                    "group": def.group,
                    "toolFilter": if def.tool_filter.is_empty() {
                        Value::Null
                    } else {
                        serde_json::to_value(&def.tool_filter).expect("filter serializes")
                    },
                    "value": values.get(&def.name).cloned().unwrap_or(def.default.clone()),
                })
            })
            .collect();
        serde_json::json!({ "options": options })
    }

    /// Payload for `options.json` persistence.
    pub fn to_persisted(&self) -> Value {
        serde_json::to_value(self.snapshot()).expect("option values serialize")
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().expect("options store poisoned")
    }
}
