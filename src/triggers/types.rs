// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trigger data model.
//!
//! Skills declare trigger types they support; the language model creates
//! trigger instances through auto-generated tools; skills evaluate incoming
//! events against the registered condition trees.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TriggerError;

/// Maximum condition nesting depth, enforced at creation and evaluation.
pub const MAX_NESTING_DEPTH: usize = 5;

// ============================================================================
// Conditions
// ============================================================================

/// Whether any or all keywords must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Any,
    All,
}

/// Comparison operator for threshold conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdOp {
    Gt,
    Lt,
    Eq,
    Gte,
    Lte,
    Neq,
}

/// A node in a trigger's condition tree.
///
/// Leaf variants (`regex`, `keyword`, `threshold`) test a dotted-path field
/// of the event data; compound variants (`and`, `or`, `not`) combine
/// children. `not` negates its first child only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Condition {
    Regex {
        /// Dot-path to the data field, e.g. "message.text".
        field: String,
        pattern: String,
        /// Flags string containing any of `i`, `m`, `s`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
    },
    Keyword {
        field: String,
        keywords: Vec<String>,
        #[serde(
            default,
            rename = "matchMode",
            alias = "match_mode",
            skip_serializing_if = "Option::is_none"
        )]
        match_mode: Option<MatchMode>,
    },
    Threshold {
        field: String,
        operator: ThresholdOp,
        value: f64,
    },
    And { conditions: Vec<Condition> },
    Or { conditions: Vec<Condition> },
    Not { conditions: Vec<Condition> },
}

impl Condition {
    /// Case-insensitive regex leaf.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>, flags: Option<&str>) -> Self {
        Self::Regex {
            field: field.into(),
            pattern: pattern.into(),
            flags: flags.map(str::to_string),
        }
    }

    /// Keyword leaf with the default `any` match mode.
    pub fn keyword<I, S>(field: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keyword {
            field: field.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            match_mode: None,
        }
    }

    /// Threshold leaf.
    pub fn threshold(field: impl Into<String>, operator: ThresholdOp, value: f64) -> Self {
        Self::Threshold {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Validate this condition tree for creation.
    ///
    /// Checks nesting depth, regex compilability, and non-empty keyword
    /// lists. Field-name checks against the declared schema are done by the
    /// registry because they are warn-only.
    pub fn validate(&self) -> Result<(), TriggerError> {
        self.validate_at(0)
    }

    fn validate_at(&self, depth: usize) -> Result<(), TriggerError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(TriggerError::DepthExceeded(MAX_NESTING_DEPTH));
        }
        match self {
            Self::Regex { pattern, .. } => {
                Regex::new(pattern).map_err(|err| TriggerError::InvalidRegex {
                    pattern: pattern.clone(),
                    message: err.to_string(),
                })?;
                Ok(())
            }
            Self::Keyword { keywords, .. } => {
                if keywords.is_empty() {
                    return Err(TriggerError::EmptyKeywords);
                }
                Ok(())
            }
            Self::Threshold { .. } => Ok(()),
            Self::And { conditions } | Self::Or { conditions } | Self::Not { conditions } => {
                for child in conditions {
                    child.validate_at(depth + 1)?;
                }
                Ok(())
            }
        }
    }

    /// Collect the dotted-path field names referenced by leaf conditions.
    pub fn referenced_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Regex { field, .. }
            | Self::Keyword { field, .. }
            | Self::Threshold { field, .. } => out.push(field),
            Self::And { conditions } | Self::Or { conditions } | Self::Not { conditions } => {
                for child in conditions {
                    child.referenced_fields(out);
                }
            }
        }
    }
}

// ============================================================================
// Trigger Type Declarations
// ============================================================================

/// Describes a field usable in trigger conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerFieldSchema {
    /// Dot-path field name, e.g. "message.text".
    pub name: String,
    /// JSON Schema type: string, number, boolean.
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: String,
}

impl TriggerFieldSchema {
    pub fn new(
        name: impl Into<String>,
        field_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            description: description.into(),
        }
    }
}

/// Declares a trigger type the skill supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTypeDefinition {
    /// Trigger type identifier, e.g. "message_match".
    #[serde(rename = "type")]
    pub trigger_type: String,
    pub label: String,
    pub description: String,
    /// Fields available for conditions of this trigger type.
    #[serde(default)]
    pub condition_fields: Vec<TriggerFieldSchema>,
    /// JSON Schema for trigger-type-specific config.
    #[serde(default)]
    pub config_schema: Value,
}

impl TriggerTypeDefinition {
    pub fn new(
        trigger_type: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            trigger_type: trigger_type.into(),
            label: label.into(),
            description: description.into(),
            condition_fields: Vec::new(),
            config_schema: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_condition_field(mut self, field: TriggerFieldSchema) -> Self {
        self.condition_fields.push(field);
        self
    }

    pub fn with_config_schema(mut self, schema: Value) -> Self {
        self.config_schema = schema;
        self
    }
}

/// Collection of trigger types a skill supports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSchema {
    pub trigger_types: Vec<TriggerTypeDefinition>,
}

impl TriggerSchema {
    pub fn new(trigger_types: Vec<TriggerTypeDefinition>) -> Self {
        Self { trigger_types }
    }

    /// Look up a declared type.
    pub fn get(&self, trigger_type: &str) -> Option<&TriggerTypeDefinition> {
        self.trigger_types
            .iter()
            .find(|t| t.trigger_type == trigger_type)
    }

    /// Names of all declared types.
    pub fn type_names(&self) -> Vec<String> {
        self.trigger_types
            .iter()
            .map(|t| t.trigger_type.clone())
            .collect()
    }
}

// ============================================================================
// Trigger Instances
// ============================================================================

fn default_true() -> bool {
    true
}

/// A registered trigger instance with conditions and config.
///
/// Serialized in camelCase on the wire and in `triggers.json`; reading
/// tolerates legacy snake_case `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerInstance {
    pub id: String,
    /// Trigger type (matches a declared TriggerTypeDefinition).
    #[serde(rename = "type")]
    pub trigger_type: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub conditions: Vec<Condition>,
    /// Trigger-type-specific configuration.
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, alias = "created_at")]
    pub created_at: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

/// Payload sent to the host when a trigger fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerFiredEvent {
    pub trigger_id: String,
    pub trigger_name: String,
    pub trigger_type: String,
    pub fired_at: String,
    #[serde(default)]
    pub matched_data: Value,
    #[serde(default)]
    pub context: Value,
}
