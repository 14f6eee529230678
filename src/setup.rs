// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Setup wizard types.
//!
//! The wizard is a two-method protocol: `setup/start` returns the first
//! step, `setup/submit` returns next/complete/error. The runtime only
//! serializes steps and forwards submitted values; field semantics belong to
//! the skill.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value type of a setup form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupFieldType {
    Text,
    Password,
    Number,
    Boolean,
    Select,
    Multiselect,
}

/// A choice offered by select/multiselect fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupFieldOption {
    pub label: String,
    pub value: String,
}

impl SetupFieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A single form field within a setup step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: SetupFieldType,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SetupFieldOption>>,
}

impl SetupField {
    /// Create a field of the given type.
    pub fn new(name: impl Into<String>, field_type: SetupFieldType, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            label: label.into(),
            description: String::new(),
            required: false,
            default: None,
            placeholder: None,
            options: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_options(mut self, options: Vec<SetupFieldOption>) -> Self {
        self.options = Some(options);
        self
    }
}

/// One page of the setup wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupStep {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<SetupField>,
}

impl SetupStep {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, field: SetupField) -> Self {
        self.fields.push(field);
        self
    }
}

/// Outcome of a `setup/submit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStatus {
    Next,
    Complete,
    Error,
}

/// A field-level validation error surfaced back to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupFieldError {
    pub field: String,
    pub message: String,
}

impl SetupFieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result returned by the skill's submit handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResult {
    pub status: SetupStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<SetupStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<SetupFieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SetupResult {
    /// Advance to the next step.
    pub fn next(step: SetupStep) -> Self {
        Self {
            status: SetupStatus::Next,
            next_step: Some(step),
            errors: None,
            message: None,
        }
    }

    /// Finish the wizard.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            status: SetupStatus::Complete,
            next_step: None,
            errors: None,
            message: Some(message.into()),
        }
    }

    /// Return to the same step with field errors.
    pub fn error(errors: Vec<SetupFieldError>) -> Self {
        Self {
            status: SetupStatus::Error,
            next_step: None,
            errors: Some(errors),
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serialization() {
        let step = SetupStep::new("credentials", "Account credentials")
            .with_description("Sign in to your account")
            .with_field(
                SetupField::new("email", SetupFieldType::Text, "Email")
                    .required()
                    .with_placeholder("you@example.com"),
            )
            .with_field(SetupField::new("password", SetupFieldType::Password, "Password").required());

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["id"], "credentials");
        assert_eq!(json["fields"][0]["type"], "text");
        assert_eq!(json["fields"][0]["required"], true);
        assert_eq!(json["fields"][1]["type"], "password");
        // Unset optionals are omitted, not null
        assert!(json["fields"][1].get("placeholder").is_none());
    }

    #[test]
    fn test_result_complete() {
        let result = SetupResult::complete("Connected");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["message"], "Connected");
        assert!(json.get("nextStep").is_none());
    }

    #[test]
    fn test_result_next_uses_camel_case() {
        let result = SetupResult::next(SetupStep::new("b", "Second"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "next");
        assert_eq!(json["nextStep"]["id"], "b");
    }

    #[test]
    fn test_result_error_carries_fields() {
        let result = SetupResult::error(vec![SetupFieldError::new("email", "Invalid address")]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["errors"][0]["field"], "email");
        assert_eq!(json["errors"][0]["message"], "Invalid address");
    }
}
