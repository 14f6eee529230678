// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the skill runtime.
//!
//! This module provides strongly-typed errors for each subsystem,
//! using `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation across the dispatch boundary.

use thiserror::Error;

/// Errors that can occur on the reverse-RPC channel to the host.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not connected")]
    NotConnected,

    #[error("Reverse RPC timeout: {method} after {timeout_secs}s")]
    Timeout { method: String, timeout_secs: u64 },

    #[error("Host error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("Channel closed")]
    ChannelClosed,
}

impl RpcError {
    /// Create a remote error from a JSON-RPC error object.
    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
        }
    }
}

/// Errors that can occur during tool execution.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<RpcError> for ToolError {
    fn from(err: RpcError) -> Self {
        Self::ExecutionFailed(err.to_string())
    }
}

/// Errors raised while validating or mutating options.
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("Unknown option: {0}")]
    Unknown(String),

    #[error("Option '{name}' requires a {expected} value")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Option '{name}' must be one of: {valid:?}")]
    InvalidChoice { name: String, valid: Vec<String> },
}

/// Errors raised while validating or mutating triggers.
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Unknown trigger: {0}")]
    Unknown(String),

    #[error("Unknown trigger type: {given}. Valid: {valid:?}")]
    UnknownType { given: String, valid: Vec<String> },

    #[error("Trigger type is required")]
    MissingType,

    #[error("Trigger name is required")]
    MissingName,

    #[error("At least one condition is required")]
    EmptyConditions,

    #[error("Condition nesting depth exceeds maximum of {0}")]
    DepthExceeded(usize),

    #[error("Invalid regex pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Keyword condition requires at least one keyword")]
    EmptyKeywords,

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),
}

/// Errors raised by the lifecycle state machine and method dispatch.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Method {method} not allowed in state {state}")]
    InvalidState { method: String, state: &'static str },

    #[error("Skill does not implement setup flow")]
    SetupNotSupported,

    #[error("No setup session in progress")]
    SetupNotActive,

    #[error("Skill does not support disconnect")]
    DisconnectNotSupported,
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;
