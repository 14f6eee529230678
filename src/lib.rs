// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! skillrt - a sandboxed skill runtime.
//!
//! A subprocess host that loads one declarative *skill* (lifecycle hooks,
//! AI-callable tools, user-configurable options, and user-authored triggers)
//! and exposes it to a parent application over bidirectional line-delimited
//! JSON-RPC 2.0 on stdin/stdout.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (SkillDefinition, ToolDefinition, hooks)
//! - [`error`] - Error types and result aliases
//! - [`rpc`] - JSON-RPC framing and the reverse-RPC client
//! - [`server`] - Read loop, method dispatch, lifecycle state machine
//! - [`tools`] - Tool handler trait and registry
//! - [`options`] - Typed, persisted settings with tool filtering
//! - [`triggers`] - Condition evaluator, trigger registry, CRUD tools
//! - [`setup`] - Setup wizard step/result types
//! - [`context`] - The context façade handed to hooks and tools
//! - [`logging`] - Tracing initialization (stderr)
//!
//! # Example
//!
//! ```rust,ignore
//! use skillrt::{SkillDefinition, SkillServer};
//!
//! #[tokio::main]
//! async fn main() -> skillrt::Result<()> {
//!     skillrt::logging::init(tracing::Level::INFO);
//!
//!     let skill = SkillDefinition::new("notes", "Keeps short notes")
//!         .with_tool(AddNoteTool)
//!         .with_hooks(std::sync::Arc::new(NotesHooks));
//!
//!     SkillServer::new(skill)?.start().await
//! }
//! ```

pub mod context;
pub mod error;
pub mod logging;
pub mod options;
pub mod rpc;
pub mod server;
pub mod setup;
pub mod tools;
pub mod triggers;
pub mod types;

// Re-export commonly used types at crate root
pub use context::{EntityUpsert, RelationshipUpsert, SkillContext};
pub use error::{LifecycleError, OptionsError, Result, RpcError, ToolError, TriggerError};
pub use server::{LifecycleState, SkillServer};
pub use setup::{SetupField, SetupFieldError, SetupFieldOption, SetupFieldType, SetupResult, SetupStatus, SetupStep};
pub use tools::{parse_arguments, ToolHandler, ToolOutput};
pub use triggers::{
    Condition, MatchMode, ThresholdOp, TriggerFieldSchema, TriggerInstance, TriggerSchema,
    TriggerTypeDefinition,
};
pub use types::{
    EntitySchema, EntityTypeDeclaration, InputSchema, NoHooks, OptionDefinition, OptionType,
    SelectChoice, SkillDefinition, SkillHooks, ToolDefinition,
};

/// Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
