// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trigger subsystem.
//!
//! Triggers are user-authored rules: a condition tree evaluated against live
//! event data, with rate-limited firing back to the host. Skills declare the
//! trigger types they support; the language model manages instances through
//! auto-generated CRUD tools; the registry persists to `triggers.json`.

pub mod conditions;
pub mod registry;
pub mod tools;
pub mod types;

pub use conditions::{evaluate, resolve_field};
pub use registry::{TriggerRegistry, COOLDOWN};
pub use tools::is_trigger_tool;
pub use types::{
    Condition, MatchMode, ThresholdOp, TriggerFieldSchema, TriggerFiredEvent, TriggerInstance,
    TriggerSchema, TriggerTypeDefinition, MAX_NESTING_DEPTH,
};
