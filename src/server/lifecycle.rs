// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Skill lifecycle state machine.
//!
//! `unloaded → loaded → active → unloaded`, driven by host methods. The
//! setup wizard is an orthogonal flag that only exists between
//! `setup/start` and its terminating submit or cancel.

use std::sync::Mutex;

use crate::error::LifecycleError;

/// Current position in the skill lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    Loaded,
    Active,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loaded => "loaded",
            Self::Active => "active",
        }
    }
}

/// Thread-safe lifecycle holder with precondition checks.
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Unloaded),
        }
    }

    pub fn current(&self) -> LifecycleState {
        *self.state.lock().expect("lifecycle poisoned")
    }

    pub fn set(&self, state: LifecycleState) {
        *self.state.lock().expect("lifecycle poisoned") = state;
    }

    /// Check that the current state matches the method's precondition.
    pub fn ensure(&self, method: &str, required: LifecycleState) -> Result<(), LifecycleError> {
        let current = self.current();
        if current != required {
            return Err(LifecycleError::InvalidState {
                method: method.to_string(),
                state: current.name(),
            });
        }
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// In-progress setup wizard; at most one per process.
#[derive(Debug, Clone)]
pub struct WizardState {
    /// Id of the step the host is expected to submit next.
    pub step_id: String,
}
