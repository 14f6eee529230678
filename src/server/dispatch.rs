// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Inbound method dispatch.
//!
//! Routes every host-facing method to its handler. Handlers return a result
//! value or an error; the caller maps errors to `-32603` responses. Tool
//! failures are reported to the model as `isError` results instead, so the
//! conversation can continue.

use serde_json::{json, Value};
use tracing::warn;

use super::lifecycle::{LifecycleState, WizardState};
use super::ServerInner;
use crate::error::{LifecycleError, Result, ToolError};
use crate::setup::SetupStatus;
use crate::tools::ToolOutput;
use crate::triggers::tools as trigger_tools;

const OPTIONS_FILE: &str = "options.json";
const TRIGGERS_FILE: &str = "triggers.json";

impl ServerInner {
    pub(crate) async fn dispatch(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            // -- Tool methods --
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(&params).await,

            // -- Lifecycle methods --
            "skill/load" => self.handle_load(&params).await,
            "skill/unload" => self.handle_unload().await,
            "skill/activate" => {
                self.lifecycle.ensure(method, LifecycleState::Loaded)?;
                self.lifecycle.set(LifecycleState::Active);
                Ok(json!({"ok": true}))
            }
            "skill/deactivate" => {
                self.lifecycle.ensure(method, LifecycleState::Active)?;
                self.lifecycle.set(LifecycleState::Loaded);
                Ok(json!({"ok": true}))
            }
            "skill/sessionStart" => {
                self.lifecycle.ensure(method, LifecycleState::Active)?;
                let session_id = str_param(&params, "sessionId");
                self.hooks
                    .on_session_start(&self.context(), &session_id)
                    .await?;
                Ok(json!({"ok": true}))
            }
            "skill/sessionEnd" => {
                self.lifecycle.ensure(method, LifecycleState::Active)?;
                let session_id = str_param(&params, "sessionId");
                self.hooks
                    .on_session_end(&self.context(), &session_id)
                    .await?;
                Ok(json!({"ok": true}))
            }
            "skill/beforeMessage" => {
                self.lifecycle.ensure(method, LifecycleState::Active)?;
                let message = str_param(&params, "message");
                let transformed = self
                    .hooks
                    .on_before_message(&self.context(), &message)
                    .await?;
                Ok(json!({"message": transformed}))
            }
            "skill/afterResponse" => {
                self.lifecycle.ensure(method, LifecycleState::Active)?;
                let response = str_param(&params, "response");
                let transformed = self
                    .hooks
                    .on_after_response(&self.context(), &response)
                    .await?;
                Ok(json!({"response": transformed}))
            }
            "skill/tick" => {
                self.lifecycle.ensure(method, LifecycleState::Active)?;
                self.hooks.on_tick(&self.context()).await?;
                Ok(json!({"ok": true}))
            }
            "skill/status" => {
                self.lifecycle.ensure(method, LifecycleState::Active)?;
                let status = self.hooks.on_status(&self.context()).await?;
                Ok(json!({"status": status}))
            }
            "skill/disconnect" => {
                self.lifecycle.ensure(method, LifecycleState::Active)?;
                if !self.skill.has_disconnect {
                    return Err(LifecycleError::DisconnectNotSupported.into());
                }
                self.hooks.on_disconnect(&self.context()).await?;
                Ok(json!({"ok": true}))
            }
            "skill/shutdown" => {
                // The reply is written by our caller; the serve loop waits a
                // grace period before exiting so it reaches the host first.
                self.shutdown.notify_one();
                Ok(json!({"ok": true}))
            }

            // -- Setup methods --
            "setup/start" => self.handle_setup_start().await,
            "setup/submit" => self.handle_setup_submit(&params).await,
            "setup/cancel" => self.handle_setup_cancel().await,

            // -- Options methods --
            "options/list" => Ok(self.options.list_payload()),
            "options/get" => Ok(json!({"options": self.options.snapshot()})),
            "options/set" => self.handle_options_set(&params).await,
            "options/reset" => self.handle_options_reset().await,

            // -- Trigger methods --
            "triggers/types" => Ok(trigger_tools::types_payload(self.triggers.schema())),
            "triggers/list" => Ok(json!({"triggers": self.triggers.list()})),
            "triggers/get" => {
                let id = str_param(&params, "id");
                let trigger = self
                    .triggers
                    .get(&id)
                    .ok_or(crate::error::TriggerError::Unknown(id))?;
                Ok(json!({"trigger": trigger}))
            }
            "triggers/create" => self.trigger_create(&params).await,
            "triggers/update" => self.trigger_update(&params).await,
            "triggers/delete" => self.trigger_delete(&params).await,

            _ => Err(LifecycleError::UnknownMethod(method.to_string()).into()),
        }
    }

    // ------------------------------------------------------------------
    // Tools
    // ------------------------------------------------------------------

    fn handle_tools_list(&self) -> Result<Value> {
        let mut tools: Vec<Value> = self
            .tools
            .definitions()
            .into_iter()
            .filter(|def| self.is_visible(&def.name))
            .map(|def| serde_json::to_value(def).expect("tool definition serializes"))
            .collect();

        if let Some(schema) = self.triggers.schema() {
            for def in trigger_tools::definitions(schema) {
                tools.push(serde_json::to_value(def).expect("tool definition serializes"));
            }
        }

        Ok(json!({"tools": tools}))
    }

    async fn handle_tools_call(&self, params: &Value) -> Result<Value> {
        let name = str_param(params, "name");
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        if self.triggers.has_schema() && trigger_tools::is_trigger_tool(&name) {
            let output = self.execute_trigger_tool(&name, &arguments).await;
            return Ok(output.to_rpc_result());
        }

        if !self.is_visible(&name) {
            return Err(ToolError::NotFound(name).into());
        }
        let handler = self
            .tools
            .get(&name)
            .ok_or_else(|| ToolError::NotFound(name.clone()))?;

        let output = match handler.execute(arguments, &self.context()).await {
            Ok(output) => output,
            // Structured failure: the model sees the message and moves on.
            Err(err) => ToolOutput::from(err),
        };
        Ok(output.to_rpc_result())
    }

    async fn execute_trigger_tool(&self, name: &str, arguments: &Value) -> ToolOutput {
        let outcome: Result<Value> = match name {
            trigger_tools::LIST_TRIGGER_TYPES => {
                Ok(trigger_tools::types_payload(self.triggers.schema()))
            }
            trigger_tools::LIST_TRIGGERS => Ok(json!({"triggers": self.triggers.list()})),
            trigger_tools::GET_TRIGGER => {
                let id = str_param(arguments, "id");
                self.triggers
                    .get(&id)
                    .map(|trigger| json!({"trigger": trigger}))
                    .ok_or_else(|| crate::error::TriggerError::Unknown(id).into())
            }
            trigger_tools::CREATE_TRIGGER => self.trigger_create(arguments).await,
            trigger_tools::UPDATE_TRIGGER => self.trigger_update(arguments).await,
            trigger_tools::DELETE_TRIGGER => self.trigger_delete(arguments).await,
            _ => Err(ToolError::NotFound(name.to_string()).into()),
        };

        match outcome {
            Ok(value) => ToolOutput::success(
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
            ),
            Err(err) => ToolOutput::error(err.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    async fn handle_load(&self, params: &Value) -> Result<Value> {
        self.lifecycle.ensure("skill/load", LifecycleState::Unloaded)?;

        {
            let mut meta = self.meta.lock().expect("runtime meta poisoned");
            if let Some(manifest) = params.get("manifest") {
                meta.manifest = Some(manifest.clone());
            }
            if let Some(data_dir) = params.get("dataDir").and_then(Value::as_str) {
                meta.data_dir = data_dir.to_string();
            }
        }

        self.load_options().await;
        self.load_triggers().await;
        self.hooks.on_load(&self.context()).await?;
        self.lifecycle.set(LifecycleState::Loaded);
        Ok(json!({"ok": true}))
    }

    async fn handle_unload(&self) -> Result<Value> {
        let hook_outcome = self.hooks.on_unload(&self.context()).await;
        // Triggers are cleared from memory without another persistence pass;
        // triggers.json keeps the last persisted shape for the next load.
        self.triggers.clear();
        self.lifecycle.set(LifecycleState::Unloaded);
        hook_outcome?;
        Ok(json!({"ok": true}))
    }

    // ------------------------------------------------------------------
    // Setup wizard
    // ------------------------------------------------------------------

    async fn handle_setup_start(&self) -> Result<Value> {
        if !self.skill.has_setup {
            return Err(LifecycleError::SetupNotSupported.into());
        }
        let step = self.hooks.on_setup_start(&self.context()).await?;
        // Any wizard already in progress is discarded; state follows the
        // most recent start.
        *self.wizard.lock().expect("wizard state poisoned") = Some(WizardState {
            step_id: step.id.clone(),
        });
        Ok(json!({"step": step}))
    }

    async fn handle_setup_submit(&self, params: &Value) -> Result<Value> {
        if !self.skill.has_setup {
            return Err(LifecycleError::SetupNotSupported.into());
        }
        if self.wizard.lock().expect("wizard state poisoned").is_none() {
            return Err(LifecycleError::SetupNotActive.into());
        }

        let step_id = str_param(params, "stepId");
        let values = params
            .get("values")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let result = self
            .hooks
            .on_setup_submit(&self.context(), &step_id, &values)
            .await?;

        {
            let mut wizard = self.wizard.lock().expect("wizard state poisoned");
            match result.status {
                SetupStatus::Complete => *wizard = None,
                SetupStatus::Next => {
                    if let Some(next) = &result.next_step {
                        *wizard = Some(WizardState {
                            step_id: next.id.clone(),
                        });
                    }
                }
                SetupStatus::Error => {}
            }
        }

        Ok(serde_json::to_value(result)?)
    }

    async fn handle_setup_cancel(&self) -> Result<Value> {
        if !self.skill.has_setup {
            return Err(LifecycleError::SetupNotSupported.into());
        }
        if self
            .wizard
            .lock()
            .expect("wizard state poisoned")
            .take()
            .is_none()
        {
            return Err(LifecycleError::SetupNotActive.into());
        }
        self.hooks.on_setup_cancel(&self.context()).await?;
        Ok(json!({"ok": true}))
    }

    // ------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------

    async fn handle_options_set(&self, params: &Value) -> Result<Value> {
        let name = str_param(params, "name");
        let value = params.get("value").cloned().unwrap_or(Value::Null);

        self.options.set(&name, value)?;
        self.apply_tool_filter();
        self.hooks
            .on_options_change(&self.context(), &self.options.snapshot())
            .await?;
        self.persist_options().await;
        Ok(json!({"ok": true}))
    }

    async fn handle_options_reset(&self) -> Result<Value> {
        self.options.reset();
        self.apply_tool_filter();
        self.hooks
            .on_options_change(&self.context(), &self.options.snapshot())
            .await?;
        self.persist_options().await;
        Ok(json!({"ok": true}))
    }

    async fn persist_options(&self) {
        let payload = self.options.to_persisted().to_string();
        if let Err(err) = self.context().write_data(OPTIONS_FILE, &payload).await {
            warn!(%err, "Failed to persist options");
        }
    }

    async fn load_options(&self) {
        if self.options.is_empty() {
            return;
        }
        let raw = match self.context().read_data(OPTIONS_FILE).await {
            Ok(raw) if !raw.is_empty() => raw,
            _ => {
                self.apply_tool_filter();
                return;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(persisted) => self.options.merge_persisted(&persisted),
            Err(err) => warn!(%err, "Ignoring unparseable options.json"),
        }
        self.apply_tool_filter();
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    pub(crate) async fn trigger_create(&self, params: &Value) -> Result<Value> {
        let trigger = self.triggers.create(params)?;
        self.persist_triggers().await;
        if let Err(err) = self
            .hooks
            .on_trigger_register(&self.context(), &trigger)
            .await
        {
            warn!(%err, id = %trigger.id, "on_trigger_register hook failed");
        }
        Ok(json!({"trigger": trigger}))
    }

    pub(crate) async fn trigger_update(&self, params: &Value) -> Result<Value> {
        let trigger = self.triggers.update(params)?;
        self.persist_triggers().await;
        Ok(json!({"trigger": trigger}))
    }

    pub(crate) async fn trigger_delete(&self, params: &Value) -> Result<Value> {
        let id = str_param(params, "id");
        self.triggers.delete(&id)?;
        self.persist_triggers().await;
        if let Err(err) = self.hooks.on_trigger_remove(&self.context(), &id).await {
            warn!(%err, id, "on_trigger_remove hook failed");
        }
        Ok(json!({"ok": true}))
    }

    async fn persist_triggers(&self) {
        let payload = self.triggers.to_persisted().to_string();
        if let Err(err) = self.context().write_data(TRIGGERS_FILE, &payload).await {
            warn!(%err, "Failed to persist triggers");
        }
    }

    async fn load_triggers(&self) {
        if !self.triggers.has_schema() {
            return;
        }
        let raw = match self.context().read_data(TRIGGERS_FILE).await {
            Ok(raw) if !raw.is_empty() => raw,
            _ => return,
        };
        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("triggers.json is not an array, ignoring");
                return;
            }
            Err(err) => {
                warn!(%err, "Ignoring unparseable triggers.json");
                return;
            }
        };

        let loaded = self.triggers.rehydrate(&items);
        for trigger in &loaded {
            if let Err(err) = self
                .hooks
                .on_trigger_register(&self.context(), trigger)
                .await
            {
                warn!(%err, id = %trigger.id, "on_trigger_register failed for rehydrated trigger");
            }
        }
    }
}

fn str_param(params: &Value, key: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::SkillServer;
    use crate::types::SkillDefinition;

    fn server(skill: SkillDefinition) -> SkillServer {
        SkillServer::new(skill).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server(SkillDefinition::new("t", "test"));
        let err = server
            .inner
            .dispatch("bogus/method", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown method: bogus/method");
    }

    #[tokio::test]
    async fn test_lifecycle_preconditions() {
        let server = server(SkillDefinition::new("t", "test"));

        // Active-only methods fail while unloaded.
        assert!(server.inner.dispatch("skill/tick", Value::Null).await.is_err());
        assert!(server
            .inner
            .dispatch("skill/activate", Value::Null)
            .await
            .is_err());

        server.inner.dispatch("skill/load", json!({})).await.unwrap();
        server
            .inner
            .dispatch("skill/activate", Value::Null)
            .await
            .unwrap();
        assert_eq!(server.inner.lifecycle.current(), LifecycleState::Active);

        // Loading twice is a precondition violation.
        assert!(server.inner.dispatch("skill/load", json!({})).await.is_err());

        server
            .inner
            .dispatch("skill/deactivate", Value::Null)
            .await
            .unwrap();
        assert_eq!(server.inner.lifecycle.current(), LifecycleState::Loaded);
    }

    #[tokio::test]
    async fn test_unload_from_any_state() {
        let server = server(SkillDefinition::new("t", "test"));
        let result = server
            .inner
            .dispatch("skill/unload", Value::Null)
            .await
            .unwrap();
        assert_eq!(result, json!({"ok": true}));
        assert_eq!(server.inner.lifecycle.current(), LifecycleState::Unloaded);
    }

    #[tokio::test]
    async fn test_before_message_default_leaves_unchanged() {
        let server = server(SkillDefinition::new("t", "test"));
        server.inner.dispatch("skill/load", json!({})).await.unwrap();
        server
            .inner
            .dispatch("skill/activate", Value::Null)
            .await
            .unwrap();

        let result = server
            .inner
            .dispatch("skill/beforeMessage", json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(result, json!({"message": null}));
    }

    #[tokio::test]
    async fn test_status_requires_hook() {
        let server = server(SkillDefinition::new("t", "test"));
        server.inner.dispatch("skill/load", json!({})).await.unwrap();
        server
            .inner
            .dispatch("skill/activate", Value::Null)
            .await
            .unwrap();

        let err = server
            .inner
            .dispatch("skill/status", Value::Null)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("on_status"));
    }

    #[tokio::test]
    async fn test_disconnect_requires_declaration() {
        let server = server(SkillDefinition::new("t", "test"));
        server.inner.dispatch("skill/load", json!({})).await.unwrap();
        server
            .inner
            .dispatch("skill/activate", Value::Null)
            .await
            .unwrap();

        let err = server
            .inner
            .dispatch("skill/disconnect", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Skill does not support disconnect");
    }

    #[tokio::test]
    async fn test_setup_requires_declaration_and_session() {
        let no_setup = server(SkillDefinition::new("t", "test"));
        assert!(no_setup
            .inner
            .dispatch("setup/start", Value::Null)
            .await
            .is_err());

        let with_setup = server(SkillDefinition::new("t", "test").with_setup());
        // Declared but no wizard started yet.
        let err = with_setup
            .inner
            .dispatch("setup/submit", json!({"stepId": "a", "values": {}}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No setup session in progress");
        assert!(with_setup
            .inner
            .dispatch("setup/cancel", Value::Null)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_options_get_and_set() {
        let skill = SkillDefinition::new("t", "test").with_option(
            crate::types::OptionDefinition::boolean("verbose", "Verbose", false),
        );
        let server = server(skill);

        let before = server
            .inner
            .dispatch("options/get", Value::Null)
            .await
            .unwrap();
        assert_eq!(before["options"]["verbose"], json!(false));

        server
            .inner
            .dispatch("options/set", json!({"name": "verbose", "value": true}))
            .await
            .unwrap();
        let after = server
            .inner
            .dispatch("options/get", Value::Null)
            .await
            .unwrap();
        assert_eq!(after["options"]["verbose"], json!(true));

        // Type mismatch surfaces as an error.
        assert!(server
            .inner
            .dispatch("options/set", json!({"name": "verbose", "value": "yes"}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_tools_list_without_schema_has_no_trigger_tools() {
        let server = server(SkillDefinition::new("t", "test"));
        let result = server
            .inner
            .dispatch("tools/list", Value::Null)
            .await
            .unwrap();
        assert_eq!(result["tools"], json!([]));
    }

    #[tokio::test]
    async fn test_tools_call_unknown() {
        let server = server(SkillDefinition::new("t", "test"));
        let err = server
            .inner
            .dispatch("tools/call", json!({"name": "nope", "arguments": {}}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: nope");
    }
}
