// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The skill server: read loop, dispatch, and lifecycle orchestration.
//!
//! One server hosts one skill for the lifetime of the process. A single
//! read loop owns standard input; host requests are dispatched on their own
//! tasks so a slow handler never blocks reverse-RPC reply correlation,
//! which runs inline in the loop.

mod dispatch;
mod lifecycle;

pub use lifecycle::{Lifecycle, LifecycleState, WizardState};

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::context::{RuntimeMeta, SkillContext};
use crate::error::Result;
use crate::options::OptionsStore;
use crate::rpc::{classify, error_frame, response_frame, Frame, FrameWriter, OutboundClient, INTERNAL_ERROR};
use crate::tools::ToolSet;
use crate::triggers::TriggerRegistry;
use crate::types::{SkillDefinition, SkillHooks};

/// Grace period between the `skill/shutdown` reply and loop exit.
const SHUTDOWN_DELAY: Duration = Duration::from_millis(100);

/// JSON-RPC server bridging one skill to its host.
///
/// # Example
///
/// ```rust,ignore
/// let skill = SkillDefinition::new("notes", "Keeps notes")
///     .with_tool(AddNoteTool)
///     .with_hooks(Arc::new(NotesHooks));
///
/// SkillServer::new(skill)?.start().await
/// ```
pub struct SkillServer {
    inner: Arc<ServerInner>,
}

pub(crate) struct ServerInner {
    pub(crate) skill: SkillDefinition,
    pub(crate) tools: ToolSet,
    pub(crate) hooks: Arc<dyn SkillHooks>,
    pub(crate) outbound: Arc<OutboundClient>,
    pub(crate) writer: FrameWriter,
    pub(crate) options: Arc<OptionsStore>,
    pub(crate) triggers: Arc<TriggerRegistry>,
    pub(crate) visible_tools: Mutex<HashSet<String>>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) wizard: Mutex<Option<WizardState>>,
    pub(crate) meta: Arc<Mutex<RuntimeMeta>>,
    pub(crate) shutdown: Notify,
}

impl SkillServer {
    /// Build a server from a skill definition.
    ///
    /// Fails on definition errors (duplicate names, bad tick interval);
    /// non-fatal validation findings are logged as warnings.
    pub fn new(skill: SkillDefinition) -> Result<Self> {
        for warning in skill.validate()? {
            warn!("{warning}");
        }

        let writer = FrameWriter::new();
        let outbound = Arc::new(OutboundClient::new(writer.clone()));
        let tools = ToolSet::new(&skill.tools);
        let options = Arc::new(OptionsStore::new(skill.options.clone()));
        let triggers = Arc::new(TriggerRegistry::new(skill.trigger_schema.clone()));
        let hooks = Arc::clone(&skill.hooks);

        let inner = ServerInner {
            skill,
            tools,
            hooks,
            outbound,
            writer,
            options,
            triggers,
            visible_tools: Mutex::new(HashSet::new()),
            lifecycle: Lifecycle::new(),
            wizard: Mutex::new(None),
            meta: Arc::new(Mutex::new(RuntimeMeta::default())),
            shutdown: Notify::new(),
        };
        inner.apply_tool_filter();

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// The context object this server hands to hooks and tools.
    pub fn context(&self) -> SkillContext {
        self.inner.context()
    }

    /// Run against stdin/stdout until the stream closes or the host asks
    /// for shutdown.
    pub async fn start(self) -> Result<()> {
        info!(skill = %self.inner.skill.name, version = %self.inner.skill.version, "Skill runtime starting");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Run against an arbitrary stream pair (used by tests and harnesses).
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.inner.writer.attach(Box::new(writer)).await;

        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            tokio::select! {
                read = reader.read_line(&mut line) => {
                    match read {
                        Ok(0) => {
                            info!("Host closed stdin, shutting down");
                            break;
                        }
                        Ok(_) => self.process_line(&line),
                        Err(err) => {
                            error!(%err, "Error reading from host");
                            break;
                        }
                    }
                }
                _ = self.inner.shutdown.notified() => {
                    tokio::time::sleep(SHUTDOWN_DELAY).await;
                    break;
                }
            }
        }

        Ok(())
    }

    fn process_line(&self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        let message: Value = match serde_json::from_str(trimmed) {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, "Failed to parse JSON-RPC message, dropping line");
                return;
            }
        };

        match classify(message) {
            // Replies to our reverse RPC are resolved inline so the read
            // loop keeps consuming stdin while handlers await futures.
            Some(frame @ Frame::Reply { .. }) => self.inner.outbound.handle_reply(frame),
            // Host requests run on their own task so the loop never blocks
            // on handler work.
            Some(frame) => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    inner.handle_message(frame).await;
                });
            }
            None => warn!("Dropping frame that is neither request nor reply"),
        }
    }
}

impl ServerInner {
    pub(crate) fn context(&self) -> SkillContext {
        SkillContext::new(
            self.skill.name.clone(),
            Arc::clone(&self.outbound),
            Arc::clone(&self.options),
            Arc::clone(&self.triggers),
            Arc::clone(&self.meta),
        )
    }

    async fn handle_message(&self, frame: Frame) {
        match frame {
            Frame::Request { id, method, params } => {
                let outcome = self.dispatch(&method, params).await;
                let frame = match outcome {
                    Ok(result) => response_frame(&id, result),
                    Err(err) => {
                        debug!(%method, %err, "Handler returned error");
                        error_frame(&id, INTERNAL_ERROR, &err.to_string())
                    }
                };
                if let Err(err) = self.writer.write_frame(&frame).await {
                    error!(%err, "Failed to write response frame");
                }
            }
            Frame::Notification { method, params } => {
                if let Err(err) = self.dispatch(&method, params).await {
                    warn!(%method, %err, "Notification handler error");
                }
            }
            Frame::Reply { .. } => unreachable!("replies are handled in the read loop"),
        }
    }

    /// Rebuild the visible-tool set from current option values.
    ///
    /// Runs synchronously after every option mutation rather than lazily in
    /// `tools/list`, so the mapping is observable in logs.
    pub(crate) fn apply_tool_filter(&self) {
        let hidden = self.options.hidden_tools();
        let visible: HashSet<String> = self
            .tools
            .names()
            .iter()
            .filter(|name| !hidden.contains(*name))
            .cloned()
            .collect();
        debug!(visible = visible.len(), total = self.tools.len(), "Applied tool filter");
        *self.visible_tools.lock().expect("visible tools poisoned") = visible;
    }

    pub(crate) fn is_visible(&self, name: &str) -> bool {
        self.visible_tools
            .lock()
            .expect("visible tools poisoned")
            .contains(name)
    }
}
