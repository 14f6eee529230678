// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Reverse-RPC client: requests the runtime makes to the host.
//!
//! Outbound requests carry a process-local monotonically increasing id and a
//! pending entry that the read loop resolves when the matching reply
//! arrives. Replies are correlated strictly by id; a reply after timeout is
//! discarded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::codec::{request_frame, Frame, FrameWriter};
use crate::error::RpcError;

/// Default timeout for reverse-RPC calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extended timeout for summarization requests.
pub const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(120);

/// Client side of the reverse-RPC channel.
pub struct OutboundClient {
    writer: FrameWriter,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<Value, RpcError>>>>,
}

impl OutboundClient {
    pub fn new(writer: FrameWriter) -> Self {
        Self {
            writer,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a call with the default 30s timeout.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        self.call_with_timeout(method, params, DEFAULT_TIMEOUT).await
    }

    /// Issue a call with an explicit timeout.
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.insert(id, tx);
        }

        let frame = request_frame(id, method, params);
        if let Err(err) = self.writer.write_frame(&frame).await {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::ChannelClosed),
            Err(_) => {
                let mut pending = self.pending.lock().expect("pending map poisoned");
                pending.remove(&id);
                Err(RpcError::Timeout {
                    method: method.to_string(),
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }

    /// Resolve a pending call from a reply frame.
    ///
    /// Called inline from the read loop; must never await handler work.
    pub fn handle_reply(&self, frame: Frame) {
        let Frame::Reply { id, result } = frame else {
            return;
        };

        let Some(id) = id.as_u64() else {
            warn!(?id, "Reply with non-numeric id dropped");
            return;
        };

        let sender = {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.remove(&id)
        };

        match sender {
            Some(tx) => {
                let outcome = result.map_err(|err| RpcError::remote(err.code, err.message));
                let _ = tx.send(outcome);
            }
            None => {
                // Late reply after timeout, or an id we never issued.
                debug!(id, "Discarding reply with no pending call");
            }
        }
    }

    /// Number of in-flight calls (used by tests).
    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("pending map poisoned").len()
    }
}
