// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Line-delimited JSON-RPC 2.0 framing.
//!
//! Every frame is a complete JSON object terminated by `\n`. The writer is
//! guarded by a mutex so outbound frames from concurrent handlers never
//! interleave; one lock spans one full line.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC internal error, used for all handler failures.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error object carried by a JSON-RPC error response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// An inbound frame, classified by shape.
///
/// A frame with `method` is a request or notification from the host; a frame
/// with `result` or `error` is a reply to one of our reverse-RPC calls.
#[derive(Debug)]
pub enum Frame {
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    Reply {
        id: Value,
        result: Result<Value, RpcErrorObject>,
    },
}

/// Classify a parsed JSON object into a [`Frame`].
///
/// Returns `None` for objects that are neither requests nor replies.
pub fn classify(value: Value) -> Option<Frame> {
    let obj = value.as_object()?;

    if let Some(method) = obj.get("method").and_then(Value::as_str) {
        let method = method.to_string();
        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        return Some(match obj.get("id") {
            Some(id) if !id.is_null() => Frame::Request {
                id: id.clone(),
                method,
                params,
            },
            _ => Frame::Notification { method, params },
        });
    }

    if obj.contains_key("result") || obj.contains_key("error") {
        let id = obj.get("id").cloned().unwrap_or(Value::Null);
        let result = match obj.get("error") {
            Some(err) if !err.is_null() => {
                let parsed = serde_json::from_value::<RpcErrorObject>(err.clone())
                    .unwrap_or_else(|_| RpcErrorObject {
                        code: INTERNAL_ERROR,
                        message: "Malformed error object".to_string(),
                    });
                Err(parsed)
            }
            _ => Ok(obj.get("result").cloned().unwrap_or(Value::Null)),
        };
        return Some(Frame::Reply { id, result });
    }

    None
}

/// Build a request frame for an outbound reverse-RPC call.
pub fn request_frame(id: u64, method: &str, params: Option<Value>) -> Value {
    let mut frame = serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": method,
    });
    if let Some(params) = params {
        frame["params"] = params;
    }
    frame
}

/// Build a success response frame.
pub fn response_frame(id: &Value, result: Value) -> Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

/// Build an error response frame.
pub fn error_frame(id: &Value, code: i64, message: &str) -> Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {"code": code, "message": message},
    })
}

/// Boxed sink for outbound frames (stdout in production, a duplex in tests).
pub type FrameSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Concurrency-safe writer of newline-delimited JSON frames.
///
/// Cloneable; all clones share one sink. The sink is attached when the serve
/// loop starts, so a write before that reports `NotConnected`.
#[derive(Clone, Default)]
pub struct FrameWriter {
    inner: Arc<Mutex<Option<FrameSink>>>,
}

impl FrameWriter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Attach the output sink.
    pub async fn attach(&self, sink: FrameSink) {
        let mut guard = self.inner.lock().await;
        *guard = Some(sink);
    }

    /// Write a single frame as one line.
    pub async fn write_frame(&self, frame: &Value) -> Result<(), RpcError> {
        let mut line = serde_json::to_string(frame)?;
        line.push('\n');

        let mut guard = self.inner.lock().await;
        let sink = guard.as_mut().ok_or(RpcError::NotConnected)?;
        sink.write_all(line.as_bytes()).await?;
        sink.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    #[test]
    fn test_classify_request() {
        let value = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
        match classify(value) {
            Some(Frame::Request { id, method, params }) => {
                assert_eq!(id, serde_json::json!(1));
                assert_eq!(method, "tools/list");
                assert!(params.is_null());
            }
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_notification() {
        let value = serde_json::json!({"jsonrpc": "2.0", "method": "skill/tick"});
        assert!(matches!(
            classify(value),
            Some(Frame::Notification { method, .. }) if method == "skill/tick"
        ));
    }

    #[test]
    fn test_classify_reply_success() {
        let value = serde_json::json!({"jsonrpc": "2.0", "id": 7, "result": {"ok": true}});
        match classify(value) {
            Some(Frame::Reply { id, result }) => {
                assert_eq!(id, serde_json::json!(7));
                assert_eq!(result.unwrap()["ok"], serde_json::json!(true));
            }
            other => panic!("Expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_reply_error() {
        let value = serde_json::json!({
            "jsonrpc": "2.0", "id": 8,
            "error": {"code": -32603, "message": "boom"}
        });
        match classify(value) {
            Some(Frame::Reply { result: Err(err), .. }) => {
                assert_eq!(err.code, -32603);
                assert_eq!(err.message, "boom");
            }
            other => panic!("Expected error reply, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_garbage() {
        assert!(classify(serde_json::json!({"hello": "world"})).is_none());
        assert!(classify(serde_json::json!(42)).is_none());
    }

    #[test]
    fn test_string_ids_supported() {
        let value = serde_json::json!({"jsonrpc": "2.0", "id": "abc", "method": "skill/status"});
        assert!(matches!(
            classify(value),
            Some(Frame::Request { id, .. }) if id == serde_json::json!("abc")
        ));
    }

    #[test]
    fn test_frame_builders() {
        let req = request_frame(3, "data/read", Some(serde_json::json!({"filename": "a"})));
        assert_eq!(req["jsonrpc"], "2.0");
        assert_eq!(req["id"], 3);
        assert_eq!(req["params"]["filename"], "a");

        let resp = response_frame(&serde_json::json!(3), serde_json::json!({"ok": true}));
        assert_eq!(resp["result"]["ok"], serde_json::json!(true));

        let err = error_frame(&serde_json::json!(3), INTERNAL_ERROR, "nope");
        assert_eq!(err["error"]["code"], INTERNAL_ERROR);
        assert_eq!(err["error"]["message"], "nope");
    }

    #[tokio::test]
    async fn test_writer_not_connected() {
        let writer = FrameWriter::new();
        let result = writer.write_frame(&serde_json::json!({})).await;
        assert!(matches!(result, Err(RpcError::NotConnected)));
    }

    #[tokio::test]
    async fn test_writer_emits_single_lines() {
        let (client, server) = tokio::io::duplex(1024);
        let writer = FrameWriter::new();
        writer.attach(Box::new(client)).await;

        writer
            .write_frame(&serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": 1}))
            .await
            .unwrap();
        writer
            .write_frame(&serde_json::json!({"jsonrpc": "2.0", "id": 2, "result": 2}))
            .await
            .unwrap();

        let mut reader = BufReader::new(server);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let first: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(first["id"], 1);

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let second: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(second["id"], 2);
    }
}
