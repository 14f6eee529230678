// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process mock host for integration tests.
//!
//! Drives a [`SkillServer`] over a duplex pipe the way the real host drives
//! it over stdin/stdout: sends requests, services the runtime's reverse-RPC
//! calls (data files, state, fired triggers), and records everything for
//! assertions.

// Each test binary compiles its own copy; not every helper is used in every binary.
#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

use skillrt::{Result, SkillDefinition, SkillServer};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestHost {
    reader: BufReader<ReadHalf<tokio::io::DuplexStream>>,
    writer: WriteHalf<tokio::io::DuplexStream>,
    next_id: u64,
    /// Skill data files served over data/read and data/write.
    pub files: HashMap<String, String>,
    /// Host-side skill state, merged by state/set.
    pub state: Value,
    /// Recorded triggers/fired payloads.
    pub fired: Vec<Value>,
    /// Recorded intelligence/emitEvent payloads.
    pub events: Vec<Value>,
    server: JoinHandle<Result<()>>,
}

impl TestHost {
    /// Spawn a server for the given skill and connect to it.
    pub fn start(skill: SkillDefinition) -> Self {
        let (host_io, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let server = SkillServer::new(skill).expect("skill definition invalid");
        let server = tokio::spawn(server.serve(server_read, server_write));

        let (host_read, host_write) = tokio::io::split(host_io);
        Self {
            reader: BufReader::new(host_read),
            writer: host_write,
            next_id: 1,
            files: HashMap::new(),
            state: json!({}),
            fired: Vec::new(),
            events: Vec::new(),
            server,
        }
    }

    /// Send a raw frame.
    pub async fn send(&mut self, frame: &Value) {
        let mut line = frame.to_string();
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("host write failed");
        self.writer.flush().await.expect("host flush failed");
    }

    /// Send a raw line (may be malformed on purpose).
    pub async fn send_raw(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("host write failed");
        self.writer.flush().await.expect("host flush failed");
    }

    /// Receive the next frame from the server.
    pub async fn recv(&mut self) -> Value {
        let mut line = String::new();
        let read = tokio::time::timeout(RECV_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for server frame")
            .expect("host read failed");
        assert!(read > 0, "server closed the stream");
        serde_json::from_str(&line).expect("server emitted invalid JSON")
    }

    /// Try to receive a frame, returning `None` on a short timeout.
    ///
    /// Used to assert that the server stays silent (e.g. after a malformed
    /// frame or a suppressed trigger).
    pub async fn recv_timeout(&mut self, wait: Duration) -> Option<Value> {
        let mut line = String::new();
        match tokio::time::timeout(wait, self.reader.read_line(&mut line)).await {
            Ok(Ok(read)) if read > 0 => {
                Some(serde_json::from_str(&line).expect("server emitted invalid JSON"))
            }
            _ => None,
        }
    }

    /// Issue a request and drive reverse RPC until its response arrives.
    pub async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;

        let mut frame = json!({"jsonrpc": "2.0", "id": id, "method": method});
        if !params.is_null() {
            frame["params"] = params;
        }
        self.send(&frame).await;

        loop {
            let incoming = self.recv().await;
            if incoming.get("method").is_some() {
                self.service_reverse(&incoming).await;
                continue;
            }
            if incoming["id"] == json!(id) {
                return incoming;
            }
            panic!("unexpected frame while awaiting response: {incoming}");
        }
    }

    /// Issue a request and unwrap its result, panicking on an error reply.
    pub async fn request_ok(&mut self, method: &str, params: Value) -> Value {
        let response = self.request(method, params).await;
        if let Some(error) = response.get("error") {
            panic!("{method} failed: {error}");
        }
        response["result"].clone()
    }

    /// Issue a request and unwrap its error message.
    pub async fn request_err(&mut self, method: &str, params: Value) -> String {
        let response = self.request(method, params).await;
        let error = response
            .get("error")
            .unwrap_or_else(|| panic!("{method} unexpectedly succeeded: {response}"));
        assert_eq!(error["code"], json!(-32603));
        error["message"].as_str().unwrap_or_default().to_string()
    }

    /// Service one reverse-RPC request from the runtime.
    pub async fn service_reverse(&mut self, frame: &Value) {
        let id = frame.get("id").cloned();
        let method = frame["method"].as_str().unwrap_or_default().to_string();
        let params = frame.get("params").cloned().unwrap_or(Value::Null);

        let outcome: std::result::Result<Value, String> = match method.as_str() {
            "data/read" => {
                let filename = params["filename"].as_str().unwrap_or_default();
                match self.files.get(filename) {
                    Some(content) => Ok(json!({"content": content})),
                    None => Err(format!("No such file: {filename}")),
                }
            }
            "data/write" => {
                let filename = params["filename"].as_str().unwrap_or_default().to_string();
                let content = params["content"].as_str().unwrap_or_default().to_string();
                self.files.insert(filename, content);
                Ok(json!({"ok": true}))
            }
            "state/get" => Ok(json!({"state": self.state})),
            "state/set" => {
                if let (Some(state), Some(partial)) =
                    (self.state.as_object_mut(), params["partial"].as_object())
                {
                    for (key, value) in partial {
                        state.insert(key.clone(), value.clone());
                    }
                }
                Ok(json!({"ok": true}))
            }
            "intelligence/emitEvent" => {
                self.events.push(params);
                Ok(json!({"ok": true}))
            }
            "intelligence/summarize" => Ok(json!({"summaries": [], "suggestions": []})),
            "triggers/fired" => {
                self.fired.push(params);
                Ok(json!({"ok": true}))
            }
            "entities/upsert" | "entities/upsertRelationship" => Ok(json!({"ok": true})),
            "entities/search" | "entities/getRelationships" => Ok(json!({"results": []})),
            other => Err(format!("Mock host does not implement {other}")),
        };

        let Some(id) = id else { return };
        let reply = match outcome {
            Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Err(message) => json!({
                "jsonrpc": "2.0", "id": id,
                "error": {"code": -32000, "message": message},
            }),
        };
        self.send(&reply).await;
    }

    /// Drive `skill/load` followed by `skill/activate`.
    pub async fn load_and_activate(&mut self) {
        self.request_ok("skill/load", json!({"dataDir": "skills/test/data"}))
            .await;
        self.request_ok("skill/activate", Value::Null).await;
    }

    /// Send `skill/shutdown` and wait for the serve loop to exit.
    pub async fn shutdown(mut self) {
        let result = self.request_ok("skill/shutdown", Value::Null).await;
        assert_eq!(result, json!({"ok": true}));
        tokio::time::timeout(Duration::from_secs(2), self.server)
            .await
            .expect("server did not exit after shutdown")
            .expect("server task panicked")
            .expect("server returned error");
    }
}
