//! Common test utilities for connection tests
//!
//! Provides a scripted in-memory transport:
//! - Replies are replayed in order, one per `read_frame`
//! - Replies without an `id` get the id of the last written request
//! - Every written request is recorded for inspection

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use surreal_sql::{Connection, DriverError, DriverResult, Transport};

pub enum Reply {
    /// A JSON frame, echoed with the request id unless it carries its own.
    Frame(Value),
    /// Bytes sent as-is.
    Raw(Vec<u8>),
    /// Never answers.
    Hang,
    /// Transport failure.
    Fail(String),
}

pub fn ok(result: Value) -> Reply {
    Reply::Frame(json!({ "result": result }))
}

pub fn api_error(code: i64, message: &str) -> Reply {
    Reply::Frame(json!({ "error": { "code": code, "message": message } }))
}

pub fn statements(results: Value) -> Reply {
    ok(results)
}

pub fn notification() -> Reply {
    Reply::Frame(json!({
        "id": null,
        "result": { "action": "CREATE", "id": "0189d6e3-8eac-703a-9a48-d9faa78b44b9", "result": {} }
    }))
}

#[derive(Clone, Default)]
pub struct Sent(Arc<Mutex<Vec<Value>>>);

impl Sent {
    pub fn requests(&self) -> Vec<Value> {
        self.0.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn last(&self) -> Value {
        self.requests().last().cloned().unwrap_or(Value::Null)
    }
}

pub struct ScriptedTransport {
    replies: VecDeque<Reply>,
    sent: Sent,
    last_id: Option<String>,
    closed: Arc<Mutex<bool>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> (Self, Sent) {
        let sent = Sent::default();
        let transport = Self {
            replies: replies.into(),
            sent: sent.clone(),
            last_id: None,
            closed: Arc::new(Mutex::new(false)),
        };
        (transport, sent)
    }

    pub fn closed_flag(&self) -> Arc<Mutex<bool>> {
        self.closed.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn write_frame(&mut self, frame: Vec<u8>) -> DriverResult<()> {
        let request: Value = serde_json::from_slice(&frame).unwrap();
        self.last_id = request["id"].as_str().map(str::to_string);
        self.sent.0.lock().unwrap().push(request);
        Ok(())
    }

    async fn read_frame(&mut self) -> DriverResult<Vec<u8>> {
        match self.replies.pop_front() {
            Some(Reply::Frame(mut value)) => {
                if let Value::Object(map) = &mut value {
                    if !map.contains_key("id") {
                        map.insert("id".to_string(), json!(self.last_id));
                    }
                }
                Ok(serde_json::to_vec(&value).unwrap())
            }
            Some(Reply::Raw(bytes)) => Ok(bytes),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail(message)) => Err(DriverError::Connection(message)),
            None => Err(DriverError::Connection("script exhausted".to_string())),
        }
    }

    async fn close(&mut self) -> DriverResult<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

pub fn connection(replies: Vec<Reply>) -> (Connection<ScriptedTransport>, Sent) {
    let (transport, sent) = ScriptedTransport::new(replies);
    (Connection::new(transport), sent)
}
