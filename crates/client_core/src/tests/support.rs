use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use shared::protocol::{Command, RemoteResponse};
use tokio::sync::{oneshot, Mutex};

use crate::remote::{RemoteApi, TransportError};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub command: Command,
    pub parameters: Map<String, Value>,
}

/// Answers calls from a fixed script; once it runs out every call succeeds.
#[derive(Default)]
pub struct ScriptedRemote {
    replies: Mutex<VecDeque<Result<RemoteResponse, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRemote {
    pub fn new(
        replies: impl IntoIterator<Item = Result<RemoteResponse, TransportError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new([])
    }

    pub fn rejecting(json_code: i64, message: &str) -> Arc<Self> {
        Self::new([Ok(RemoteResponse::rejected(json_code, message))])
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn call(
        &self,
        command: Command,
        parameters: &Map<String, Value>,
    ) -> Result<RemoteResponse, TransportError> {
        self.calls.lock().await.push(RecordedCall {
            command,
            parameters: parameters.clone(),
        });
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(RemoteResponse::ok()))
    }
}

/// Holds each call until the test releases it, so completion order is under
/// the test's control. Calls are matched on the string value of one
/// parameter; ungated calls succeed at once.
pub struct GatedRemote {
    gate_param: &'static str,
    gates: Mutex<HashMap<String, oneshot::Receiver<RemoteResponse>>>,
}

impl GatedRemote {
    pub fn new(gate_param: &'static str) -> Arc<Self> {
        Arc::new(Self {
            gate_param,
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub async fn gate(&self, value: &str) -> oneshot::Sender<RemoteResponse> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().await.insert(value.to_string(), rx);
        tx
    }
}

#[async_trait]
impl RemoteApi for GatedRemote {
    async fn call(
        &self,
        _command: Command,
        parameters: &Map<String, Value>,
    ) -> Result<RemoteResponse, TransportError> {
        let key = parameters
            .get(self.gate_param)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let gate = self.gates.lock().await.remove(&key);
        match gate {
            Some(gate) => gate.await.map_err(|_| TransportError::Unavailable),
            None => Ok(RemoteResponse::ok()),
        }
    }
}
