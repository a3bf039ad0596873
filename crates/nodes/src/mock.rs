//! Test doubles: `MockNode` for the engine and `MockTransport` for nodes.
//!
//! Both record every call they receive so tests can assert on ordering and
//! on what would have gone over the wire.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::transport::{HttpRequest, HttpTransport, TransportError};
use crate::{jsonapi, ExecutableNode, ExecutionContext, Item, NodeError};

/// Behaviour injected into `MockNode` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value.
    ReturnValue(Value),
    /// Fail with a `Validation` error.
    FailValidation(String),
    /// Fail with an `Upstream` error carrying this status and body.
    FailUpstream { status: u16, body: Option<Value> },
}

/// A mock node that records every item it receives and returns a
/// programmer-specified result.
pub struct MockNode {
    /// Label used in test assertions.
    pub name: String,
    /// What the node does for items it is told to fail.
    pub behaviour: MockBehaviour,
    /// Item indices that fail. `None` means every item follows `behaviour`.
    pub failing_items: Option<HashSet<usize>>,
    /// Indices of all items seen by this node (in call order).
    pub calls: Arc<Mutex<Vec<usize>>>,
}

impl MockNode {
    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::ReturnValue(value))
    }

    /// Create a mock that always fails validation.
    pub fn failing_validation(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::FailValidation(msg.into()))
    }

    /// Create a mock that always fails as if the API rejected the request.
    pub fn failing_upstream(name: impl Into<String>, status: u16, body: Option<Value>) -> Self {
        Self::with_behaviour(name, MockBehaviour::FailUpstream { status, body })
    }

    /// Restrict failures to the given item indices; all other items succeed
    /// with `{"node": name, "item": index}`.
    pub fn only_failing_items(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.failing_items = Some(indices.into_iter().collect());
        self
    }

    /// Number of items this node has processed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn selects(&self, index: usize) -> bool {
        self.failing_items
            .as_ref()
            .map_or(true, |set| set.contains(&index))
    }

    fn with_behaviour(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            failing_items: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(&self, item: &Item, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        self.calls.lock().unwrap().push(item.index);

        if !self.selects(item.index) {
            return Ok(json!({ "node": self.name, "item": item.index }));
        }

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => {
                // Merge the node's own output with the item index so tests can
                // trace which item produced which record.
                let mut out = json!({ "node": self.name, "item": item.index });
                if let (Some(out_obj), Some(v_obj)) = (out.as_object_mut(), v.as_object()) {
                    for (k, val) in v_obj {
                        out_obj.insert(k.clone(), val.clone());
                    }
                }
                Ok(out)
            }
            MockBehaviour::FailValidation(msg) => Err(NodeError::validation(msg.clone())),
            MockBehaviour::FailUpstream { status, body } => Err(NodeError::from(
                TransportError::Status {
                    status: *status,
                    body: body.clone(),
                },
            )),
        }
    }

    /// Items that would fail validation are rejected offline too.
    fn validate_item(&self, item: &Item, _ctx: &ExecutionContext) -> Result<(), NodeError> {
        match &self.behaviour {
            MockBehaviour::FailValidation(msg) if self.selects(item.index) => {
                Err(NodeError::validation(msg.clone()))
            }
            _ => Ok(()),
        }
    }

    fn error_details(&self, error: &NodeError) -> Option<String> {
        jsonapi::extract_error_details(error)
    }
}

/// A transport that replays queued responses in order and records requests.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    /// All requests seen by this transport (in call order).
    pub requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a bare decoded body.
    pub fn respond(self, body: Value) -> Self {
        self.responses.lock().unwrap().push_back(Ok(body));
        self
    }

    /// Queue a full `{statusCode, headers, body}` envelope.
    pub fn respond_full(self, status: u16, body: Option<Value>) -> Self {
        let envelope = json!({ "statusCode": status, "headers": {}, "body": body });
        self.respond(envelope)
    }

    /// Queue a non-2xx failure.
    pub fn respond_status(self, status: u16, body: Option<Value>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Status { status, body }));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Snapshot of the recorded requests.
    pub fn recorded(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Status {
                    status: 501,
                    body: Some(json!({ "errors": [{ "title": "no mock response queued" }] })),
                })
            })
    }
}
