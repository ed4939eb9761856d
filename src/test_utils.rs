//! Test utilities for shardmerge testing
//!
//! Mock nodes and scripted sub-operations for the diagnostic and dispatch tests, plus small builders for
//! element lists so merge tests read as `(b-key, cache key)` tables.

use crate::aggregator::SmgetResult;
use crate::dispatch::SmgetSubOperation;
use crate::operation::{CacheNode, QueueStatus, SubOperation};
use crate::status::{OperationState, OperationStatus};
use crate::structures::{NodeResponse, SmgetElement};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Build a value-less element list from `(b-key, cache key)` pairs
pub fn elements(pairs: &[(u64, &str)]) -> Vec<SmgetElement<()>> {
    pairs
        .iter()
        .map(|(bkey, key)| SmgetElement::new(*key, *bkey, ()))
        .collect()
}

/// Flatten a result back into `(b-key, cache key)` pairs for assertions
pub fn keys_and_bkeys<T>(result: &SmgetResult<T>) -> Vec<(u64, &str)> {
    result
        .elements()
        .iter()
        .map(|element| {
            let bkey = element.bkey().as_long().unwrap_or_else(|| panic!("expected long b-key"));
            (bkey, element.key())
        })
        .collect()
}

/// Cache node with fixed connection flags
pub struct MockNode {
    name: String,
    active: bool,
    first_connecting: bool,
    queue_status: QueueStatus,
}

impl MockNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            active: true,
            first_connecting: false,
            queue_status: QueueStatus::default(),
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn first_connecting(mut self, first_connecting: bool) -> Self {
        self.first_connecting = first_connecting;
        self
    }

    pub fn queue_status(mut self, queue_status: QueueStatus) -> Self {
        self.queue_status = queue_status;
        self
    }
}

impl CacheNode for MockNode {
    fn node_name(&self) -> String {
        self.name.clone()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_first_connecting(&self) -> bool {
        self.first_connecting
    }

    fn op_queue_status(&self) -> QueueStatus {
        self.queue_status
    }
}

/// Sub-operation whose state can be moved by the test
pub struct MockOperation {
    api_type: String,
    state: Mutex<OperationState>,
    pipe: bool,
    bulk: bool,
    node: Option<Arc<dyn CacheNode>>,
}

impl MockOperation {
    pub fn new(api_type: &str, state: OperationState) -> Self {
        Self {
            api_type: api_type.to_string(),
            state: Mutex::new(state),
            pipe: false,
            bulk: false,
            node: None,
        }
    }

    pub fn node(mut self, node: Arc<dyn CacheNode>) -> Self {
        self.node = Some(node);
        self
    }

    pub fn pipe(mut self, pipe: bool) -> Self {
        self.pipe = pipe;
        self
    }

    pub fn bulk(mut self, bulk: bool) -> Self {
        self.bulk = bulk;
        self
    }

    pub fn set_state(&self, state: OperationState) {
        *self.state.lock() = state;
    }
}

impl SubOperation for MockOperation {
    fn api_type(&self) -> &str {
        &self.api_type
    }

    fn is_pipe_operation(&self) -> bool {
        self.pipe
    }

    fn is_bulk_operation(&self) -> bool {
        self.bulk
    }

    fn state(&self) -> OperationState {
        *self.state.lock()
    }

    fn handling_node(&self) -> Option<Arc<dyn CacheNode>> {
        self.node.clone()
    }
}

/// Smget sub-operation that answers with a canned outcome after an optional delay
pub struct ScriptedOperation<T> {
    inner: MockOperation,
    outcome: Result<NodeResponse<T>, OperationStatus>,
    delay: Duration,
}

impl<T> ScriptedOperation<T> {
    pub fn succeeding(node_name: &str, elements: Vec<SmgetElement<T>>) -> Self {
        Self::responding(node_name, NodeResponse::new(elements))
    }

    pub fn responding(node_name: &str, response: NodeResponse<T>) -> Self {
        Self {
            inner: MockOperation::new("smget", OperationState::WriteQueued).node(Arc::new(MockNode::new(node_name))),
            outcome: Ok(response),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(node_name: &str, status: OperationStatus) -> Self {
        Self {
            inner: MockOperation::new("smget", OperationState::WriteQueued).node(Arc::new(MockNode::new(node_name))),
            outcome: Err(status),
            delay: Duration::ZERO,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl<T: Send + Sync> SubOperation for ScriptedOperation<T> {
    fn api_type(&self) -> &str {
        self.inner.api_type()
    }

    fn state(&self) -> OperationState {
        self.inner.state()
    }

    fn handling_node(&self) -> Option<Arc<dyn CacheNode>> {
        self.inner.handling_node()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> SmgetSubOperation<T> for ScriptedOperation<T> {
    async fn execute(&self) -> Result<NodeResponse<T>, OperationStatus> {
        self.inner.set_state(OperationState::Reading);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.set_state(OperationState::Complete);
        self.outcome.clone()
    }
}
