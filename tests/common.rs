//! Common test utilities for integration tests
//!
//! This module provides shared utilities for integration tests that cannot
//! access the main crate's test_utils module.

use async_trait::async_trait;
use parking_lot::Mutex;
use shardmerge::{
    CacheNode, NodeResponse, OperationState, OperationStatus, QueueStatus, SmgetElement, SmgetResult,
    SmgetSubOperation, SubOperation,
};
use std::sync::Arc;
use std::time::Duration;

/// Build an element list from `(b-key, cache key)` pairs, using `key@bkey` as the value
pub fn elements(pairs: &[(u64, &str)]) -> Vec<SmgetElement<String>> {
    pairs
        .iter()
        .map(|(bkey, key)| SmgetElement::new(*key, *bkey, format!("{}@{}", key, bkey)))
        .collect()
}

/// Flatten a result back into `(b-key, cache key)` pairs for assertions
pub fn pairs<T>(result: &SmgetResult<T>) -> Vec<(u64, String)> {
    result
        .elements()
        .iter()
        .map(|element| {
            let bkey = element.bkey().as_long().expect("test b-keys are integers");
            (bkey, element.key().to_string())
        })
        .collect()
}

/// Owned form of a pair list, for comparing against [`pairs`]
#[allow(dead_code)]
pub fn owned(expected: &[(u64, &str)]) -> Vec<(u64, String)> {
    expected.iter().map(|(bkey, key)| (*bkey, key.to_string())).collect()
}

/// All orderings of `0..n`
#[allow(dead_code)]
pub fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn extend(current: &mut Vec<usize>, used: &mut Vec<bool>, out: &mut Vec<Vec<usize>>) {
        if current.len() == used.len() {
            out.push(current.clone());
            return;
        }
        for index in 0..used.len() {
            if !used[index] {
                used[index] = true;
                current.push(index);
                extend(current, used, out);
                current.pop();
                used[index] = false;
            }
        }
    }

    let mut out = Vec::new();
    extend(&mut Vec::new(), &mut vec![false; n], &mut out);
    out
}

/// Cache node with fixed connection flags
#[allow(dead_code)]
pub struct TestNode {
    pub name: String,
    pub active: bool,
    pub first_connecting: bool,
    pub queue_status: QueueStatus,
}

#[allow(dead_code)]
impl TestNode {
    pub fn connected(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            active: true,
            first_connecting: false,
            queue_status: QueueStatus::default(),
        })
    }

    pub fn never_connected(name: &str, queue_status: QueueStatus) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            active: false,
            first_connecting: true,
            queue_status,
        })
    }
}

impl CacheNode for TestNode {
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

/// Smget sub-operation answering with a canned outcome after an optional delay
#[allow(dead_code)]
pub struct TestOperation {
    node: Option<Arc<dyn CacheNode>>,
    state: Mutex<OperationState>,
    outcome: Result<NodeResponse<String>, OperationStatus>,
    delay: Duration,
}

#[allow(dead_code)]
impl TestOperation {
    pub fn responding(node: Arc<dyn CacheNode>, response: NodeResponse<String>) -> Arc<Self> {
        Self::build(Some(node), Ok(response), Duration::ZERO)
    }

    pub fn failing(node: Arc<dyn CacheNode>, status: OperationStatus) -> Arc<Self> {
        Self::build(Some(node), Err(status), Duration::ZERO)
    }

    pub fn delayed(node: Option<Arc<dyn CacheNode>>, response: NodeResponse<String>, delay: Duration) -> Arc<Self> {
        Self::build(node, Ok(response), delay)
    }

    fn build(
        node: Option<Arc<dyn CacheNode>>,
        outcome: Result<NodeResponse<String>, OperationStatus>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            node,
            state: Mutex::new(OperationState::WriteQueued),
            outcome,
            delay,
        })
    }
}

impl SubOperation for TestOperation {
    fn api_type(&self) -> &str {
        "smget"
    }

    fn state(&self) -> OperationState {
        *self.state.lock()
    }

    fn handling_node(&self) -> Option<Arc<dyn CacheNode>> {
        self.node.clone()
    }
}

#[async_trait]
impl SmgetSubOperation<String> for TestOperation {
    async fn execute(&self) -> Result<NodeResponse<String>, OperationStatus> {
        *self.state.lock() = OperationState::Reading;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        *self.state.lock() = OperationState::Complete;
        self.outcome.clone()
    }
}
