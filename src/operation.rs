//! Capability traits for sub-operations and the cache nodes that serve them
//!
//! The transport layer owns the concrete operation and node types. This crate only reads a small
//! set of capabilities from them: the API kind, the pipe/bulk flags, the lifecycle state and the
//! handling node with its connection and queue status.

use crate::status::OperationState;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Queue depths of a cache node at the moment it was inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    pub write_queue: usize,
    pub read_queue: usize,
    pub input_queue: usize,
}

impl QueueStatus {
    pub fn new(write_queue: usize, read_queue: usize, input_queue: usize) -> Self {
        Self {
            write_queue,
            read_queue,
            input_queue,
        }
    }

    pub fn total(&self) -> usize {
        self.write_queue + self.read_queue + self.input_queue
    }
}

impl Display for QueueStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#Tops={} #Wops={} #Rops={} #Iops={}",
            self.total(),
            self.write_queue,
            self.read_queue,
            self.input_queue
        )
    }
}

/// A cache node as seen by diagnostics
pub trait CacheNode: Send + Sync {
    /// Stable display name, usually `host:port`
    fn node_name(&self) -> String;

    /// Whether the node currently holds a live connection
    fn is_active(&self) -> bool;

    /// Whether the node is still on its very first connection attempt
    fn is_first_connecting(&self) -> bool;

    fn op_queue_status(&self) -> QueueStatus;
}

/// One node-level request issued on behalf of a logical request
pub trait SubOperation: Send + Sync {
    /// API kind, e.g. `smget` or `bop get`
    fn api_type(&self) -> &str;

    fn is_pipe_operation(&self) -> bool {
        false
    }

    fn is_bulk_operation(&self) -> bool {
        false
    }

    fn state(&self) -> OperationState;

    /// Node the operation was routed to, if routing already happened
    fn handling_node(&self) -> Option<Arc<dyn CacheNode>>;
}
