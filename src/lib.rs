//! Shardmerge - scatter-gather merging for sharded sorted-collection queries
//!
//! A sorted-collection "smget" query spans collections stored on many cache nodes. The query is
//! split into one sub-operation per node; each node answers with a locally sorted partial list.
//! Shardmerge combines those partial lists into one globally sorted, size-bounded result, joins
//! the per-node completions into a single completion, and renders failure and timeout reports
//! naming the nodes involved.

pub mod aggregator;
pub mod bkey;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod fan_in;
pub mod operation;
pub mod status;
pub mod structures;

#[cfg(test)]
pub mod test_utils;

pub use aggregator::{SmgetAggregator, SmgetResult};
pub use bkey::SecondaryKey;
pub use config::{DispatchConfig, MergeConfig};
pub use diagnostics::{create_message, create_timed_out_message, create_timed_out_message_for, TimeUnit};
pub use dispatch::{SmgetDispatcher, SmgetSubOperation};
pub use error::ShardmergeError;
pub use fan_in::{CompletionLatch, FanInCallback, OperationCallback};
pub use operation::{CacheNode, QueueStatus, SubOperation};
pub use status::{OperationState, OperationStatus, TerminalStatus};
pub use structures::{MissedKey, NodeResponse, SmgetElement};

/// Type alias for Results using ShardmergeError
pub type Result<T> = std::result::Result<T, ShardmergeError>;
