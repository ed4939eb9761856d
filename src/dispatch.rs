//! Scatter-gather execution of smget requests
//!
//! [`SmgetDispatcher`] runs one smget request that was already split into per-node
//! sub-operations. Each sub-operation runs as its own task; its completion feeds the shared
//! [`SmgetAggregator`] and a [`FanInCallback`] whose latch is the join barrier. The aggregator is
//! finalized only after the latch fires. If the deadline passes first, outstanding tasks are
//! aborted and the caller gets a timeout error naming the nodes that never answered.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use shardmerge::config::{DispatchConfig, MergeConfig};
//! use shardmerge::dispatch::{SmgetDispatcher, SmgetSubOperation};
//! use std::sync::Arc;
//!
//! # async fn example(ops: Vec<Arc<dyn SmgetSubOperation<Vec<u8>>>>) -> Result<(), shardmerge::error::ShardmergeError> {
//! let dispatcher = SmgetDispatcher::new(DispatchConfig::default())?;
//! let result = dispatcher
//!     .execute(MergeConfig::new().limit(100).unique(true), ops)
//!     .await?
//!     .into_checked()?;
//!
//! for element in result.elements() {
//!     println!("{} {}", element.key(), element.bkey());
//! }
//! # Ok(())
//! # }
//! ```

use crate::aggregator::{SmgetAggregator, SmgetResult};
use crate::config::{DispatchConfig, MergeConfig};
use crate::constants::{diagnostic, status_tag};
use crate::diagnostics::render_timed_out;
use crate::error::ShardmergeError;
use crate::fan_in::{CompletionLatch, FanInCallback, OperationCallback};
use crate::operation::SubOperation;
use crate::status::{OperationState, OperationStatus};
use crate::structures::NodeResponse;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// A per-node smget sub-operation the dispatcher can drive
///
/// The transport implements this for its node requests. `execute` resolves once the node
/// answered, with the node's locally sorted partial result or the failing status.
#[async_trait]
pub trait SmgetSubOperation<T>: SubOperation {
    async fn execute(&self) -> Result<NodeResponse<T>, OperationStatus>;
}

/// Runs smget sub-operations concurrently and merges their results
#[derive(Debug, Clone)]
pub struct SmgetDispatcher {
    config: DispatchConfig,
}

impl SmgetDispatcher {
    pub fn new(config: DispatchConfig) -> Result<Self, ShardmergeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Execute every sub-operation and return the finalized result
    ///
    /// Node failures do not make this return `Err`: they surface as a failed terminal status on
    /// the result. `Err` means the request itself could not be carried out (bad configuration,
    /// deadline exceeded, or a sub-operation task that died without completing).
    pub async fn execute<T>(
        &self,
        merge_config: MergeConfig,
        sub_operations: Vec<Arc<dyn SmgetSubOperation<T>>>,
    ) -> Result<SmgetResult<T>, ShardmergeError>
    where
        T: Send + 'static,
    {
        let started = Instant::now();
        let aggregator = Arc::new(SmgetAggregator::new(merge_config)?);

        if sub_operations.is_empty() {
            debug!("smget with no sub-operations, finalizing immediately");
            return aggregator.finalize();
        }

        let (latch, receiver) = CompletionLatch::new();
        let fan_in = Arc::new(FanInCallback::new(Arc::new(latch), sub_operations.len())?);

        let mut tasks = JoinSet::new();
        for sub_operation in &sub_operations {
            let sub_operation = Arc::clone(sub_operation);
            let aggregator = Arc::clone(&aggregator);
            let fan_in = Arc::clone(&fan_in);

            tasks.spawn(async move {
                match sub_operation.execute().await {
                    Ok(response) => {
                        aggregator.merge_node_response(response);
                        fan_in.received_status(OperationStatus::success(status_tag::END));
                    }
                    Err(status) => {
                        warn!(
                            "smget sub-operation on {} failed: {}",
                            node_label(sub_operation.as_ref()),
                            status
                        );
                        aggregator.mark_failed(status.clone());
                        fan_in.received_status(status);
                    }
                }
                fan_in.complete();
            });
        }
        drop(fan_in);

        debug!("Dispatched {} smget sub-operations", sub_operations.len());

        match timeout(self.config.operation_timeout, receiver).await {
            Ok(Ok(status)) => {
                debug!("smget join barrier released with status {}", status);
                aggregator.finalize()
            }
            Ok(Err(_)) => {
                tasks.abort_all();
                let error = ShardmergeError::dispatch_failed("join", "a sub-operation task ended without completing")
                    .with_operation_context("smget", &format!("{} sub-operations", sub_operations.len()));
                warn!("{}", error);
                Err(error)
            }
            Err(_) => {
                tasks.abort_all();
                aggregator.mark_failed(OperationStatus::failure(status_tag::CANCELED));
                let message = self.timeout_message(started, &sub_operations);
                warn!("{}", message);
                Err(ShardmergeError::timeout(message))
            }
        }
    }

    /// Render the timeout report over the sub-operations that had not completed
    ///
    /// Elapsed time is read from the tokio clock, the same clock the deadline runs on.
    fn timeout_message<T>(&self, started: Instant, sub_operations: &[Arc<dyn SmgetSubOperation<T>>]) -> String
    where
        T: 'static,
    {
        let mut outstanding: Vec<Option<&dyn SmgetSubOperation<T>>> = sub_operations
            .iter()
            .filter(|op| op.state() != OperationState::Complete)
            .map(|op| Some(op.as_ref()))
            .collect();
        if outstanding.is_empty() {
            // Every node answered but the barrier had not released yet.
            outstanding = sub_operations.iter().map(|op| Some(op.as_ref())).collect();
        }

        let unit = self.config.timeout_unit;
        render_timed_out(
            started.elapsed(),
            unit.convert_duration(self.config.operation_timeout),
            unit,
            &outstanding,
        )
    }
}

fn node_label<O: SubOperation + ?Sized>(op: &O) -> String {
    op.handling_node()
        .map_or_else(|| diagnostic::UNKNOWN.to_string(), |node| node.node_name())
}
