//! Fan-in of per-node completions into one downstream callback
//!
//! A logical request split into N sub-operations still owes its caller a single status and a
//! single completion. [`FanInCallback`] sits between the N sub-operations and the caller's
//! callback: it keeps the most relevant status seen so far and fires the caller exactly once,
//! from whichever sub-operation completes last.
//!
//! Status priority: a failure always replaces the recorded status, a success only fills an
//! empty slot. Among several failures the latest one wins.

use crate::constants::status_tag;
use crate::error::ShardmergeError;
use crate::status::OperationStatus;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, trace};

/// Receiver of an operation's status and completion
pub trait OperationCallback: Send + Sync {
    fn received_status(&self, status: OperationStatus);

    fn complete(&self);
}

/// Status delivered when a fan-in dispatches without ever having recorded one
fn undefined_status() -> OperationStatus {
    OperationStatus::failure(status_tag::UNDEFINED)
}

/// Callback wrapper that dispatches once after `todo` completions
pub struct FanInCallback {
    original: Arc<dyn OperationCallback>,
    most_recent_status: Mutex<Option<OperationStatus>>,
    remaining: AtomicUsize,
    expected: usize,
}

impl FanInCallback {
    /// Wrap `original` for `todo` sub-operations
    pub fn new(original: Arc<dyn OperationCallback>, todo: usize) -> Result<Self, ShardmergeError> {
        if todo == 0 {
            return Err(ShardmergeError::invalid_input(
                "todo",
                "a fan-in needs at least one sub-operation",
                "Complete the original callback directly when a request has no sub-operations",
            ));
        }

        Ok(Self {
            original,
            most_recent_status: Mutex::new(None),
            remaining: AtomicUsize::new(todo),
            expected: todo,
        })
    }

    /// Wrap `original` for `todo` sub-operations, starting from `status`
    pub fn with_status(
        original: Arc<dyn OperationCallback>,
        status: OperationStatus,
        todo: usize,
    ) -> Result<Self, ShardmergeError> {
        let callback = Self::new(original, todo)?;
        *callback.most_recent_status.lock() = Some(status);
        Ok(callback)
    }

    /// Completions still outstanding
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn original_callback(&self) -> &Arc<dyn OperationCallback> {
        &self.original
    }

    fn dispatch(&self) {
        let status = self.most_recent_status.lock().take().unwrap_or_else(undefined_status);
        debug!(
            "All {} sub-operations completed, dispatching status {}",
            self.expected, status
        );
        self.original.received_status(status);
        self.original.complete();
    }
}

impl OperationCallback for FanInCallback {
    fn received_status(&self, status: OperationStatus) {
        let mut recorded = self.most_recent_status.lock();
        if recorded.is_none() || !status.is_success() {
            trace!("Recording sub-operation status {}", status);
            *recorded = Some(status);
        }
    }

    fn complete(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| remaining.checked_sub(1));

        match previous {
            Ok(1) => self.dispatch(),
            Ok(remaining) => trace!("Sub-operation completed, {} remaining", remaining - 1),
            Err(_) => error!(
                "complete() called after all {} sub-operations already completed; ignoring",
                self.expected
            ),
        }
    }
}

/// Downstream callback that hands the final status to an async waiter
///
/// The receiver resolves once `complete` is called; the status is whatever was received
/// last before that.
pub struct CompletionLatch {
    status: Mutex<Option<OperationStatus>>,
    sender: Mutex<Option<oneshot::Sender<OperationStatus>>>,
}

impl CompletionLatch {
    pub fn new() -> (Self, oneshot::Receiver<OperationStatus>) {
        let (sender, receiver) = oneshot::channel();
        let latch = Self {
            status: Mutex::new(None),
            sender: Mutex::new(Some(sender)),
        };
        (latch, receiver)
    }
}

impl OperationCallback for CompletionLatch {
    fn received_status(&self, status: OperationStatus) {
        *self.status.lock() = Some(status);
    }

    fn complete(&self) {
        let Some(sender) = self.sender.lock().take() else {
            error!("Completion latch fired twice; ignoring");
            return;
        };
        let status = self.status.lock().take().unwrap_or_else(undefined_status);
        if sender.send(status).is_err() {
            debug!("Completion latch receiver dropped before the request completed");
        }
    }
}
