//! Failure and timeout reports for scatter-gather requests
//!
//! Renders the caller-visible text for a request that timed out or failed on one or more nodes.
//! Rendering never fails: a sub-operation that was never created, or one that was never routed
//! to a node, shows up as `<unknown>` instead.
//!
//! ```rust
//! use shardmerge::diagnostics::create_message;
//! use shardmerge::operation::SubOperation;
//!
//! let ops: Vec<Option<&dyn SubOperation>> = vec![None];
//! assert_eq!(create_message("smget failed", &ops), "smget failed - failing node: <unknown>");
//! ```

use crate::constants::diagnostic;
use crate::operation::SubOperation;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

/// Granularity used to report elapsed and allowed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn nanos_per_unit(self) -> u128 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60 * 1_000_000_000,
            Self::Hours => 60 * 60 * 1_000_000_000,
            Self::Days => 24 * 60 * 60 * 1_000_000_000,
        }
    }

    /// Convert a nanosecond count into this unit, truncating and saturating at `u64::MAX`
    pub fn convert_nanos(self, nanos: u128) -> u64 {
        u64::try_from(nanos / self.nanos_per_unit()).unwrap_or(u64::MAX)
    }

    pub fn convert_duration(self, duration: Duration) -> u64 {
        self.convert_nanos(duration.as_nanos())
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nanoseconds => "NANOSECONDS",
            Self::Microseconds => "MICROSECONDS",
            Self::Milliseconds => "MILLISECONDS",
            Self::Seconds => "SECONDS",
            Self::Minutes => "MINUTES",
            Self::Hours => "HOURS",
            Self::Days => "DAYS",
        };
        f.write_str(name)
    }
}

/// Render a timeout report for a request started at `started` and allowed `duration` `unit`s
///
/// The first operation is the representative: its API kind names the request and its pipe flag
/// marks it as a pipelined request. The request counts as bulk when it was split over several
/// operations or when the representative reports itself as bulk.
pub fn create_timed_out_message<O>(started: Instant, duration: u64, unit: TimeUnit, ops: &[Option<&O>]) -> String
where
    O: SubOperation + ?Sized,
{
    render_timed_out(started.elapsed(), duration, unit, ops)
}

/// Single-operation form of [`create_timed_out_message`]
pub fn create_timed_out_message_for<O>(started: Instant, duration: u64, unit: TimeUnit, op: &O) -> String
where
    O: SubOperation + ?Sized,
{
    create_timed_out_message(started, duration, unit, &[Some(op)])
}

pub(crate) fn render_timed_out<O>(elapsed: Duration, duration: u64, unit: TimeUnit, ops: &[Option<&O>]) -> String
where
    O: SubOperation + ?Sized,
{
    let representative = ops.first().copied().flatten();

    let mut message = String::new();
    if ops.len() > 1 || representative.is_some_and(|op| op.is_bulk_operation()) {
        message.push_str("bulk ");
    }
    if representative.is_some_and(|op| op.is_pipe_operation()) {
        message.push_str("pipe ");
    }

    let api_type = representative.map_or(diagnostic::UNKNOWN, |op| op.api_type());
    message.push_str(&format!(
        "{} operation timed out ({} >= {} {})",
        api_type,
        unit.convert_duration(elapsed),
        duration,
        unit
    ));

    create_message(&message, ops)
}

/// Append the failing-node detail for `ops` to `message`
///
/// Each operation contributes its node name, its state, the node's queue status and, for a
/// node still on its first connection attempt, a `(Not connected yet)` marker.
pub fn create_message<O>(message: &str, ops: &[Option<&O>]) -> String
where
    O: SubOperation + ?Sized,
{
    let mut rv = String::from(message);
    rv.push_str(if ops.len() == 1 {
        diagnostic::FAILING_NODE
    } else {
        diagnostic::FAILING_NODES
    });

    for (index, op) in ops.iter().copied().enumerate() {
        if index > 0 {
            rv.push_str(", ");
        }

        let node = op.and_then(|op| op.handling_node());
        match &node {
            Some(node) => rv.push_str(&node.node_name()),
            None => rv.push_str(diagnostic::UNKNOWN),
        }
        if let Some(op) = op {
            rv.push_str(&format!(" [{}]", op.state()));
        }
        if let Some(node) = &node {
            rv.push_str(&format!(" [{}]", node.op_queue_status()));
            if !node.is_active() && node.is_first_connecting() {
                rv.push_str(diagnostic::NOT_CONNECTED_YET);
            }
        }
    }

    rv
}
