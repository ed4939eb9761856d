//! Sort-merge aggregation of per-node smget results
//!
//! One [`SmgetAggregator`] exists per logical smget request. Every node that answers feeds its
//! locally sorted partial list into the aggregator, which keeps the globally sorted top-`limit`
//! elements. A single failing node voids the whole request: a top-K over a subset of the shards
//! is not the top-K of the collection.
//!
//! # Usage Examples
//!
//! ```rust
//! use shardmerge::aggregator::SmgetAggregator;
//! use shardmerge::config::MergeConfig;
//! use shardmerge::status::TerminalStatus;
//! use shardmerge::structures::SmgetElement;
//!
//! # fn example() -> Result<(), shardmerge::error::ShardmergeError> {
//! let aggregator = SmgetAggregator::new(MergeConfig::new().limit(3).unique(true))?;
//!
//! aggregator.merge_elements(vec![
//!     SmgetElement::new("d", 2u64, "d2"),
//!     SmgetElement::new("e", 3u64, "e3"),
//!     SmgetElement::new("f", 6u64, "f6"),
//! ]);
//! aggregator.merge_elements(vec![
//!     SmgetElement::new("a", 1u64, "a1"),
//!     SmgetElement::new("b", 3u64, "b3"),
//!     SmgetElement::new("c", 5u64, "c5"),
//! ]);
//!
//! let result = aggregator.finalize()?;
//! let keys: Vec<&str> = result.elements().iter().map(|e| e.key()).collect();
//! assert_eq!(keys, vec!["a", "d", "b"]);
//! assert_eq!(result.status(), &TerminalStatus::End);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::bkey::SecondaryKey;
use crate::config::MergeConfig;
use crate::error::ShardmergeError;
use crate::status::{OperationStatus, TerminalStatus};
use crate::structures::{MissedKey, NodeResponse, SmgetElement};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use tracing::{debug, trace, warn};

/// Whether `ordering` (candidate compared to incumbent) ranks the candidate first
fn ranks_before(ordering: Ordering, reverse: bool) -> bool {
    if reverse {
        ordering == Ordering::Greater
    } else {
        ordering == Ordering::Less
    }
}

/// Mutable state of one request, guarded by the aggregator lock
struct MergeState<T> {
    merged: Vec<SmgetElement<T>>,
    trimmed_keys: FxHashMap<String, SecondaryKey>,
    missed_keys: FxHashMap<String, OperationStatus>,
    failed_status: Option<OperationStatus>,
    finalized: bool,
}

impl<T> MergeState<T> {
    fn new() -> Self {
        Self {
            merged: Vec::new(),
            trimmed_keys: FxHashMap::default(),
            missed_keys: FxHashMap::default(),
            failed_status: None,
            finalized: false,
        }
    }

    /// Late calls after a failure or after finalize must not touch the result
    fn accepts_updates(&self, operation: &str) -> bool {
        if self.finalized {
            warn!("Ignoring {} on an already finalized smget result", operation);
            return false;
        }
        self.failed_status.is_none()
    }
}

/// Shared accumulator for one smget request
///
/// Safe to share between the completion paths of every node; all mutation happens under one
/// lock owned by this instance.
pub struct SmgetAggregator<T> {
    config: MergeConfig,
    state: Mutex<MergeState<T>>,
}

impl<T> SmgetAggregator<T> {
    /// Create an aggregator after validating `config`
    pub fn new(config: MergeConfig) -> Result<Self, ShardmergeError> {
        config.validate()?;
        Ok(Self {
            config,
            state: Mutex::new(MergeState::new()),
        })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Whether a node failure has already been recorded
    pub fn is_failed(&self) -> bool {
        self.state.lock().failed_status.is_some()
    }

    /// Number of elements currently merged
    pub fn merged_len(&self) -> usize {
        self.state.lock().merged.len()
    }

    /// Record one node's full response: trimmed keys, missed keys and elements
    ///
    /// Elements out of order or repeated are sorted and deduplicated before the cursor merge.
    pub fn merge_node_response(&self, mut response: NodeResponse<T>) {
        let mut state = self.state.lock();
        if !state.accepts_updates("node response") {
            return;
        }

        let reverse = self.config.reverse;
        if !response.is_sorted(reverse) {
            warn!(
                "smget node response with {} elements is not strictly sorted, sorting before merge",
                response.elements.len()
            );
            response.elements.sort_by(|a, b| {
                let ordering = a.compare_to(b);
                if reverse {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
            response.elements.dedup_by(|later, earlier| later.compare_to(earlier) == Ordering::Equal);
        }

        for (key, bkey) in response.trimmed_keys {
            state.trimmed_keys.insert(key, bkey);
        }
        for MissedKey { key, cause } in response.missed_keys {
            state.missed_keys.insert(key, cause);
        }
        self.merge_locked(&mut state, response.elements);
    }

    /// Merge one node's sorted partial list into the shared result
    pub fn merge_elements(&self, partial: Vec<SmgetElement<T>>) {
        let mut state = self.state.lock();
        if !state.accepts_updates("merge") {
            return;
        }
        self.merge_locked(&mut state, partial);
    }

    /// Record the last b-key a node scanned for `key` before capping its local result
    pub fn add_trimmed_key(&self, key: impl Into<String>, bkey: SecondaryKey) {
        let mut state = self.state.lock();
        if state.accepts_updates("trimmed key") {
            state.trimmed_keys.insert(key.into(), bkey);
        }
    }

    /// Record a cache key its node could not read
    pub fn add_missed_key(&self, key: impl Into<String>, cause: OperationStatus) {
        let mut state = self.state.lock();
        if state.accepts_updates("missed key") {
            state.missed_keys.insert(key.into(), cause);
        }
    }

    /// Void the request because a node failed
    ///
    /// The first status is kept as the cause. Accumulated state is cleared on every call.
    pub fn mark_failed(&self, status: OperationStatus) {
        let mut state = self.state.lock();
        if state.finalized {
            warn!("Ignoring failure {} on an already finalized smget result", status);
            return;
        }

        if state.failed_status.is_none() {
            debug!("smget failed: {}", status);
            state.failed_status = Some(status);
        } else {
            trace!("smget already failed, dropping later status {}", status);
        }
        state.merged.clear();
        state.trimmed_keys.clear();
        state.missed_keys.clear();
    }

    /// Classify the request and hand out the final result
    ///
    /// Must run once, after every node completed or failed. Trimmed keys that can no longer
    /// contribute to a follow-up page are dropped before the result is returned.
    pub fn finalize(&self) -> Result<SmgetResult<T>, ShardmergeError> {
        let mut state = self.state.lock();
        if state.finalized {
            return Err(ShardmergeError::AlreadyFinalized);
        }
        state.finalized = true;

        self.refine_trimmed_keys(&mut state);

        let status = match &state.failed_status {
            Some(cause) => TerminalStatus::Failed(cause.clone()),
            None if !self.config.unique && has_duplicated_bkey(&state.merged) => TerminalStatus::Duplicated,
            None => TerminalStatus::End,
        };

        let mut trimmed_keys: Vec<(String, SecondaryKey)> = state.trimmed_keys.drain().collect();
        trimmed_keys.sort_by(|a, b| a.0.cmp(&b.0));

        let mut missed_keys: Vec<MissedKey> = state
            .missed_keys
            .drain()
            .map(|(key, cause)| MissedKey { key, cause })
            .collect();
        missed_keys.sort_by(|a, b| a.key.cmp(&b.key));

        let elements = std::mem::take(&mut state.merged);
        debug!(
            "smget finalized: status={}, elements={}, trimmed_keys={}, missed_keys={}",
            status,
            elements.len(),
            trimmed_keys.len(),
            missed_keys.len()
        );

        Ok(SmgetResult {
            elements,
            status,
            trimmed_keys,
            missed_keys,
        })
    }

    fn merge_locked(&self, state: &mut MergeState<T>, partial: Vec<SmgetElement<T>>) {
        let limit = self.config.limit;
        let unique = self.config.unique;
        let reverse = self.config.reverse;
        let merged = &mut state.merged;

        if merged.is_empty() {
            merged.extend(partial.into_iter().take(limit));
            trace!("smget seeded with {} elements", merged.len());
            return;
        }

        // Both lists are sorted, so the cursor only moves forward across candidates.
        let mut pos = 0;
        for candidate in partial {
            let mut insert = true;
            while pos < merged.len() {
                let incumbent = &merged[pos];
                let bkey_order = candidate.compare_bkey_to(incumbent);
                if ranks_before(bkey_order, reverse) {
                    break;
                }
                if bkey_order == Ordering::Equal {
                    let key_order = candidate.compare_key_to(incumbent);
                    if key_order == Ordering::Equal {
                        // Same element reported twice.
                        insert = false;
                        break;
                    }
                    if ranks_before(key_order, reverse) {
                        if unique {
                            merged.remove(pos);
                        }
                        break;
                    }
                    if unique {
                        insert = false;
                        break;
                    }
                }
                pos += 1;
            }

            if !insert {
                continue;
            }
            if pos >= limit {
                // The rest of `partial` ranks behind a full result.
                break;
            }

            merged.insert(pos, candidate);
            merged.truncate(limit);
            pos += 1;
        }
    }

    fn refine_trimmed_keys(&self, state: &mut MergeState<T>) {
        if state.trimmed_keys.is_empty() || state.merged.len() < self.config.limit {
            return;
        }
        let Some(last) = state.merged.last() else {
            return;
        };

        let reverse = self.config.reverse;
        let before = state.trimmed_keys.len();
        state
            .trimmed_keys
            .retain(|_, boundary| ranks_before((*boundary).cmp(last.bkey()), reverse));
        trace!(
            "Dropped {} trimmed keys beyond the last merged b-key {}",
            before - state.trimmed_keys.len(),
            last.bkey()
        );
    }
}

fn has_duplicated_bkey<T>(merged: &[SmgetElement<T>]) -> bool {
    merged
        .windows(2)
        .any(|pair| pair[0].compare_bkey_to(&pair[1]) == Ordering::Equal)
}

/// Finalized, read-only outcome of an smget request
#[derive(Debug, Clone, PartialEq)]
pub struct SmgetResult<T> {
    elements: Vec<SmgetElement<T>>,
    status: TerminalStatus,
    trimmed_keys: Vec<(String, SecondaryKey)>,
    missed_keys: Vec<MissedKey>,
}

impl<T> SmgetResult<T> {
    /// Merged elements in request order; empty when the request failed
    pub fn elements(&self) -> &[SmgetElement<T>] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<SmgetElement<T>> {
        self.elements
    }

    pub fn status(&self) -> &TerminalStatus {
        &self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a failed result into the error carrying the node's cause
    pub fn into_checked(self) -> Result<Self, ShardmergeError> {
        if matches!(self.status, TerminalStatus::Failed(_)) {
            return Err(ShardmergeError::SubOperationFailed {
                status: self.status.as_operation_status(),
            });
        }
        Ok(self)
    }

    /// Cache keys to resume from on the next page, with their last scanned b-key, sorted by key
    pub fn trimmed_keys(&self) -> &[(String, SecondaryKey)] {
        &self.trimmed_keys
    }

    /// Cache keys that contributed nothing, sorted by key
    pub fn missed_keys(&self) -> &[MissedKey] {
        &self.missed_keys
    }

    /// Missed keys with their node-reported cause, for callers that look keys up directly
    pub fn missed_key_statuses(&self) -> FxHashMap<&str, &OperationStatus> {
        self.missed_keys
            .iter()
            .map(|missed| (missed.key.as_str(), &missed.cause))
            .collect()
    }
}
