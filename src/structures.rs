//! Core data structures for smget results
//!
//! This module provides the values exchanged between per-node sub-operations and the aggregator:
//! - SmgetElement: one (b-key, cache key, value) element returned by a node
//! - MissedKey: a cache key a node could not serve, with the reason
//! - NodeResponse: everything a node reports for its share of an smget

use crate::bkey::SecondaryKey;
use crate::status::OperationStatus;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

/// One element of a sorted collection returned by an smget sub-operation
///
/// Elements order by b-key first and by cache key second, which breaks ties between distinct
/// collections holding the same b-key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmgetElement<T> {
    key: String,
    bkey: SecondaryKey,
    value: T,
}

impl<T> SmgetElement<T> {
    pub fn new(key: impl Into<String>, bkey: impl Into<SecondaryKey>, value: T) -> Self {
        Self {
            key: key.into(),
            bkey: bkey.into(),
            value,
        }
    }

    /// Cache key of the collection this element belongs to
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn bkey(&self) -> &SecondaryKey {
        &self.bkey
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn compare_bkey_to(&self, other: &Self) -> Ordering {
        self.bkey.cmp(&other.bkey)
    }

    pub fn compare_key_to(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }

    /// Full element ordering: b-key, then cache key
    pub fn compare_to(&self, other: &Self) -> Ordering {
        self.compare_bkey_to(other).then_with(|| self.compare_key_to(other))
    }
}

impl<T: Display> Display for SmgetElement<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{key={}, bkey={}, value={}}}", self.key, self.bkey, self.value)
    }
}

/// A cache key that contributed nothing because its node could not read it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedKey {
    pub key: String,
    pub cause: OperationStatus,
}

impl MissedKey {
    pub fn new(key: impl Into<String>, cause: OperationStatus) -> Self {
        Self { key: key.into(), cause }
    }
}

/// Partial result of one node's smget sub-operation
///
/// `elements` must already be sorted in the request direction. `trimmed_keys` carries, per cache
/// key, the last b-key the node scanned before capping its local result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResponse<T> {
    pub elements: Vec<SmgetElement<T>>,
    pub trimmed_keys: Vec<(String, SecondaryKey)>,
    pub missed_keys: Vec<MissedKey>,
}

impl<T> Default for NodeResponse<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            trimmed_keys: Vec::new(),
            missed_keys: Vec::new(),
        }
    }
}

impl<T> NodeResponse<T> {
    pub fn new(elements: Vec<SmgetElement<T>>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    pub fn with_trimmed_key(mut self, key: impl Into<String>, bkey: impl Into<SecondaryKey>) -> Self {
        self.trimmed_keys.push((key.into(), bkey.into()));
        self
    }

    pub fn with_missed_key(mut self, key: impl Into<String>, cause: OperationStatus) -> Self {
        self.missed_keys.push(MissedKey::new(key, cause));
        self
    }

    /// Check that `elements` is sorted in the given direction with no repeated (b-key, key) pair
    pub fn is_sorted(&self, reverse: bool) -> bool {
        self.elements.windows(2).all(|pair| {
            let ordering = pair[0].compare_to(&pair[1]);
            if reverse {
                ordering == Ordering::Greater
            } else {
                ordering == Ordering::Less
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_ordering_uses_bkey_then_key() {
        let a = SmgetElement::new("a", 3u64, ());
        let b = SmgetElement::new("b", 3u64, ());
        let c = SmgetElement::new("a", 4u64, ());

        assert_eq!(a.compare_bkey_to(&b), Ordering::Equal);
        assert_eq!(a.compare_key_to(&b), Ordering::Less);
        assert_eq!(a.compare_to(&b), Ordering::Less);
        assert_eq!(c.compare_to(&b), Ordering::Greater);
    }

    #[test]
    fn test_element_display() {
        let element = SmgetElement::new("user:1", 10u64, "v");
        assert_eq!(element.to_string(), "{key=user:1, bkey=10, value=v}");
    }

    #[test]
    fn test_node_response_builder() {
        let response = NodeResponse::new(vec![SmgetElement::new("k1", 1u64, 0)])
            .with_trimmed_key("k1", 1u64)
            .with_missed_key("k2", OperationStatus::failure("NOT_FOUND"));

        assert_eq!(response.elements.len(), 1);
        assert_eq!(response.trimmed_keys, vec![("k1".to_string(), SecondaryKey::Long(1))]);
        assert_eq!(response.missed_keys[0].key, "k2");
        assert_eq!(response.missed_keys[0].cause.message(), "NOT_FOUND");
    }

    #[test]
    fn test_node_response_sorted_check() {
        let ascending = NodeResponse::new(vec![
            SmgetElement::new("a", 1u64, ()),
            SmgetElement::new("a", 2u64, ()),
            SmgetElement::new("b", 2u64, ()),
        ]);
        assert!(ascending.is_sorted(false));
        assert!(!ascending.is_sorted(true));

        let repeated = NodeResponse::new(vec![SmgetElement::new("a", 1u64, ()), SmgetElement::new("a", 1u64, ())]);
        assert!(!repeated.is_sorted(false));
    }
}
