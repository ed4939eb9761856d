//! Configuration structures for smget requests
//!
//! This module provides the per-request merge parameters and the dispatcher settings, with
//! parameter validation and builder pattern implementation.

use crate::constants::MAX_SMGET_LIMIT;
use crate::diagnostics::TimeUnit;
use crate::error::ShardmergeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters fixed for the lifetime of one smget aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Maximum number of elements kept in the merged result
    pub limit: usize,
    /// Keep a single element per b-key across collections
    pub unique: bool,
    /// Descending b-key order
    pub reverse: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            limit: 50,
            unique: false,
            reverse: false,
        }
    }
}

impl MergeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of merged elements
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Enable or disable b-key uniqueness
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Enable or disable descending order
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Validate the merge configuration
    pub fn validate(&self) -> Result<(), ShardmergeError> {
        if self.limit > MAX_SMGET_LIMIT {
            return Err(ShardmergeError::config_error(
                "merge_config.limit",
                format!("value {} exceeds the maximum of {}", self.limit, MAX_SMGET_LIMIT),
                format!(
                    "Request at most {} elements and page through the rest using the trimmed keys",
                    MAX_SMGET_LIMIT
                ),
            ));
        }

        Ok(())
    }

    /// Build the configuration after validation
    pub fn build(self) -> Result<Self, ShardmergeError> {
        self.validate()?;
        Ok(self)
    }
}

/// Settings of the scatter-gather dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Deadline for every node of a request to answer
    pub operation_timeout: Duration,
    /// Unit used when rendering timeout diagnostics
    pub timeout_unit: TimeUnit,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_millis(700),
            timeout_unit: TimeUnit::Milliseconds,
        }
    }
}

impl DispatchConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request deadline
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the unit for timeout diagnostics
    pub fn timeout_unit(mut self, unit: TimeUnit) -> Self {
        self.timeout_unit = unit;
        self
    }

    /// Validate the dispatcher configuration
    pub fn validate(&self) -> Result<(), ShardmergeError> {
        if self.operation_timeout.is_zero() {
            return Err(ShardmergeError::config_error(
                "dispatch_config.operation_timeout",
                "must be greater than 0",
                "Set operation_timeout to a positive duration (recommended: 700ms for reads)",
            ));
        }

        if self.timeout_unit.convert_duration(self.operation_timeout) == 0 {
            return Err(ShardmergeError::config_error(
                "dispatch_config.timeout_unit",
                format!(
                    "operation_timeout {:?} rounds down to 0 {}",
                    self.operation_timeout, self.timeout_unit
                ),
                "Use a finer timeout_unit so the timeout message stays meaningful",
            ));
        }

        Ok(())
    }

    /// Build the configuration after validation
    pub fn build(self) -> Result<Self, ShardmergeError> {
        self.validate()?;
        Ok(self)
    }
}
