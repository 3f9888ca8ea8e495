// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime policy flags for a bolt.

use std::env;

use crate::error::{BoltError, Result};

/// Policy flags consumed by the run loop and the batching layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoltConfig {
    /// Anchor emits to the in-flight tuples when no anchors are given (default: true)
    pub auto_anchor: bool,
    /// Ack tuples after successful processing (default: true)
    pub auto_ack: bool,
    /// Fail in-flight tuples when a hook errors (default: true)
    pub auto_fail: bool,
    /// Number of ticks that must be exceeded before a batch flush (default: 1)
    pub ticks_between_batches: u64,
}

impl Default for BoltConfig {
    fn default() -> Self {
        Self {
            auto_anchor: true,
            auto_ack: true,
            auto_fail: true,
            ticks_between_batches: 1,
        }
    }
}

impl BoltConfig {
    /// Configuration with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `BOLTKIT_AUTO_ANCHOR` - `true`/`1` or `false`/`0` (default: true)
    /// - `BOLTKIT_AUTO_ACK` - `true`/`1` or `false`/`0` (default: true)
    /// - `BOLTKIT_AUTO_FAIL` - `true`/`1` or `false`/`0` (default: true)
    /// - `BOLTKIT_TICKS_BETWEEN_BATCHES` - non-negative integer (default: 1)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Same as [`BoltConfig::from_env`], reading variables through `lookup`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let auto_anchor = parse_flag(&lookup, "BOLTKIT_AUTO_ANCHOR", defaults.auto_anchor)?;
        let auto_ack = parse_flag(&lookup, "BOLTKIT_AUTO_ACK", defaults.auto_ack)?;
        let auto_fail = parse_flag(&lookup, "BOLTKIT_AUTO_FAIL", defaults.auto_fail)?;

        let ticks_between_batches = match lookup("BOLTKIT_TICKS_BETWEEN_BATCHES") {
            Some(raw) => raw.trim().parse().map_err(|e| {
                BoltError::Config(format!("invalid BOLTKIT_TICKS_BETWEEN_BATCHES: {}", e))
            })?,
            None => defaults.ticks_between_batches,
        };

        Ok(Self {
            auto_anchor,
            auto_ack,
            auto_fail,
            ticks_between_batches,
        })
    }

    /// Set automatic anchoring.
    pub fn with_auto_anchor(mut self, enabled: bool) -> Self {
        self.auto_anchor = enabled;
        self
    }

    /// Set automatic acknowledgment.
    pub fn with_auto_ack(mut self, enabled: bool) -> Self {
        self.auto_ack = enabled;
        self
    }

    /// Set automatic failure reporting.
    pub fn with_auto_fail(mut self, enabled: bool) -> Self {
        self.auto_fail = enabled;
        self
    }

    /// Set the batch flush threshold, in ticks.
    pub fn with_ticks_between_batches(mut self, ticks: u64) -> Self {
        self.ticks_between_batches = ticks;
        self
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> Result<bool> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(BoltError::Config(format!("invalid {}: {:?}", name, other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BoltConfig::new();
        assert!(config.auto_anchor);
        assert!(config.auto_ack);
        assert!(config.auto_fail);
        assert_eq!(config.ticks_between_batches, 1);
    }

    #[test]
    fn test_builder_pattern() {
        let config = BoltConfig::new()
            .with_auto_anchor(false)
            .with_auto_ack(false)
            .with_auto_fail(false)
            .with_ticks_between_batches(5);

        assert!(!config.auto_anchor);
        assert!(!config.auto_ack);
        assert!(!config.auto_fail);
        assert_eq!(config.ticks_between_batches, 5);
    }

    #[test]
    fn test_from_vars_empty_uses_defaults() {
        let config = BoltConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, BoltConfig::default());
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = BoltConfig::from_vars(vars(&[
            ("BOLTKIT_AUTO_ANCHOR", "0"),
            ("BOLTKIT_AUTO_ACK", "FALSE"),
            ("BOLTKIT_AUTO_FAIL", "1"),
            ("BOLTKIT_TICKS_BETWEEN_BATCHES", " 0 "),
        ]))
        .unwrap();

        assert!(!config.auto_anchor);
        assert!(!config.auto_ack);
        assert!(config.auto_fail);
        assert_eq!(config.ticks_between_batches, 0);
    }

    #[test]
    fn test_from_vars_rejects_bad_flag() {
        let err = BoltConfig::from_vars(vars(&[("BOLTKIT_AUTO_ACK", "maybe")])).unwrap_err();
        assert!(matches!(err, BoltError::Config(msg) if msg.contains("BOLTKIT_AUTO_ACK")));
    }

    #[test]
    fn test_from_vars_rejects_negative_ticks() {
        let err =
            BoltConfig::from_vars(vars(&[("BOLTKIT_TICKS_BETWEEN_BATCHES", "-2")])).unwrap_err();
        assert!(matches!(err, BoltError::Config(_)));
    }
}
