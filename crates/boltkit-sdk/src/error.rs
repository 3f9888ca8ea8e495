// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SDK-specific error types.

use boltkit_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while running a bolt.
#[derive(Debug, Error)]
pub enum BoltError {
    /// Configuration error (invalid environment variable)
    #[error("configuration error: {0}")]
    Config(String),

    /// A caller passed a malformed argument (e.g. a non-sequence payload).
    /// Raised before any I/O and never attributed to an in-flight tuple.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A user hook (`process`, `process_tick`, `process_batch`, ...) failed
    #[error("processing failed: {0}")]
    Processing(String),

    /// Tick tuple without an integer frequency
    #[error("malformed tick tuple: {0}")]
    MalformedTick(String),

    /// Transport failure
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl BoltError {
    /// Shorthand for a hook failure.
    pub fn processing(message: impl std::fmt::Display) -> Self {
        BoltError::Processing(message.to_string())
    }
}

impl From<serde_json::Error> for BoltError {
    fn from(err: serde_json::Error) -> Self {
        BoltError::Processing(err.to_string())
    }
}

/// Type alias for SDK results.
pub type Result<T> = std::result::Result<T, BoltError>;
