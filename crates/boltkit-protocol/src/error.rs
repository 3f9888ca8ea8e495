// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Errors raised by transports.

use thiserror::Error;

/// Errors that can occur while talking to the orchestrator.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),
}

/// Type alias for transport results.
pub type Result<T> = std::result::Result<T, ProtocolError>;
