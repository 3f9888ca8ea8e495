// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The transport contract a bolt runtime is driven through.
//!
//! Framing (newline-delimited JSON on the standard streams, length-prefixed
//! frames, ...) lives behind this trait. The runtime only ever sees decoded
//! [`Tuple`]s and hands over [`Command`]s to be written.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{Command, Handshake};
use crate::tuple::Tuple;

/// Connection to the orchestrating process.
///
/// Implementations must be safe to share between the main loop and any
/// auxiliary tasks that emit. Pairing an emit with its task-id response is
/// the caller's job; the transport only moves single messages.
///
/// `read_tuple` runs on the main loop without any caller-side lock, while an
/// auxiliary task may be inside `read_task_ids` at the same time. An
/// implementation sharing one inbound stream must therefore demultiplex:
/// task-id lists go only to `read_task_ids`, everything else only to
/// `read_tuple`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Read the one-time handshake (configuration and placement context).
    async fn read_handshake(&self) -> Result<Handshake>;

    /// Block until the next inbound tuple arrives.
    ///
    /// Heartbeats and ticks are delivered as tuples carrying their sentinel
    /// fields.
    async fn read_tuple(&self) -> Result<Tuple>;

    /// Serialize and write one command.
    async fn send_message(&self, command: &Command) -> Result<()>;

    /// Read the task-id list answering the last `emit` that asked for one.
    ///
    /// Never consumes an inbound tuple.
    async fn read_task_ids(&self) -> Result<Vec<i64>>;

    /// Report an error together with the tuples it concerns.
    ///
    /// Diagnostic only; has no effect on control flow.
    async fn raise_exception(&self, error: &str, tuples: &[Tuple]) -> Result<()>;
}
