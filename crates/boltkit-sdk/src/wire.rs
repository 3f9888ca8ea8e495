// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Serialization of writes and response reads on the wire.
//!
//! Hooks may hand an [`Emitter`](crate::Emitter) to auxiliary tasks, so more
//! than one emitter can be talking to the transport at a time. An emit that
//! wants task ids must read the response to *its own* write; if another task
//! slipped a write in between, the two would swap responses.
//!
//! [`WireLock::exchange`] therefore takes the reader lock and then the writer
//! lock, always in that order, and holds both across write-then-read. Writes
//! that expect no response only take the writer lock: they cannot steal a
//! response, and the reader lock is never taken without the writer. Guards
//! are dropped on every exit path, including `?`.
//!
//! The main loop's `read_tuple` takes neither lock. Keeping tuples and
//! task-id responses apart is the [`Transport`]'s contract.

use boltkit_protocol::{Command, ProtocolError, Transport, Tuple};
use tokio::sync::Mutex;
use tracing::trace;

/// The pair of locks guarding one transport.
#[derive(Debug, Default)]
pub struct WireLock {
    reader: Mutex<()>,
    writer: Mutex<()>,
}

impl WireLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `command` and, if `read_response` is set, read the task-id
    /// response that answers it, with no other write or read in between.
    pub async fn exchange(
        &self,
        transport: &dyn Transport,
        command: &Command,
        read_response: bool,
    ) -> Result<Option<Vec<i64>>, ProtocolError> {
        let _reader = self.reader.lock().await;
        let _writer = self.writer.lock().await;

        transport.send_message(command).await?;
        if !read_response {
            return Ok(None);
        }

        let task_ids = transport.read_task_ids().await?;
        trace!(command = command.name(), ?task_ids, "Read task ids");
        Ok(Some(task_ids))
    }

    /// Write a command that has no response.
    pub async fn send(
        &self,
        transport: &dyn Transport,
        command: &Command,
    ) -> Result<(), ProtocolError> {
        let _writer = self.writer.lock().await;
        transport.send_message(command).await
    }

    /// Forward an error report, serialized with other writes.
    pub async fn report(
        &self,
        transport: &dyn Transport,
        error: &str,
        tuples: &[Tuple],
    ) -> Result<(), ProtocolError> {
        let _writer = self.writer.lock().await;
        transport.raise_exception(error, tuples).await
    }
}
