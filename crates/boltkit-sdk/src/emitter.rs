// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Outbound protocol operations: emit, ack, fail, log.

use std::sync::Arc;

use boltkit_protocol::{Command, LogLevel, Transport, Tuple, TupleRef};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{BoltError, Result};
use crate::wire::WireLock;

/// Options for a single emit.
///
/// Defaults: orchestrator's default stream, default anchors, no direct task,
/// task ids requested.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub(crate) stream: Option<String>,
    pub(crate) anchors: Option<Vec<TupleRef>>,
    pub(crate) direct_task: Option<i64>,
    pub(crate) need_task_ids: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            stream: None,
            anchors: None,
            direct_task: None,
            need_task_ids: true,
        }
    }
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit to a named stream instead of the default one.
    pub fn stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = Some(stream.into());
        self
    }

    /// Anchor to exactly these tuples (ids or tuples), overriding auto-anchoring.
    pub fn anchors<I, A>(mut self, anchors: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<TupleRef>,
    {
        self.anchors = Some(anchors.into_iter().map(Into::into).collect());
        self
    }

    /// Route the tuple to a single task.
    pub fn direct_task(mut self, task: i64) -> Self {
        self.direct_task = Some(task);
        self
    }

    /// Whether to wait for the list of tasks the tuple was routed to.
    pub fn need_task_ids(mut self, need: bool) -> Self {
        self.need_task_ids = need;
        self
    }
}

/// Cloneable handle for writing commands to the orchestrator.
///
/// The run loop owns one; hooks get it through
/// [`BoltContext`](crate::BoltContext) and may clone it into auxiliary
/// tasks. Emits through a bare `Emitter` have no default anchors; only the
/// context knows which tuples are in flight. An emitter taken from a
/// batching context never waits for task ids.
#[derive(Clone)]
pub struct Emitter {
    transport: Arc<dyn Transport>,
    wire: Arc<WireLock>,
    fire_and_forget: bool,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("fire_and_forget", &self.fire_and_forget)
            .finish_non_exhaustive()
    }
}

impl Emitter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            wire: Arc::new(WireLock::new()),
            fire_and_forget: false,
        }
    }

    /// Same wire, with `need_task_ids` forced off on every emit when set.
    pub(crate) fn with_fire_and_forget(mut self, fire_and_forget: bool) -> Self {
        self.fire_and_forget = fire_and_forget;
        self
    }

    /// Whether emits through this handle skip the task-id response.
    pub fn is_fire_and_forget(&self) -> bool {
        self.fire_and_forget
    }

    /// Emit one tuple.
    ///
    /// `payload` must serialize to a JSON array (a `Vec`, slice, or Rust
    /// tuple); anything else is rejected with
    /// [`BoltError::InvalidArgument`] before anything is written.
    ///
    /// Returns:
    /// - `Some([direct_task])` when a direct task was given and ids were requested
    /// - `Some(ids)` read from the orchestrator when ids were requested
    /// - `None` when `need_task_ids` is false
    pub async fn emit<T: Serialize>(
        &self,
        payload: T,
        options: EmitOptions,
    ) -> Result<Option<Vec<i64>>> {
        let values = tuple_values(&payload)?;
        self.emit_values(values, options).await
    }

    /// Emit each payload in order, collecting the per-emit results.
    ///
    /// Not atomic: if one emit fails, the ones before it have already been sent.
    pub async fn emit_many<T: Serialize>(
        &self,
        payloads: Vec<T>,
        options: EmitOptions,
    ) -> Result<Vec<Option<Vec<i64>>>> {
        let mut all_task_ids = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            all_task_ids.push(self.emit(payload, options.clone()).await?);
        }
        Ok(all_task_ids)
    }

    #[instrument(skip(self, values, options), fields(stream = options.stream.as_deref(), direct_task = options.direct_task))]
    pub(crate) async fn emit_values(
        &self,
        values: Vec<Value>,
        mut options: EmitOptions,
    ) -> Result<Option<Vec<i64>>> {
        if self.fire_and_forget {
            options.need_task_ids = false;
        }
        let anchors = options
            .anchors
            .unwrap_or_default()
            .into_iter()
            .map(TupleRef::into_id)
            .collect();

        let command = Command::emit(
            values,
            anchors,
            options.stream,
            options.direct_task,
            options.need_task_ids,
        );
        let read_response = options.need_task_ids && options.direct_task.is_none();

        let task_ids = self
            .wire
            .exchange(self.transport.as_ref(), &command, read_response)
            .await?;
        debug!(?task_ids, "Emitted tuple");

        if !options.need_task_ids {
            return Ok(None);
        }
        Ok(options.direct_task.map(|task| vec![task]).or(task_ids))
    }

    /// Acknowledge a tuple.
    pub async fn ack(&self, tuple: impl Into<TupleRef>) -> Result<()> {
        let id = tuple.into().into_id();
        debug!(tuple_id = %id, "Ack");
        self.send(&Command::ack(id)).await
    }

    /// Fail a tuple.
    pub async fn fail(&self, tuple: impl Into<TupleRef>) -> Result<()> {
        let id = tuple.into().into_id();
        debug!(tuple_id = %id, "Fail");
        self.send(&Command::fail(id)).await
    }

    /// Write a message to the orchestrator's log.
    pub async fn log(&self, msg: impl Into<String>, level: Option<LogLevel>) -> Result<()> {
        self.send(&Command::Log {
            msg: msg.into(),
            level,
        })
        .await
    }

    /// Report an error and the tuples it concerns to the diagnostic channel.
    pub(crate) async fn raise_exception(&self, error: &str, tuples: &[Tuple]) -> Result<()> {
        self.wire
            .report(self.transport.as_ref(), error, tuples)
            .await?;
        Ok(())
    }

    /// Answer a heartbeat.
    pub(crate) async fn sync(&self) -> Result<()> {
        self.send(&Command::Sync).await
    }

    async fn send(&self, command: &Command) -> Result<()> {
        self.wire.send(self.transport.as_ref(), command).await?;
        Ok(())
    }
}

/// Serialize an emit payload, insisting on a sequence.
pub(crate) fn tuple_values<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<Value>> {
    match serde_json::to_value(payload) {
        Ok(Value::Array(values)) => Ok(values),
        Ok(other) => Err(BoltError::InvalidArgument(format!(
            "all tuples must be sequences, received {} instead",
            json_kind(&other)
        ))),
        Err(e) => Err(BoltError::InvalidArgument(format!(
            "tuple payload is not serializable: {}",
            e
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
