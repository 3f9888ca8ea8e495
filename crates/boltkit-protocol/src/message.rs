// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Outbound commands and the handshake payload.
//!
//! Field names here are part of the wire contract:
//!
//! | command | required fields     | optional fields                   |
//! |---------|---------------------|-----------------------------------|
//! | `emit`  | `tuple`, `anchors`  | `stream`, `task`, `need_task_ids` |
//! | `ack`   | `id`                |                                   |
//! | `fail`  | `id`                |                                   |
//! | `sync`  |                     |                                   |
//! | `log`   | `msg`               | `level`                           |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A message sent from the bolt to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    /// Emit a new tuple downstream.
    Emit {
        /// Tuple values.
        tuple: Vec<Value>,
        /// Ids of the input tuples this emit is anchored to.
        anchors: Vec<String>,
        /// Target stream; the orchestrator's default stream when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stream: Option<String>,
        /// Direct-routing target task.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<i64>,
        /// Only ever present as `false`; the orchestrator defaults to `true`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        need_task_ids: Option<bool>,
    },
    /// Processing of a tuple succeeded.
    Ack {
        /// Tuple id.
        id: String,
    },
    /// Processing of a tuple failed.
    Fail {
        /// Tuple id.
        id: String,
    },
    /// Answer to a heartbeat probe.
    Sync,
    /// Write a line to the orchestrator's log.
    Log {
        /// Message text.
        msg: String,
        /// Severity; the orchestrator logs at info when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<LogLevel>,
    },
}

impl Command {
    /// Build an `emit` command.
    ///
    /// `need_task_ids` is only written to the wire when it is `false`.
    pub fn emit(
        tuple: Vec<Value>,
        anchors: Vec<String>,
        stream: Option<String>,
        task: Option<i64>,
        need_task_ids: bool,
    ) -> Self {
        Command::Emit {
            tuple,
            anchors,
            stream,
            task,
            need_task_ids: (!need_task_ids).then_some(false),
        }
    }

    /// Build an `ack` command.
    pub fn ack(id: impl Into<String>) -> Self {
        Command::Ack { id: id.into() }
    }

    /// Build a `fail` command.
    pub fn fail(id: impl Into<String>) -> Self {
        Command::Fail { id: id.into() }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Emit { .. } => "emit",
            Command::Ack { .. } => "ack",
            Command::Fail { .. } => "fail",
            Command::Sync => "sync",
            Command::Log { .. } => "log",
        }
    }

    /// Whether the orchestrator answers this command with a task-id list.
    pub fn expects_task_ids(&self) -> bool {
        matches!(
            self,
            Command::Emit {
                task: None,
                need_task_ids: None,
                ..
            }
        )
    }
}

/// Severity of a `log` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Numeric level used on the wire.
    pub fn as_u8(self) -> u8 {
        match self {
            LogLevel::Trace => 0,
            LogLevel::Debug => 1,
            LogLevel::Info => 2,
            LogLevel::Warn => 3,
            LogLevel::Error => 4,
        }
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(LogLevel::Trace),
            1 => Ok(LogLevel::Debug),
            2 => Ok(LogLevel::Info),
            3 => Ok(LogLevel::Warn),
            4 => Ok(LogLevel::Error),
            other => Err(other),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        LogLevel::try_from(raw)
            .map_err(|v| serde::de::Error::custom(format!("invalid log level: {v}")))
    }
}

/// Result of the initial exchange with the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Handshake {
    /// Topology configuration merged with the worker's cluster configuration.
    pub config: Map<String, Value>,
    /// Placement of this component: task ids, inputs, outputs.
    pub context: Map<String, Value>,
}

impl Handshake {
    pub fn new(config: Map<String, Value>, context: Map<String, Value>) -> Self {
        Self { config, context }
    }
}
