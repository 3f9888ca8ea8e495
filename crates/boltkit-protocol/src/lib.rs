// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! boltkit Protocol - wire types for multilang bolts
//!
//! This crate describes what crosses the boundary between a bolt worker and
//! the orchestrator that feeds it:
//!
//! - [`Tuple`]: an inbound work item (data, heartbeat or tick)
//! - [`Command`]: an outbound `emit` / `ack` / `fail` / `sync` / `log`
//! - [`Handshake`]: configuration and placement context
//! - [`Transport`]: the collaborator that actually moves messages
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    boltkit-sdk                              │
//! │        run loop · emit/ack/fail · batching                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    boltkit-protocol                         │
//! │        Tuple · Command · Handshake · Transport              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Framing: newline-delimited JSON on stdin/stdout (external) │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing
//!
//! With the `test-utils` feature, [`memory::MemoryTransport`] scripts inbound
//! tuples and task-id responses and records every command written.

pub mod error;
pub mod message;
pub mod transport;
pub mod tuple;

#[cfg(feature = "test-utils")]
pub mod memory;

pub use error::{ProtocolError, Result};
pub use message::{Command, Handshake, LogLevel};
pub use transport::Transport;
pub use tuple::{
    HEARTBEAT_STREAM, HEARTBEAT_TASK, SYSTEM_COMPONENT, TICK_STREAM, Tuple, TupleRef,
};

#[cfg(feature = "test-utils")]
pub use memory::{MemoryTransport, WireEvent};
