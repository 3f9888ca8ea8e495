// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! boltkit SDK - worker-side runtime for multilang bolts.
//!
//! A bolt process is fed tuples by an orchestrator and answers with emits,
//! acks and fails. This crate owns the control logic of that process; the
//! transport that frames messages on the wire is supplied by the caller as
//! a [`Transport`].
//!
//! # Features
//!
//! - **Run loop**: handshake, `initialize`, then read/dispatch forever
//! - **Heartbeats**: answered with `sync` without touching user code
//! - **Ticks**: delivered to `process_tick`, or used to drive batch flushes
//! - **Emit/ack/fail**: auto-anchoring, auto-ack and auto-fail policies
//! - **Batching**: keyed groups flushed every N ticks with deferred acks
//! - **Crash-only failures**: one catch point that fails what is in flight
//!   and hands back a [`Termination`] for the process to exit on
//!
//! # Quick Start
//!
//! ```ignore
//! use boltkit_sdk::{Bolt, BoltConfig, BoltContext, BoltRunner, Result, Tuple};
//!
//! struct SentenceSplitter;
//!
//! #[async_trait::async_trait]
//! impl Bolt for SentenceSplitter {
//!     async fn process(&mut self, ctx: &BoltContext<'_>, tuple: &Tuple) -> Result<()> {
//!         let sentence = tuple.values[0].as_str().unwrap_or_default();
//!         for word in sentence.split(' ') {
//!             ctx.emit(vec![word]).await?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> boltkit_sdk::Result<()> {
//!     boltkit_sdk::telemetry::init_subscriber()?;
//!     let runner = BoltRunner::new(transport, BoltConfig::from_env()?);
//!     runner.run(SentenceSplitter).await.exit()
//! }
//! ```
//!
//! # Batching
//!
//! ```ignore
//! struct WordCounter;
//!
//! #[async_trait::async_trait]
//! impl BatchingBolt for WordCounter {
//!     type Key = String;
//!
//!     fn group_key(&self, tuple: &Tuple) -> Option<String> {
//!         tuple.values[0].as_str().map(str::to_string)
//!     }
//!
//!     async fn process_batch(
//!         &mut self,
//!         ctx: &BoltContext<'_>,
//!         key: Option<&String>,
//!         tuples: &[Tuple],
//!     ) -> Result<()> {
//!         ctx.emit((key, tuples.len())).await?;
//!         Ok(())
//!     }
//! }
//!
//! // Flush once more than 5 ticks have arrived since the last flush.
//! let config = BoltConfig::new().with_ticks_between_batches(5);
//! BoltRunner::new(transport, config).run_batching(WordCounter).await.exit();
//! ```
//!
//! # Configuration
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BOLTKIT_AUTO_ANCHOR` | `true` | Anchor emits to in-flight tuples |
//! | `BOLTKIT_AUTO_ACK` | `true` | Ack after successful processing |
//! | `BOLTKIT_AUTO_FAIL` | `true` | Fail in-flight tuples on error |
//! | `BOLTKIT_TICKS_BETWEEN_BATCHES` | `1` | Batch flush threshold |

mod batching;
mod bolt;
mod config;
mod context;
mod emitter;
mod error;
mod runner;
mod wire;

pub mod telemetry;

pub use bolt::{BatchingBolt, Bolt};
pub use config::BoltConfig;
pub use context::BoltContext;
pub use emitter::{EmitOptions, Emitter};
pub use error::{BoltError, Result};
pub use runner::{BoltRunner, LifecycleState, Termination};
pub use wire::WireLock;

pub use boltkit_protocol::{Command, Handshake, LogLevel, ProtocolError, Transport, Tuple, TupleRef};
