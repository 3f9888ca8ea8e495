// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The bolt lifecycle: handshake, initialize, then read and dispatch forever.
//!
//! ## Dispatch
//!
//! ```text
//! read_tuple()
//!   ├─ task == -1 && stream == "__heartbeat"      → sync
//!   ├─ comp == "__system" && stream == "__tick"   → on_tick(frequency)
//!   └─ otherwise                                  → on_tuple(tuple)
//! clear in-flight
//! ```
//!
//! ## Rules
//! - The in-flight set is cleared after every dispatch, before the next read,
//!   so a failing read is never blamed on the tuple just finished.
//! - There is exactly one catch point, around a full dispatch. It logs,
//!   reports and fails whatever is still identifiable as in flight, and
//!   returns a [`Termination`]. No retry happens in-process.
//! - The loop never ends successfully; the caller exits with
//!   [`Termination::exit_code`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use boltkit_protocol::{Handshake, Transport, Tuple};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::batching::BatchDispatch;
use crate::bolt::{BatchingBolt, Bolt};
use crate::config::BoltConfig;
use crate::context::{BoltContext, InFlight};
use crate::emitter::Emitter;
use crate::error::{BoltError, Result};

/// Where the runner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, handshake not yet read
    Uninitialized,
    /// Reading the handshake and running `initialize`
    Initializing,
    /// In the main loop
    Running,
    /// Stopped after an unhandled error
    Terminated,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Running => "running",
            LifecycleState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a run.
///
/// The runner never exits the process itself; the binary decides, normally
/// via [`Termination::exit`].
#[derive(Debug)]
pub struct Termination {
    /// State the runner was in when the error escaped.
    pub phase: LifecycleState,
    /// The error that ended the run.
    pub error: BoltError,
}

impl Termination {
    /// Process exit status for an unhandled error.
    pub const EXIT_CODE: i32 = 1;

    pub fn exit_code(&self) -> i32 {
        Self::EXIT_CODE
    }

    /// Exit the process with [`Termination::EXIT_CODE`].
    pub fn exit(self) -> ! {
        std::process::exit(self.exit_code())
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bolt terminated while {}: {}", self.phase, self.error)
    }
}

/// Runtime state shared by the loop and the dispatch strategy.
pub(crate) struct Session {
    pub(crate) emitter: Emitter,
    pub(crate) config: BoltConfig,
    pub(crate) in_flight: InFlight,
}

impl Session {
    /// Context exposing the current in-flight tuples to a hook.
    pub(crate) fn context(&self, fire_and_forget: bool) -> BoltContext<'_> {
        BoltContext::new(
            &self.emitter,
            &self.config,
            self.in_flight.as_slice(),
            fire_and_forget,
        )
    }
}

/// How inbound tuples, ticks and failures are handled.
#[async_trait]
pub(crate) trait Dispatch: Send {
    fn mode(&self) -> &'static str;

    async fn initialize(&mut self, handshake: &Handshake) -> Result<()>;

    async fn on_tuple(&mut self, session: &mut Session, tuple: Tuple) -> Result<()>;

    async fn on_tick(&mut self, session: &mut Session, frequency: u64) -> Result<()>;

    /// Map an unhandled error onto fail commands. Must not itself error.
    async fn on_failure(&mut self, session: &Session, error: &BoltError);
}

/// One-tuple-at-a-time dispatch.
pub(crate) struct TupleDispatch<B> {
    bolt: B,
}

#[async_trait]
impl<B: Bolt> Dispatch for TupleDispatch<B> {
    fn mode(&self) -> &'static str {
        "tuple"
    }

    async fn initialize(&mut self, handshake: &Handshake) -> Result<()> {
        self.bolt.initialize(handshake).await
    }

    async fn on_tuple(&mut self, session: &mut Session, tuple: Tuple) -> Result<()> {
        session.in_flight.replace(vec![tuple.clone()]);
        let ctx = session.context(false);
        self.bolt.process(&ctx, &tuple).await?;
        if session.config.auto_ack {
            session.emitter.ack(&tuple).await?;
        }
        Ok(())
    }

    async fn on_tick(&mut self, session: &mut Session, frequency: u64) -> Result<()> {
        let ctx = session.context(false);
        self.bolt.process_tick(&ctx, frequency).await
    }

    async fn on_failure(&mut self, session: &Session, error: &BoltError) {
        let [tuple] = session.in_flight.as_slice() else {
            error!(error = %error, mode = self.mode(), "Unhandled error in bolt run loop");
            return;
        };

        error!(
            error = %error,
            mode = self.mode(),
            tuple_id = %tuple.id,
            component = %tuple.component,
            stream = %tuple.stream,
            "Unhandled error in bolt run loop while processing tuple"
        );

        if let Err(e) = session
            .emitter
            .raise_exception(&error.to_string(), std::slice::from_ref(tuple))
            .await
        {
            warn!(error = %e, "Failed to report exception");
        }
        if session.config.auto_fail
            && let Err(e) = session.emitter.fail(tuple).await
        {
            warn!(error = %e, tuple_id = %tuple.id, "Failed to fail tuple");
        }
    }
}

/// Drives a bolt over a [`Transport`].
///
/// `run` and `run_batching` consume the runner; the state it was in when
/// the run ended is reported as [`Termination::phase`].
///
/// # Example
///
/// ```ignore
/// use boltkit_sdk::{BoltConfig, BoltRunner};
///
/// #[tokio::main]
/// async fn main() -> boltkit_sdk::Result<()> {
///     boltkit_sdk::telemetry::init_subscriber()?;
///     let runner = BoltRunner::new(transport, BoltConfig::from_env()?);
///     runner.run(SentenceSplitter).await.exit()
/// }
/// ```
pub struct BoltRunner {
    config: BoltConfig,
    emitter: Emitter,
    transport: Arc<dyn Transport>,
    state: LifecycleState,
}

impl BoltRunner {
    pub fn new(transport: Arc<dyn Transport>, config: BoltConfig) -> Self {
        Self {
            config,
            emitter: Emitter::new(transport.clone()),
            transport,
            state: LifecycleState::Uninitialized,
        }
    }

    /// Policy flags this runner applies.
    pub fn config(&self) -> &BoltConfig {
        &self.config
    }

    /// An emitter sharing this runner's wire locks, for auxiliary tasks
    /// started before the loop.
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    /// Run a tuple-at-a-time bolt until an unhandled error.
    #[instrument(skip_all, fields(mode = "tuple"))]
    pub async fn run<B: Bolt>(self, bolt: B) -> Termination {
        self.drive(TupleDispatch { bolt }).await
    }

    /// Run a batching bolt until an unhandled error.
    #[instrument(skip_all, fields(mode = "batch", ticks_between_batches = self.config.ticks_between_batches))]
    pub async fn run_batching<B: BatchingBolt>(self, bolt: B) -> Termination {
        let dispatch = BatchDispatch::new(bolt, self.config.ticks_between_batches);
        self.drive(dispatch).await
    }

    async fn drive<D: Dispatch>(mut self, mut dispatch: D) -> Termination {
        let mut session = Session {
            emitter: self.emitter.clone(),
            config: self.config.clone(),
            in_flight: InFlight::default(),
        };

        self.transition(LifecycleState::Initializing);
        let handshake = match self.transport.read_handshake().await {
            Ok(handshake) => handshake,
            Err(e) => {
                let error = BoltError::from(e);
                error!(error = %error, "Handshake failed");
                return self.terminate(error);
            }
        };

        if let Err(error) = dispatch.initialize(&handshake).await {
            dispatch.on_failure(&session, &error).await;
            return self.terminate(error);
        }

        self.transition(LifecycleState::Running);
        loop {
            if let Err(error) = self.step(&mut dispatch, &mut session).await {
                dispatch.on_failure(&session, &error).await;
                return self.terminate(error);
            }
        }
    }

    /// Read and fully dispatch one inbound tuple.
    async fn step<D: Dispatch>(&self, dispatch: &mut D, session: &mut Session) -> Result<()> {
        let tuple = self.transport.read_tuple().await?;

        if tuple.is_heartbeat() {
            debug!("Heartbeat, answering with sync");
            session.emitter.sync().await?;
        } else if tuple.is_tick() {
            let frequency = tick_frequency(&tuple)?;
            debug!(frequency, "Tick");
            dispatch.on_tick(session, frequency).await?;
        } else {
            debug!(tuple_id = %tuple.id, component = %tuple.component, stream = %tuple.stream, "Tuple");
            dispatch.on_tuple(session, tuple).await?;
        }

        session.in_flight.clear();
        Ok(())
    }

    fn transition(&mut self, next: LifecycleState) {
        info!(from = %self.state, to = %next, "Bolt lifecycle transition");
        self.state = next;
    }

    fn terminate(mut self, error: BoltError) -> Termination {
        let phase = self.state;
        self.transition(LifecycleState::Terminated);
        Termination { phase, error }
    }
}

/// The tick frequency carried as the first value of a tick tuple.
fn tick_frequency(tuple: &Tuple) -> Result<u64> {
    tuple
        .values
        .first()
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            BoltError::MalformedTick(format!(
                "expected an integer frequency, got {:?}",
                tuple.values
            ))
        })
}
