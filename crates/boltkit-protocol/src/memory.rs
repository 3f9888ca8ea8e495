// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scripted in-memory transport for tests.
//!
//! Inbound tuples and task-id responses are queued up front; everything the
//! bolt writes is recorded in order. Once the inbound script is drained,
//! `read_tuple` reports [`ProtocolError::ConnectionClosed`], which ends a
//! run loop deterministically.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{ProtocolError, Result};
use crate::message::{Command, Handshake};
use crate::transport::Transport;
use crate::tuple::Tuple;

type Responder = Arc<dyn Fn(&Command) -> Vec<i64> + Send + Sync>;

/// Everything that crossed the transport, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    /// A command written by the bolt.
    Sent(Command),
    /// A task-id response consumed by the bolt.
    TaskIdsRead(Vec<i64>),
    /// An exception reported through the diagnostic channel.
    Exception { error: String, tuple_ids: Vec<String> },
}

#[derive(Default)]
struct State {
    inbound: VecDeque<Tuple>,
    task_ids: VecDeque<Vec<i64>>,
    events: Vec<WireEvent>,
}

/// In-memory [`Transport`] driven by a script.
pub struct MemoryTransport {
    handshake: Handshake,
    responder: Option<Responder>,
    state: Mutex<State>,
}

impl MemoryTransport {
    /// Transport with an empty handshake and no scripted input.
    pub fn new() -> Self {
        Self {
            handshake: Handshake::default(),
            responder: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Use the given handshake.
    pub fn with_handshake(mut self, handshake: Handshake) -> Self {
        self.handshake = handshake;
        self
    }

    /// Queue inbound tuples.
    pub fn with_tuples(mut self, tuples: impl IntoIterator<Item = Tuple>) -> Self {
        self.state.get_mut().inbound.extend(tuples);
        self
    }

    /// Queue task-id responses, consumed in order by `read_task_ids`.
    pub fn with_task_ids(mut self, responses: impl IntoIterator<Item = Vec<i64>>) -> Self {
        self.state.get_mut().task_ids.extend(responses);
        self
    }

    /// Answer every emit that expects task ids with `responder(command)`.
    ///
    /// The response is queued at the moment the emit is written, so it
    /// models an orchestrator replying in write order.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&Command) -> Vec<i64> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Every event recorded so far.
    pub async fn events(&self) -> Vec<WireEvent> {
        self.state.lock().await.events.clone()
    }

    /// Only the commands written by the bolt.
    pub async fn sent(&self) -> Vec<Command> {
        self.state
            .lock()
            .await
            .events
            .iter()
            .filter_map(|event| match event {
                WireEvent::Sent(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of task-id responses consumed.
    pub async fn task_id_reads(&self) -> usize {
        self.state
            .lock()
            .await
            .events
            .iter()
            .filter(|event| matches!(event, WireEvent::TaskIdsRead(_)))
            .count()
    }

    /// Reported exceptions as `(error, tuple ids)`.
    pub async fn exceptions(&self) -> Vec<(String, Vec<String>)> {
        self.state
            .lock()
            .await
            .events
            .iter()
            .filter_map(|event| match event {
                WireEvent::Exception { error, tuple_ids } => {
                    Some((error.clone(), tuple_ids.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Ids of acked tuples, in order.
    pub async fn acked(&self) -> Vec<String> {
        self.sent()
            .await
            .into_iter()
            .filter_map(|command| match command {
                Command::Ack { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Ids of failed tuples, in order.
    pub async fn failed(&self) -> Vec<String> {
        self.sent()
            .await
            .into_iter()
            .filter_map(|command| match command {
                Command::Fail { id } => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_handshake(&self) -> Result<Handshake> {
        Ok(self.handshake.clone())
    }

    async fn read_tuple(&self) -> Result<Tuple> {
        tokio::task::yield_now().await;
        self.state
            .lock()
            .await
            .inbound
            .pop_front()
            .ok_or(ProtocolError::ConnectionClosed)
    }

    async fn send_message(&self, command: &Command) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.events.push(WireEvent::Sent(command.clone()));
            if let Some(responder) = &self.responder
                && command.expects_task_ids()
            {
                state.task_ids.push_back(responder(command));
            }
        }
        // Give concurrent emitters a chance to interleave.
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn read_task_ids(&self) -> Result<Vec<i64>> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        let ids = state.task_ids.pop_front().ok_or_else(|| {
            ProtocolError::UnexpectedMessage("no task ids pending".to_string())
        })?;
        state.events.push(WireEvent::TaskIdsRead(ids.clone()));
        Ok(ids)
    }

    async fn raise_exception(&self, error: &str, tuples: &[Tuple]) -> Result<()> {
        self.state.lock().await.events.push(WireEvent::Exception {
            error: error.to_string(),
            tuple_ids: tuples.iter().map(|t| t.id.clone()).collect(),
        });
        Ok(())
    }
}
