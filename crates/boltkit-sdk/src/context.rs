// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The view of the runtime a hook receives.

use boltkit_protocol::{LogLevel, Tuple, TupleRef};
use serde::Serialize;

use crate::config::BoltConfig;
use crate::emitter::{EmitOptions, Emitter, tuple_values};
use crate::error::Result;

/// Tuples currently being processed by the main loop.
///
/// Owned by the run loop; replaced wholesale on every transition so no
/// iteration ever observes another's contents.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    tuples: Vec<Tuple>,
}

impl InFlight {
    pub(crate) fn replace(&mut self, tuples: Vec<Tuple>) {
        self.tuples = tuples;
    }

    pub(crate) fn clear(&mut self) {
        self.tuples = Vec::new();
    }

    pub(crate) fn as_slice(&self) -> &[Tuple] {
        &self.tuples
    }

    pub(crate) fn ids(&self) -> Vec<&str> {
        self.tuples.iter().map(|t| t.id.as_str()).collect()
    }
}

/// Per-dispatch handle passed to every hook.
///
/// Emits through the context get default anchors (the in-flight tuples,
/// when `auto_anchor` is on). Inside a batching bolt every emit is
/// fire-and-forget and returns `None`.
pub struct BoltContext<'a> {
    emitter: &'a Emitter,
    config: &'a BoltConfig,
    in_flight: &'a [Tuple],
    fire_and_forget: bool,
}

impl<'a> BoltContext<'a> {
    pub(crate) fn new(
        emitter: &'a Emitter,
        config: &'a BoltConfig,
        in_flight: &'a [Tuple],
        fire_and_forget: bool,
    ) -> Self {
        Self {
            emitter,
            config,
            in_flight,
            fire_and_forget,
        }
    }

    /// Tuples the current dispatch is working on.
    pub fn in_flight(&self) -> &[Tuple] {
        self.in_flight
    }

    /// Active policy flags.
    pub fn config(&self) -> &BoltConfig {
        self.config
    }

    /// A detached emitter for auxiliary tasks.
    ///
    /// Inside a batching bolt the handle keeps the fire-and-forget rule, so
    /// its emits return `None` too.
    pub fn emitter(&self) -> Emitter {
        self.emitter
            .clone()
            .with_fire_and_forget(self.fire_and_forget)
    }

    /// Emit to the default stream with default options.
    pub async fn emit<T: Serialize>(&self, payload: T) -> Result<Option<Vec<i64>>> {
        self.emit_with(payload, EmitOptions::new()).await
    }

    /// Emit with explicit options.
    pub async fn emit_with<T: Serialize>(
        &self,
        payload: T,
        options: EmitOptions,
    ) -> Result<Option<Vec<i64>>> {
        let values = tuple_values(&payload)?;
        self.emitter
            .emit_values(values, self.resolve(options))
            .await
    }

    /// Emit several tuples in order with the same options.
    ///
    /// Not atomic: a failure leaves earlier emits already sent.
    pub async fn emit_many<T: Serialize>(
        &self,
        payloads: Vec<T>,
        options: EmitOptions,
    ) -> Result<Vec<Option<Vec<i64>>>> {
        let mut all_task_ids = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            all_task_ids.push(self.emit_with(payload, options.clone()).await?);
        }
        Ok(all_task_ids)
    }

    /// Acknowledge a tuple.
    pub async fn ack(&self, tuple: impl Into<TupleRef>) -> Result<()> {
        self.emitter.ack(tuple).await
    }

    /// Fail a tuple.
    pub async fn fail(&self, tuple: impl Into<TupleRef>) -> Result<()> {
        self.emitter.fail(tuple).await
    }

    /// Write a message to the orchestrator's log.
    pub async fn log(&self, msg: impl Into<String>, level: Option<LogLevel>) -> Result<()> {
        self.emitter.log(msg, level).await
    }

    fn resolve(&self, mut options: EmitOptions) -> EmitOptions {
        if options.anchors.is_none() && self.config.auto_anchor {
            options.anchors = Some(
                self.in_flight
                    .iter()
                    .map(|t| TupleRef::Id(t.id.clone()))
                    .collect(),
            );
        }
        if self.fire_and_forget {
            options.need_task_ids = false;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use boltkit_protocol::{Command, MemoryTransport};
    use serde_json::json;

    fn tuple(id: &str) -> Tuple {
        Tuple::new(id, "spout", "default", 1, vec![json!(id)])
    }

    fn anchors_of(command: &Command) -> Vec<String> {
        match command {
            Command::Emit { anchors, .. } => anchors.clone(),
            other => panic!("expected emit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auto_anchor_uses_in_flight() {
        let transport = Arc::new(MemoryTransport::new().with_task_ids([vec![1]]));
        let emitter = Emitter::new(transport.clone());
        let config = BoltConfig::default();
        let in_flight = vec![tuple("t1")];
        let ctx = BoltContext::new(&emitter, &config, &in_flight, false);

        ctx.emit(vec!["out"]).await.unwrap();

        assert_eq!(anchors_of(&transport.sent().await[0]), vec!["t1"]);
    }

    #[tokio::test]
    async fn test_auto_anchor_disabled_sends_no_anchors() {
        let transport = Arc::new(MemoryTransport::new().with_task_ids([vec![1]]));
        let emitter = Emitter::new(transport.clone());
        let config = BoltConfig::default().with_auto_anchor(false);
        let in_flight = vec![tuple("t1")];
        let ctx = BoltContext::new(&emitter, &config, &in_flight, false);

        ctx.emit(vec!["out"]).await.unwrap();

        assert!(anchors_of(&transport.sent().await[0]).is_empty());
    }

    #[tokio::test]
    async fn test_explicit_anchors_win() {
        let transport = Arc::new(MemoryTransport::new());
        let emitter = Emitter::new(transport.clone());
        let config = BoltConfig::default();
        let in_flight = vec![tuple("t1")];
        let ctx = BoltContext::new(&emitter, &config, &in_flight, false);

        ctx.emit_with(
            vec!["out"],
            EmitOptions::new()
                .anchors(Vec::<TupleRef>::new())
                .need_task_ids(false),
        )
        .await
        .unwrap();

        assert!(anchors_of(&transport.sent().await[0]).is_empty());
    }

    #[tokio::test]
    async fn test_fire_and_forget_overrides_need_task_ids() {
        let transport = Arc::new(MemoryTransport::new());
        let emitter = Emitter::new(transport.clone());
        let config = BoltConfig::default();
        let in_flight = vec![tuple("a"), tuple("b")];
        let ctx = BoltContext::new(&emitter, &config, &in_flight, true);

        let single = ctx
            .emit_with(vec![1], EmitOptions::new().need_task_ids(true))
            .await
            .unwrap();
        let many = ctx
            .emit_many(vec![vec![2], vec![3]], EmitOptions::new())
            .await
            .unwrap();

        assert_eq!(single, None);
        assert_eq!(many, vec![None, None]);
        assert_eq!(transport.task_id_reads().await, 0);
        for command in transport.sent().await {
            assert_eq!(anchors_of(&command), vec!["a", "b"]);
        }
    }

    #[tokio::test]
    async fn test_detached_emitter_keeps_fire_and_forget() {
        let transport = Arc::new(MemoryTransport::new().with_responder(|_| vec![5]));
        let emitter = Emitter::new(transport.clone());
        let config = BoltConfig::default();
        let in_flight = vec![tuple("a")];

        let batch = BoltContext::new(&emitter, &config, &in_flight, true).emitter();
        assert!(batch.is_fire_and_forget());
        let ids = batch.emit(vec![1], EmitOptions::new()).await.unwrap();
        assert_eq!(ids, None);
        assert_eq!(transport.task_id_reads().await, 0);
        assert_eq!(
            transport.sent().await,
            vec![Command::emit(vec![json!(1)], vec![], None, None, false)]
        );

        let single = BoltContext::new(&emitter, &config, &in_flight, false).emitter();
        assert!(!single.is_fire_and_forget());
        let ids = single.emit(vec![2], EmitOptions::new()).await.unwrap();
        assert_eq!(ids, Some(vec![5]));
        assert_eq!(transport.task_id_reads().await, 1);
    }

    #[test]
    fn test_in_flight_replace_and_clear() {
        let mut in_flight = InFlight::default();
        in_flight.replace(vec![tuple("x"), tuple("y")]);
        assert_eq!(in_flight.ids(), vec!["x", "y"]);

        in_flight.clear();
        assert!(in_flight.as_slice().is_empty());
    }
}
