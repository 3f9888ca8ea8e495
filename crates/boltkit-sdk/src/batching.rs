// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tick-driven batching on top of the run loop.
//!
//! Data tuples are appended to the group chosen by
//! [`BatchingBolt::group_key`]; nothing is acked on arrival. Each tick bumps a
//! counter, and once the counter exceeds `ticks_between_batches` and at least
//! one group is non-empty, every group is flushed in first-seen order:
//!
//! ```text
//! for each group:
//!     in-flight = group
//!     process_batch(key, group)
//!     ack every tuple           (auto_ack)
//!     empty the group           (acked groups are never failed later)
//! drop all groups, counter = 0
//! ```
//!
//! On an unhandled error, the in-flight group is reported and every tuple
//! still buffered in any group is failed (auto_fail).

use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use boltkit_protocol::{Handshake, Tuple};
use tracing::{debug, error, warn};

use crate::bolt::BatchingBolt;
use crate::error::{BoltError, Result};
use crate::runner::{Dispatch, Session};

/// Keyed groups of buffered tuples, in the order keys were first seen.
#[derive(Debug)]
pub(crate) struct BatchBuffer<K> {
    groups: Vec<(Option<K>, Vec<Tuple>)>,
    index: HashMap<Option<K>, usize>,
}

impl<K> Default for BatchBuffer<K> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> BatchBuffer<K> {
    /// Append `tuple` to the group for `key`.
    pub(crate) fn push(&mut self, key: Option<K>, tuple: Tuple) {
        match self.index.get(&key) {
            Some(&slot) => self.groups[slot].1.push(tuple),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, vec![tuple]));
            }
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.groups.iter().any(|(_, tuples)| !tuples.is_empty())
    }

    pub(crate) fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn group(&self, slot: usize) -> Option<(Option<&K>, &[Tuple])> {
        self.groups
            .get(slot)
            .map(|(key, tuples)| (key.as_ref(), tuples.as_slice()))
    }

    /// Mark a flushed group as done by emptying it.
    pub(crate) fn clear_group(&mut self, slot: usize) {
        if let Some((_, tuples)) = self.groups.get_mut(slot) {
            *tuples = Vec::new();
        }
    }

    /// Every tuple still buffered, across all groups.
    pub(crate) fn pending(&self) -> impl Iterator<Item = &Tuple> {
        self.groups.iter().flat_map(|(_, tuples)| tuples.iter())
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dispatch strategy for [`BatchingBolt`]s.
pub(crate) struct BatchDispatch<B: BatchingBolt> {
    bolt: B,
    ticks_between_batches: u64,
    tick_counter: u64,
    batches: BatchBuffer<B::Key>,
}

impl<B: BatchingBolt> BatchDispatch<B> {
    pub(crate) fn new(bolt: B, ticks_between_batches: u64) -> Self {
        Self {
            bolt,
            ticks_between_batches,
            tick_counter: 0,
            batches: BatchBuffer::default(),
        }
    }

    async fn flush(&mut self, session: &mut Session) -> Result<()> {
        debug!(
            groups = self.batches.group_count(),
            ticks = self.tick_counter,
            "Flushing batches"
        );

        for slot in 0..self.batches.group_count() {
            let Some((key, tuples)) = self.batches.group(slot) else {
                continue;
            };
            if tuples.is_empty() {
                continue;
            }
            let key = key.cloned();
            let tuples = tuples.to_vec();

            session.in_flight.replace(tuples.clone());
            let ctx = session.context(true);
            self.bolt.process_batch(&ctx, key.as_ref(), &tuples).await?;

            if session.config.auto_ack {
                for tuple in &tuples {
                    session.emitter.ack(tuple).await?;
                }
            }
            self.batches.clear_group(slot);
            debug!(key = ?key, size = tuples.len(), "Batch processed");
        }

        self.batches.reset();
        self.tick_counter = 0;
        Ok(())
    }
}

#[async_trait]
impl<B: BatchingBolt> Dispatch for BatchDispatch<B> {
    fn mode(&self) -> &'static str {
        "batch"
    }

    async fn initialize(&mut self, handshake: &Handshake) -> Result<()> {
        self.bolt.initialize(handshake).await
    }

    async fn on_tuple(&mut self, _session: &mut Session, tuple: Tuple) -> Result<()> {
        let key = self.bolt.group_key(&tuple);
        self.batches.push(key, tuple);
        Ok(())
    }

    async fn on_tick(&mut self, session: &mut Session, _frequency: u64) -> Result<()> {
        self.tick_counter += 1;
        if self.tick_counter <= self.ticks_between_batches || !self.batches.has_pending() {
            return Ok(());
        }
        self.flush(session).await
    }

    async fn on_failure(&mut self, session: &Session, error: &BoltError) {
        let in_flight = session.in_flight.as_slice();
        error!(
            error = %error,
            mode = self.mode(),
            batch = ?session.in_flight.ids(),
            "Unhandled error in bolt run loop while processing tuple batch"
        );

        if let Err(e) = session
            .emitter
            .raise_exception(&error.to_string(), in_flight)
            .await
        {
            warn!(error = %e, "Failed to report exception");
        }

        if session.config.auto_fail {
            for tuple in self.batches.pending() {
                if let Err(e) = session.emitter.fail(tuple).await {
                    warn!(error = %e, tuple_id = %tuple.id, "Failed to fail tuple");
                }
            }
        }
    }
}
