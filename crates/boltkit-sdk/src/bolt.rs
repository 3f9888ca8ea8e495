// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! User-implemented hooks.

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use boltkit_protocol::{Handshake, Tuple};

use crate::context::BoltContext;
use crate::error::Result;

/// A bolt that processes one tuple at a time.
///
/// # Example
///
/// ```ignore
/// use boltkit_sdk::{Bolt, BoltContext, Result, Tuple};
///
/// struct SentenceSplitter;
///
/// #[async_trait::async_trait]
/// impl Bolt for SentenceSplitter {
///     async fn process(&mut self, ctx: &BoltContext<'_>, tuple: &Tuple) -> Result<()> {
///         let sentence = tuple.values[0].as_str().unwrap_or_default();
///         for word in sentence.split(' ') {
///             ctx.emit(vec![word]).await?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Bolt: Send {
    /// Called once after the handshake, before the first tuple is read.
    async fn initialize(&mut self, _handshake: &Handshake) -> Result<()> {
        Ok(())
    }

    /// Process one data tuple. With `auto_ack` on, the tuple is acked once
    /// this returns `Ok`.
    async fn process(&mut self, ctx: &BoltContext<'_>, tuple: &Tuple) -> Result<()>;

    /// React to a tick. Ignored by default.
    async fn process_tick(&mut self, _ctx: &BoltContext<'_>, _frequency: u64) -> Result<()> {
        Ok(())
    }
}

/// A bolt that buffers tuples into keyed groups and processes each group
/// once enough ticks have passed.
///
/// Requires the topology to send tick tuples. Ack and fail are deferred until
/// the group is flushed; emits inside `process_batch` never wait for task ids.
#[async_trait]
pub trait BatchingBolt: Send {
    /// Group key type.
    type Key: Hash + Eq + Clone + Debug + Send + Sync;

    /// Called once after the handshake, before the first tuple is read.
    async fn initialize(&mut self, _handshake: &Handshake) -> Result<()> {
        Ok(())
    }

    /// Group a tuple. `None` (the default) puts everything in one batch.
    fn group_key(&self, _tuple: &Tuple) -> Option<Self::Key> {
        None
    }

    /// Process every tuple collected for `key` since the last flush.
    async fn process_batch(
        &mut self,
        ctx: &BoltContext<'_>,
        key: Option<&Self::Key>,
        tuples: &[Tuple],
    ) -> Result<()>;
}
