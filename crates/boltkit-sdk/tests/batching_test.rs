// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for tick-driven batching.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use boltkit_protocol::MemoryTransport;
use boltkit_sdk::{
    BatchingBolt, BoltConfig, BoltContext, BoltError, BoltRunner, Command, EmitOptions, Result,
    Tuple,
};
use serde_json::json;

fn word(id: &str, w: &str) -> Tuple {
    Tuple::new(id, "word-spout", "default", 2, vec![json!(w), json!(1)])
}

type BatchLog = Arc<Mutex<Vec<(Option<String>, Vec<String>)>>>;

/// Groups by the first value when `by_word` is set; fails the batch whose
/// key is `fail_on`.
struct Counter {
    by_word: bool,
    fail_on: Option<String>,
    batches: BatchLog,
    emit_results: Arc<Mutex<Vec<Option<Vec<i64>>>>>,
}

impl Counter {
    fn single() -> (Self, BatchLog) {
        Self::build(false, None)
    }

    fn by_word(fail_on: Option<&str>) -> (Self, BatchLog) {
        Self::build(true, fail_on.map(str::to_string))
    }

    fn build(by_word: bool, fail_on: Option<String>) -> (Self, BatchLog) {
        let batches = BatchLog::default();
        (
            Self {
                by_word,
                fail_on,
                batches: batches.clone(),
                emit_results: Arc::default(),
            },
            batches,
        )
    }
}

#[async_trait]
impl BatchingBolt for Counter {
    type Key = String;

    fn group_key(&self, tuple: &Tuple) -> Option<String> {
        if !self.by_word {
            return None;
        }
        tuple.values[0].as_str().map(str::to_string)
    }

    async fn process_batch(
        &mut self,
        ctx: &BoltContext<'_>,
        key: Option<&String>,
        tuples: &[Tuple],
    ) -> Result<()> {
        self.batches.lock().unwrap().push((
            key.cloned(),
            tuples.iter().map(|t| t.id.clone()).collect(),
        ));
        if key.is_some() && key == self.fail_on.as_ref() {
            return Err(BoltError::processing(format!("bad batch {:?}", key)));
        }
        let result = ctx.emit((key, tuples.len())).await?;
        self.emit_results.lock().unwrap().push(result);
        Ok(())
    }
}

fn config(ticks: u64) -> BoltConfig {
    BoltConfig::default().with_ticks_between_batches(ticks)
}

#[tokio::test]
async fn test_no_ack_on_arrival() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([word("t1", "a"), word("t2", "b")]));
    let (bolt, batches) = Counter::single();

    BoltRunner::new(transport.clone(), config(1))
        .run_batching(bolt)
        .await;

    // The only commands are the fails sent when the connection drops.
    assert!(transport.acked().await.is_empty());
    assert_eq!(transport.failed().await, vec!["t1", "t2"]);
    assert!(batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_flush_until_threshold_exceeded() {
    // Threshold 2: two ticks reach it but do not exceed it.
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        word("t2", "a"),
        word("t3", "a"),
        Tuple::tick(1),
        Tuple::tick(1),
    ]));
    let (bolt, batches) = Counter::single();

    BoltRunner::new(transport.clone(), config(2))
        .run_batching(bolt)
        .await;

    assert!(batches.lock().unwrap().is_empty());
    assert!(transport.acked().await.is_empty());
}

#[tokio::test]
async fn test_single_default_group_flush() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        word("t2", "b"),
        word("t3", "c"),
        Tuple::tick(1),
        Tuple::tick(1),
        Tuple::tick(1),
    ]));
    let (bolt, batches) = Counter::single();

    BoltRunner::new(transport.clone(), config(2))
        .run_batching(bolt)
        .await;

    assert_eq!(
        *batches.lock().unwrap(),
        vec![(None, vec!["t1".into(), "t2".into(), "t3".into()])]
    );
    assert_eq!(
        transport.sent().await,
        vec![
            Command::emit(
                vec![json!(null), json!(3)],
                vec!["t1".into(), "t2".into(), "t3".into()],
                None,
                None,
                false
            ),
            Command::ack("t1"),
            Command::ack("t2"),
            Command::ack("t3"),
        ]
    );
}

#[tokio::test]
async fn test_tick_counter_resets_after_flush() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        Tuple::tick(1),
        Tuple::tick(1),
        // flushed; counter back to 0
        word("t2", "a"),
        Tuple::tick(1),
        // one tick after the reset is not enough
    ]));
    let (bolt, batches) = Counter::single();

    BoltRunner::new(transport.clone(), config(1))
        .run_batching(bolt)
        .await;

    assert_eq!(*batches.lock().unwrap(), vec![(None, vec!["t1".into()])]);
    assert_eq!(transport.acked().await, vec!["t1"]);
}

#[tokio::test]
async fn test_zero_threshold_flushes_on_every_tick() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        Tuple::tick(1),
        word("t2", "a"),
        Tuple::tick(1),
    ]));
    let (bolt, batches) = Counter::single();

    BoltRunner::new(transport.clone(), config(0))
        .run_batching(bolt)
        .await;

    assert_eq!(
        *batches.lock().unwrap(),
        vec![(None, vec!["t1".into()]), (None, vec!["t2".into()])]
    );
    assert_eq!(transport.acked().await, vec!["t1", "t2"]);
}

#[tokio::test]
async fn test_empty_ticks_keep_counting() {
    // Ticks with nothing buffered do not flush and do not reset the
    // counter, so the first tick after data arrives flushes at once.
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        Tuple::tick(1),
        Tuple::tick(1),
        Tuple::tick(1),
        word("t1", "a"),
        Tuple::tick(1),
    ]));
    let (bolt, batches) = Counter::single();

    BoltRunner::new(transport.clone(), config(2))
        .run_batching(bolt)
        .await;

    assert_eq!(*batches.lock().unwrap(), vec![(None, vec!["t1".into()])]);
}

#[tokio::test]
async fn test_grouping_by_value() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        word("t2", "b"),
        word("t3", "a"),
        word("t4", "b"),
        Tuple::tick(1),
        Tuple::tick(1),
    ]));
    let (bolt, batches) = Counter::by_word(None);

    BoltRunner::new(transport.clone(), config(1))
        .run_batching(bolt)
        .await;

    assert_eq!(
        *batches.lock().unwrap(),
        vec![
            (Some("a".into()), vec!["t1".into(), "t3".into()]),
            (Some("b".into()), vec!["t2".into(), "t4".into()]),
        ]
    );
    assert_eq!(transport.acked().await, vec!["t1", "t3", "t2", "t4"]);
}

#[tokio::test]
async fn test_batch_failure_fails_remaining_groups_only() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        word("t2", "b"),
        word("t3", "c"),
        word("t4", "b"),
        Tuple::tick(1),
        Tuple::tick(1),
    ]));
    let (bolt, batches) = Counter::by_word(Some("b"));

    let termination = BoltRunner::new(transport.clone(), config(1))
        .run_batching(bolt)
        .await;

    assert_eq!(termination.exit_code(), 1);
    assert!(matches!(termination.error, BoltError::Processing(_)));

    // "c" is never attempted.
    assert_eq!(batches.lock().unwrap().len(), 2);
    assert_eq!(transport.acked().await, vec!["t1"]);
    assert_eq!(transport.failed().await, vec!["t2", "t4", "t3"]);

    let exceptions = transport.exceptions().await;
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].1, vec!["t2", "t4"]);
}

#[tokio::test]
async fn test_batch_failure_without_auto_fail() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "b"),
        Tuple::tick(1),
        Tuple::tick(1),
    ]));
    let (bolt, _) = Counter::by_word(Some("b"));

    BoltRunner::new(transport.clone(), config(1).with_auto_fail(false))
        .run_batching(bolt)
        .await;

    assert!(transport.failed().await.is_empty());
    assert_eq!(transport.exceptions().await.len(), 1);
}

#[tokio::test]
async fn test_auto_ack_disabled_in_batches() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        Tuple::tick(1),
        Tuple::tick(1),
    ]));
    let (bolt, batches) = Counter::single();

    BoltRunner::new(transport.clone(), config(1).with_auto_ack(false))
        .run_batching(bolt)
        .await;

    assert_eq!(batches.lock().unwrap().len(), 1);
    assert!(transport.acked().await.is_empty());
}

#[tokio::test]
async fn test_batch_emits_never_read_task_ids() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        word("t2", "b"),
        Tuple::tick(1),
        Tuple::tick(1),
    ]));
    let (bolt, _) = Counter::by_word(None);
    let results = bolt.emit_results.clone();

    BoltRunner::new(transport.clone(), config(1))
        .run_batching(bolt)
        .await;

    assert_eq!(*results.lock().unwrap(), vec![None, None]);
    assert_eq!(transport.task_id_reads().await, 0);
}

#[tokio::test]
async fn test_heartbeat_in_batching_mode() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([
        word("t1", "a"),
        Tuple::heartbeat(),
    ]));
    let (bolt, batches) = Counter::single();

    BoltRunner::new(transport.clone(), config(1))
        .run_batching(bolt)
        .await;

    assert_eq!(
        transport.sent().await,
        vec![Command::Sync, Command::fail("t1")]
    );
    assert!(batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_loss_fails_buffered_tuples() {
    let transport = Arc::new(MemoryTransport::new().with_tuples([word("t1", "a"), word("t2", "b")]));
    let (bolt, _) = Counter::by_word(None);

    let termination = BoltRunner::new(transport.clone(), config(1))
        .run_batching(bolt)
        .await;

    assert!(matches!(termination.error, BoltError::Protocol(_)));
    assert_eq!(transport.failed().await, vec!["t1", "t2"]);
    assert_eq!(transport.exceptions().await[0].1, Vec::<String>::new());
}

/// Emits from a spawned task through the context's detached emitter.
struct Offloader {
    results: Arc<Mutex<Vec<Option<Vec<i64>>>>>,
}

#[async_trait]
impl BatchingBolt for Offloader {
    type Key = String;

    async fn process_batch(
        &mut self,
        ctx: &BoltContext<'_>,
        _key: Option<&String>,
        tuples: &[Tuple],
    ) -> Result<()> {
        let emitter = ctx.emitter();
        let count = tuples.len();
        let ids = tokio::spawn(async move { emitter.emit(vec![count], EmitOptions::new()).await })
            .await
            .map_err(BoltError::processing)??;
        self.results.lock().unwrap().push(ids);
        Ok(())
    }
}

#[tokio::test]
async fn test_detached_emitter_in_batch_never_reads_task_ids() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_tuples([word("t1", "a"), Tuple::tick(1), Tuple::tick(1)])
            .with_responder(|_| vec![5]),
    );
    let results = Arc::new(Mutex::new(Vec::new()));

    BoltRunner::new(transport.clone(), config(1))
        .run_batching(Offloader {
            results: results.clone(),
        })
        .await;

    assert_eq!(*results.lock().unwrap(), vec![None]);
    assert_eq!(transport.task_id_reads().await, 0);
    assert_eq!(
        transport.sent().await,
        vec![
            Command::emit(vec![json!(1)], vec![], None, None, false),
            Command::ack("t1"),
        ]
    );
}
