// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inbound work items and the references used to acknowledge them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task id the orchestrator uses on heartbeat tuples.
pub const HEARTBEAT_TASK: i64 = -1;

/// Stream carrying heartbeat tuples.
pub const HEARTBEAT_STREAM: &str = "__heartbeat";

/// Component that emits tick tuples.
pub const SYSTEM_COMPONENT: &str = "__system";

/// Stream carrying tick tuples.
pub const TICK_STREAM: &str = "__tick";

/// One unit of input delivered by the orchestrator.
///
/// Decoded from the wire shape
/// `{"id": "...", "comp": "...", "stream": "...", "task": 3, "tuple": [...]}`.
/// Immutable once decoded; the runtime only ever holds clones of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    /// Opaque id used for ack/fail and anchoring.
    #[serde(default)]
    pub id: String,
    /// Name of the component that produced the tuple.
    #[serde(rename = "comp")]
    pub component: String,
    /// Logical stream the tuple arrived on.
    pub stream: String,
    /// Task id of the producer.
    pub task: i64,
    /// Ordered tuple values.
    #[serde(rename = "tuple", default)]
    pub values: Vec<Value>,
}

impl Tuple {
    /// Build a tuple from its parts.
    pub fn new(
        id: impl Into<String>,
        component: impl Into<String>,
        stream: impl Into<String>,
        task: i64,
        values: Vec<Value>,
    ) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            stream: stream.into(),
            task,
            values,
        }
    }

    /// A keepalive probe that must be answered with `sync`.
    pub fn heartbeat() -> Self {
        Self::new("", "", HEARTBEAT_STREAM, HEARTBEAT_TASK, Vec::new())
    }

    /// A timer tick carrying its frequency in seconds.
    pub fn tick(frequency: u64) -> Self {
        Self::new(
            "",
            SYSTEM_COMPONENT,
            TICK_STREAM,
            HEARTBEAT_TASK,
            vec![Value::from(frequency)],
        )
    }

    /// True for heartbeat probes (`task == -1` on the heartbeat stream).
    pub fn is_heartbeat(&self) -> bool {
        self.task == HEARTBEAT_TASK && self.stream == HEARTBEAT_STREAM
    }

    /// True for tick tuples emitted by the system component.
    pub fn is_tick(&self) -> bool {
        self.component == SYSTEM_COMPONENT && self.stream == TICK_STREAM
    }
}

/// Either a raw tuple id or a tuple whose id should be used.
///
/// Every operation that names a tuple (emit anchors, ack, fail) accepts this
/// and resolves it through [`TupleRef::id`].
#[derive(Debug, Clone, PartialEq)]
pub enum TupleRef {
    /// A bare tuple id.
    Id(String),
    /// A tuple held by the caller.
    Tuple(Tuple),
}

impl TupleRef {
    /// The wire id this reference resolves to.
    pub fn id(&self) -> &str {
        match self {
            TupleRef::Id(id) => id,
            TupleRef::Tuple(tuple) => &tuple.id,
        }
    }

    /// Consume the reference, keeping only the id.
    pub fn into_id(self) -> String {
        match self {
            TupleRef::Id(id) => id,
            TupleRef::Tuple(tuple) => tuple.id,
        }
    }
}

impl From<&str> for TupleRef {
    fn from(id: &str) -> Self {
        TupleRef::Id(id.to_string())
    }
}

impl From<String> for TupleRef {
    fn from(id: String) -> Self {
        TupleRef::Id(id)
    }
}

impl From<Tuple> for TupleRef {
    fn from(tuple: Tuple) -> Self {
        TupleRef::Tuple(tuple)
    }
}

/// Keeps only the id; the values are not copied.
impl From<&Tuple> for TupleRef {
    fn from(tuple: &Tuple) -> Self {
        TupleRef::Id(tuple.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_wire_tuple() {
        let raw = json!({
            "id": "-6955786537413359385",
            "comp": "sentence-spout",
            "stream": "default",
            "task": 9,
            "tuple": ["snow white and the seven dwarfs", 7]
        });

        let tuple: Tuple = serde_json::from_value(raw).unwrap();
        assert_eq!(tuple.id, "-6955786537413359385");
        assert_eq!(tuple.component, "sentence-spout");
        assert_eq!(tuple.stream, "default");
        assert_eq!(tuple.task, 9);
        assert_eq!(tuple.values, vec![json!("snow white and the seven dwarfs"), json!(7)]);
        assert!(!tuple.is_heartbeat());
        assert!(!tuple.is_tick());
    }

    #[test]
    fn test_decode_heartbeat_without_id() {
        let raw = json!({"comp": "", "stream": "__heartbeat", "task": -1, "tuple": []});
        let tuple: Tuple = serde_json::from_value(raw).unwrap();
        assert!(tuple.is_heartbeat());
        assert_eq!(tuple.id, "");
    }

    #[test]
    fn test_heartbeat_requires_sentinel_task() {
        let tuple = Tuple::new("1", "spout", HEARTBEAT_STREAM, 4, vec![]);
        assert!(!tuple.is_heartbeat());
    }

    #[test]
    fn test_tick_classification() {
        assert!(Tuple::tick(5).is_tick());
        assert!(!Tuple::tick(5).is_heartbeat());
        assert!(!Tuple::new("1", "spout", TICK_STREAM, 2, vec![]).is_tick());
    }

    #[test]
    fn test_tuple_ref_normalizes_to_id() {
        let tuple = Tuple::new("abc", "spout", "default", 1, vec![]);
        assert_eq!(TupleRef::from(&tuple), TupleRef::Id("abc".into()));
        assert_eq!(TupleRef::from(&tuple).id(), "abc");
        assert_eq!(TupleRef::from("xyz").id(), "xyz");
        assert_eq!(TupleRef::from(tuple).into_id(), "abc");
    }
}
