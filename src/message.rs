//! Tagged payloads and delivery envelopes.
//!
//! Every message moving through a workflow is a [`Payload`]: a tag naming the
//! message kind plus an arbitrary JSON value. Tags form a closed dispatch set;
//! each node declares up front which tags it accepts, and the router matches
//! deliveries against that declaration instead of inspecting value shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use crate::types::NodeId;

/// Tag carried by the batch payload a fan-in group delivers to its aggregator.
pub const BATCH_TAG: &str = "batch";

/// A tagged message payload.
///
/// The `tag` is the routing key: nodes declare the tags they accept and the
/// scheduler refuses (or drops, in lenient mode) deliveries whose tag is not
/// declared. The `value` is free-form JSON owned by the producing node.
///
/// # Examples
///
/// ```
/// use flowmesh::message::Payload;
/// use serde_json::json;
///
/// let p = Payload::text("draft", "first attempt");
/// assert_eq!(p.tag, "draft");
/// assert_eq!(p.as_str(), Some("first attempt"));
///
/// let d = Payload::json("decision", json!({"approved": false}));
/// assert_eq!(d.value["approved"], false);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub tag: String,
    pub value: Value,
}

impl Payload {
    /// Payload with a plain string value.
    pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: Value::String(text.into()),
        }
    }

    /// Payload with an arbitrary JSON value.
    pub fn json(tag: impl Into<String>, value: Value) -> Self {
        Self {
            tag: tag.into(),
            value,
        }
    }

    /// Ordered batch of payloads, as produced by a completed fan-in round.
    ///
    /// The batch carries [`BATCH_TAG`]; aggregator nodes declare that tag to
    /// receive quorum results. Part order matches the fan-in group's source
    /// declaration order, never arrival order.
    pub fn batch(parts: Vec<Payload>) -> Self {
        let items: Vec<Value> = parts
            .into_iter()
            .map(|p| json!({"tag": p.tag, "value": p.value}))
            .collect();
        Self {
            tag: BATCH_TAG.to_string(),
            value: Value::Array(items),
        }
    }

    /// String view of the value, when it is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Decode a batch payload back into its ordered parts.
    ///
    /// Returns `None` when this payload does not carry [`BATCH_TAG`] or its
    /// value is not the array shape [`Payload::batch`] produces.
    pub fn parts(&self) -> Option<Vec<Payload>> {
        if self.tag != BATCH_TAG {
            return None;
        }
        let items = self.value.as_array()?;
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let tag = item.get("tag")?.as_str()?.to_string();
            let value = item.get("value")?.clone();
            parts.push(Payload { tag, value });
        }
        Some(parts)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {}", self.tag, self.value)
    }
}

/// A payload plus its provenance, as handed to node executors.
///
/// `origin` names the node whose emission produced this delivery. For the
/// initial delivery it is [`NodeId::Start`]; for a quorum batch it is the
/// source whose arrival completed the round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub payload: Payload,
    pub origin: NodeId,
}

impl Envelope {
    pub fn new(payload: Payload, origin: NodeId) -> Self {
        Self { payload, origin }
    }
}
