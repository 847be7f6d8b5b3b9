use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::message::Payload;
use crate::types::NodeId;

/// Lifecycle events emitted while a run executes.
///
/// Events are ordered per run: they are pushed onto a single channel by the
/// router and the workers, so subscribers observe node starts, emissions, and
/// the terminal event in a coherent order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunEvent {
    /// A worker began handling a delivery.
    NodeStarted { node: NodeId, delivery: u64 },
    /// A node emitted a payload for routing.
    NodeOutput { source: NodeId, payload: Payload },
    /// Diagnostic message emitted by a node through its context.
    NodeMessage {
        node: NodeId,
        delivery: u64,
        scope: String,
        message: String,
    },
    /// The run produced its terminal output.
    WorkflowOutput { payload: Payload },
    /// The run failed; `cause` is the rendered error.
    RunFailed { cause: String },
}

impl RunEvent {
    /// Short label naming the event kind, used by sinks and formatters.
    pub fn label(&self) -> &'static str {
        match self {
            RunEvent::NodeStarted { .. } => "node_started",
            RunEvent::NodeOutput { .. } => "node_output",
            RunEvent::NodeMessage { .. } => "node_message",
            RunEvent::WorkflowOutput { .. } => "workflow_output",
            RunEvent::RunFailed { .. } => "run_failed",
        }
    }

    /// The node this event concerns, when there is one.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            RunEvent::NodeStarted { node, .. } | RunEvent::NodeMessage { node, .. } => Some(node),
            RunEvent::NodeOutput { source, .. } => Some(source),
            RunEvent::WorkflowOutput { .. } | RunEvent::RunFailed { .. } => None,
        }
    }

    /// Convert to a structured JSON value with a normalized schema.
    ///
    /// # Example
    ///
    /// ```
    /// use flowmesh::event_bus::RunEvent;
    /// use flowmesh::message::Payload;
    /// use flowmesh::types::NodeId;
    ///
    /// let event = RunEvent::NodeOutput {
    ///     source: NodeId::named("draft"),
    ///     payload: Payload::text("draft", "v1"),
    /// };
    /// let value = event.to_json_value();
    /// assert_eq!(value["type"], "node_output");
    /// assert_eq!(value["node"], "draft");
    /// ```
    pub fn to_json_value(&self) -> Value {
        let detail = match self {
            RunEvent::NodeStarted { delivery, .. } => json!({ "delivery": delivery }),
            RunEvent::NodeOutput { payload, .. } | RunEvent::WorkflowOutput { payload } => {
                json!({ "tag": payload.tag, "value": payload.value })
            }
            RunEvent::NodeMessage {
                delivery,
                scope,
                message,
                ..
            } => json!({ "delivery": delivery, "scope": scope, "message": message }),
            RunEvent::RunFailed { cause } => json!({ "cause": cause }),
        };
        json!({
            "type": self.label(),
            "node": self.node().map(ToString::to_string),
            "timestamp": Utc::now().to_rfc3339(),
            "detail": detail,
        })
    }

    /// Compact JSON string representation.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::NodeStarted { node, delivery } => {
                write!(f, "[{node}@{delivery}] started")
            }
            RunEvent::NodeOutput { source, payload } => {
                write!(f, "[{source}] emitted {payload}")
            }
            RunEvent::NodeMessage {
                node,
                delivery,
                scope,
                message,
            } => write!(f, "[{node}@{delivery}:{scope}] {message}"),
            RunEvent::WorkflowOutput { payload } => write!(f, "workflow output {payload}"),
            RunEvent::RunFailed { cause } => write!(f, "run failed: {cause}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_schema_is_normalized() {
        let event = RunEvent::NodeMessage {
            node: NodeId::named("gate"),
            delivery: 3,
            scope: "review".into(),
            message: "holding".into(),
        };
        let value = event.to_json_value();
        assert_eq!(value["type"], "node_message");
        assert_eq!(value["node"], "gate");
        assert_eq!(value["detail"]["scope"], "review");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn display_includes_node_and_delivery() {
        let event = RunEvent::NodeStarted {
            node: NodeId::named("join"),
            delivery: 7,
        };
        assert_eq!(event.to_string(), "[join@7] started");
    }
}
