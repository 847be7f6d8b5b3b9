//! Node identity types used throughout graph construction and routing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node in the workflow graph.
///
/// `Start` is the virtual entry point: it is not backed by an executor and
/// exists only as an edge source for the initial payload. Every executable
/// node carries a stable, caller-chosen name.
///
/// # Examples
///
/// ```
/// use flowmesh::types::NodeId;
///
/// let id = NodeId::named("summarizer");
/// assert_eq!(id.to_string(), "summarizer");
/// assert_eq!(NodeId::Start.to_string(), "Start");
/// assert_eq!(NodeId::from("summarizer"), id);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// Virtual entry point; source of the initial delivery.
    Start,
    /// A named executable node registered with the graph builder.
    Named(String),
}

impl NodeId {
    /// Convenience constructor for a named node.
    pub fn named(name: impl Into<String>) -> Self {
        NodeId::Named(name.into())
    }

    /// Returns the name for `Named` nodes, `None` for the virtual entry.
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeId::Start => None,
            NodeId::Named(name) => Some(name),
        }
    }

    /// True for the virtual entry point.
    pub fn is_start(&self) -> bool {
        matches!(self, NodeId::Start)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Start => write!(f, "Start"),
            NodeId::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        match name {
            "Start" => NodeId::Start,
            other => NodeId::Named(other.to_string()),
        }
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        NodeId::from(name.as_str())
    }
}
