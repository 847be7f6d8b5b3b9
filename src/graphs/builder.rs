//! GraphBuilder implementation for constructing workflow graphs.
//!
//! This module contains the main GraphBuilder type and its fluent API for
//! declaring nodes and edges before building an executable [`Workflow`].

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use super::edges::{EdgeSpec, SwitchSpec};
use crate::node::Node;
use crate::runtimes::SchedulerConfig;
use crate::types::NodeId;
use crate::workflow::Workflow;

/// Builder for workflow graphs with a fluent API.
///
/// Declare nodes and edges, then call [`build`](Self::build) to validate the
/// topology and produce an immutable [`Workflow`]. Cycles are permitted;
/// loop-back edges are how revision loops are expressed.
///
/// `NodeId::Start` is a virtual endpoint: it is never registered with
/// [`add_node`](Self::add_node) and exists only as an edge source for the
/// initial payload.
///
/// # Examples
///
/// ```
/// use flowmesh::graphs::GraphBuilder;
/// use flowmesh::message::{Envelope, Payload};
/// use flowmesh::node::{Emission, Node, NodeContext, NodeError};
/// use flowmesh::types::NodeId;
///
/// # struct Echo;
/// # #[async_trait::async_trait]
/// # impl Node for Echo {
/// #     fn accepts(&self) -> &[&str] { &["*"] }
/// #     async fn handle(&self, e: Envelope, _: NodeContext) -> Result<Emission, NodeError> {
/// #         Ok(Emission::Send(e.payload))
/// #     }
/// # }
/// let workflow = GraphBuilder::new()
///     .add_node("echo", Echo)
///     .add_edge(NodeId::Start, "echo")
///     .with_output_from("echo")
///     .build()
///     .unwrap();
/// ```
pub struct GraphBuilder {
    /// Registry of all nodes in the graph, keyed by their identifier.
    pub(crate) nodes: FxHashMap<NodeId, Arc<dyn Node>>,
    /// Edge declarations in declaration order.
    pub(crate) edges: Vec<EdgeSpec>,
    /// Nodes whose `Send` emissions are terminal workflow output.
    pub(crate) outputs: FxHashSet<NodeId>,
    /// Scheduler configuration for the built workflow.
    pub(crate) config: SchedulerConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new, empty graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: Vec::new(),
            outputs: FxHashSet::default(),
            config: SchedulerConfig::default(),
        }
    }

    /// Registers a node implementation under the given identifier.
    ///
    /// `NodeId::Start` is virtual; attempts to register it are ignored with a
    /// warning. Registering the same id twice replaces the earlier node.
    #[must_use]
    pub fn add_node(mut self, id: impl Into<NodeId>, node: impl Node + 'static) -> Self {
        let id = id.into();
        if id.is_start() {
            tracing::warn!("ignoring registration of the virtual Start node");
            return self;
        }
        self.nodes.insert(id, Arc::new(node));
        self
    }

    /// Adds a direct edge: every payload `from` emits is delivered to `to`.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.edges.push(EdgeSpec::Direct {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Adds a fan-out edge: every payload `from` emits is broadcast to all
    /// `targets`, which then progress concurrently. No quorum is involved.
    #[must_use]
    pub fn add_fan_out<I, T>(mut self, from: impl Into<NodeId>, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        self.edges.push(EdgeSpec::FanOut {
            from: from.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Adds a fan-in edge: `to` receives one ordered batch payload per round,
    /// once every node in `sources` has emitted. A duplicate emission from
    /// the same source within a round replaces its earlier arrival.
    #[must_use]
    pub fn add_fan_in<I, T>(mut self, sources: I, to: impl Into<NodeId>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        self.edges.push(EdgeSpec::FanIn {
            sources: sources.into_iter().map(Into::into).collect(),
            to: to.into(),
        });
        self
    }

    /// Adds a switch edge: payloads `from` emits are routed by the spec's
    /// ordered predicate cases.
    #[must_use]
    pub fn add_switch(mut self, from: impl Into<NodeId>, spec: SwitchSpec) -> Self {
        self.edges.push(EdgeSpec::Switch {
            from: from.into(),
            spec,
        });
        self
    }

    /// Designates a node whose `Send` emissions are treated as terminal
    /// workflow output. May be called for several nodes; the first such
    /// emission in a run completes it.
    #[must_use]
    pub fn with_output_from(mut self, id: impl Into<NodeId>) -> Self {
        self.outputs.insert(id.into());
        self
    }

    /// Overrides the scheduler configuration for the built workflow.
    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }
}

// `build` itself lives in graphs::compilation next to the validation logic.
impl GraphBuilder {
    /// Validate the declared topology and produce an immutable [`Workflow`].
    pub fn build(self) -> Result<Workflow, super::compilation::GraphBuildError> {
        super::compilation::build(self)
    }
}
