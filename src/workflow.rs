//! The compiled workflow artifact and its run entry points.
//!
//! A [`Workflow`] is the immutable product of
//! [`GraphBuilder::build`](crate::graphs::GraphBuilder::build): node registry,
//! per-source routing tables, fan-in quorum groups, switch tables, and the
//! output designation set. It is cheap to clone (nodes are shared through
//! `Arc`) and can host any number of concurrent runs.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::event_bus::{ChannelSink, EventBus, EventSink, RunEvent};
use crate::graphs::SwitchSpec;
use crate::message::Payload;
use crate::node::Node;
use crate::runtimes::{RunError, RunHandle, Scheduler, SchedulerConfig};
use crate::types::NodeId;

/// One fan-in quorum group: a round fires when every source has arrived.
#[derive(Clone, Debug)]
pub(crate) struct FanInGroup {
    /// Sources in declaration order; batch part order follows this.
    pub sources: Vec<NodeId>,
    pub target: NodeId,
}

/// A switch table entry compiled from a builder declaration.
#[derive(Clone, Debug)]
pub(crate) struct CompiledSwitch {
    pub from: NodeId,
    pub spec: SwitchSpec,
}

/// One outgoing route of a source node.
#[derive(Clone, Debug)]
pub(crate) enum CompiledRoute {
    Direct(NodeId),
    FanOut(Vec<NodeId>),
    /// Index into the workflow's fan-in group table.
    FanInSource(usize),
    /// Index into the workflow's switch table.
    Switch(usize),
}

/// Immutable, executable workflow graph.
#[derive(Clone)]
pub struct Workflow {
    nodes: FxHashMap<NodeId, Arc<dyn Node>>,
    routes: FxHashMap<NodeId, Vec<CompiledRoute>>,
    fan_ins: Vec<FanInGroup>,
    switches: Vec<CompiledSwitch>,
    outputs: FxHashSet<NodeId>,
    config: SchedulerConfig,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("routes", &self.routes)
            .field("fan_ins", &self.fan_ins)
            .field("switches", &self.switches)
            .field("outputs", &self.outputs)
            .field("config", &self.config)
            .finish()
    }
}

impl Workflow {
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeId, Arc<dyn Node>>,
        routes: FxHashMap<NodeId, Vec<CompiledRoute>>,
        fan_ins: Vec<FanInGroup>,
        switches: Vec<CompiledSwitch>,
        outputs: FxHashSet<NodeId>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            nodes,
            routes,
            fan_ins,
            switches,
            outputs,
            config,
        }
    }

    /// Registered executable nodes.
    pub fn nodes(&self) -> &FxHashMap<NodeId, Arc<dyn Node>> {
        &self.nodes
    }

    /// Scheduler configuration this workflow was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(crate) fn routes_from(&self, id: &NodeId) -> Option<&[CompiledRoute]> {
        self.routes.get(id).map(Vec::as_slice)
    }

    pub(crate) fn fan_ins(&self) -> &[FanInGroup] {
        &self.fan_ins
    }

    pub(crate) fn switches(&self) -> &[CompiledSwitch] {
        &self.switches
    }

    pub(crate) fn is_output(&self, id: &NodeId) -> bool {
        self.outputs.contains(id)
    }

    /// Execute one run to completion, printing events to stdout.
    ///
    /// Convenience wrapper over [`start`](Self::start) with the default
    /// event bus.
    pub async fn run(&self, initial: Payload) -> Result<Payload, RunError> {
        self.start(initial, EventBus::default()).join().await
    }

    /// Execute one run to completion with caller-supplied sinks.
    pub async fn run_with_sinks(
        &self,
        initial: Payload,
        sinks: Vec<Box<dyn EventSink>>,
    ) -> Result<Payload, RunError> {
        self.start(initial, EventBus::with_sinks(sinks)).join().await
    }

    /// Start a run and stream its events through a channel.
    ///
    /// Returns the run handle plus the receiving side of the event stream.
    /// The channel is the only sink, so nothing is printed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn demo(workflow: flowmesh::workflow::Workflow) {
    /// use flowmesh::message::Payload;
    ///
    /// let (handle, mut events) = workflow.run_with_channel(Payload::text("text", "go"));
    /// while let Some(event) = events.recv().await {
    ///     println!("{event}");
    /// }
    /// let output = handle.join().await;
    /// # let _ = output;
    /// # }
    /// ```
    pub fn run_with_channel(
        &self,
        initial: Payload,
    ) -> (RunHandle, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = EventBus::with_sink(ChannelSink::new(tx));
        (self.start(initial, bus), rx)
    }

    /// Start a run on the given event bus and return its handle.
    ///
    /// The handle exposes the run's status stream, cooperative cancellation,
    /// and `join` for the terminal result. The scheduler owns the bus for the
    /// duration of the run and stops its listener on every exit path.
    pub fn start(&self, initial: Payload, bus: EventBus) -> RunHandle {
        Scheduler::new(Arc::new(self.clone()), bus).start(initial)
    }
}
