//! Node execution framework: the executor trait, its context, and emissions.
//!
//! A node is a unit of computation addressed by a stable name. It declares the
//! payload tags it accepts, receives deliveries one at a time (the scheduler
//! runs one worker task per node, so invocations of the same node never
//! overlap), and answers each delivery with an [`Emission`].

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::event_bus::RunEvent;
use crate::message::{Envelope, Payload};
use crate::runtimes::CancelToken;
use crate::state::RunState;
use crate::types::NodeId;

/// Wildcard tag: a node declaring this accepts every payload.
pub const ANY_TAG: &str = "*";

/// Core trait for executable workflow nodes.
///
/// Nodes may hold private mutable state across invocations within one run
/// (interior mutability is fine); the per-node serialization guarantee means
/// that state never needs to defend against concurrent handler calls.
///
/// # Error Handling
///
/// Returning `Err(NodeError)` is fatal to the run. There is no automatic
/// retry at this layer; nodes that want resilience wrap their own fallible
/// work and decide what to emit.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use flowmesh::message::{Envelope, Payload};
/// use flowmesh::node::{Emission, Node, NodeContext, NodeError};
///
/// struct Shout;
///
/// #[async_trait]
/// impl Node for Shout {
///     fn accepts(&self) -> &[&str] {
///         &["text"]
///     }
///
///     async fn handle(
///         &self,
///         envelope: Envelope,
///         _ctx: NodeContext,
///     ) -> Result<Emission, NodeError> {
///         let text = envelope.payload.as_str().unwrap_or_default();
///         Ok(Emission::Send(Payload::text("text", text.to_uppercase())))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Payload tags this node accepts. A closed set, fixed at construction;
    /// [`ANY_TAG`] opts out of tag checking for this node.
    fn accepts(&self) -> &[&str];

    /// Handle one delivery.
    async fn handle(&self, envelope: Envelope, ctx: NodeContext) -> Result<Emission, NodeError>;
}

/// What a node does with a delivery.
#[derive(Clone, Debug)]
pub enum Emission {
    /// Emit nothing. Used by accumulators that are still waiting for more
    /// input before producing anything.
    Hold,
    /// Emit one payload, propagated along every outgoing route of this node.
    Send(Payload),
    /// Emit the run's terminal output directly, bypassing routing.
    Output(Payload),
}

/// Execution context passed to nodes with each delivery.
///
/// Carries the node's identity, the global delivery sequence number, the
/// per-node visit count within this run, the run-scoped state store, the
/// cooperative cancellation token, and a channel for diagnostic events.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Identity of the node being invoked.
    pub node_id: NodeId,
    /// Global delivery sequence number of this invocation.
    pub delivery: u64,
    /// How many times this node has been delivered to within the run,
    /// counting this delivery.
    pub visit: u32,
    /// Run-scoped shared state store.
    pub state: RunState,
    /// Cooperative cancellation token for the run.
    pub cancel: CancelToken,
    /// Channel for emitting events to the run's event bus.
    pub events: flume::Sender<RunEvent>,
}

impl NodeContext {
    /// Emit a node-scoped diagnostic event enriched with this context's
    /// metadata, making it traceable in the run's event stream.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), NodeContextError> {
        self.events
            .send(RunEvent::NodeMessage {
                node: self.node_id.clone(),
                delivery: self.delivery,
                scope: scope.into(),
                message: message.into(),
            })
            .map_err(|_| NodeContextError::EventBusUnavailable)
    }

    /// True once cancellation has been requested for the run. Long-running
    /// handlers should poll this between units of work.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Errors that can occur when using NodeContext methods.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeContextError {
    /// Event could not be sent due to event bus disconnection.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(flowmesh::node::event_bus_unavailable),
        help("The event bus may be disconnected. Check that the run is still live.")
    )]
    EventBusUnavailable,
}

/// Fatal errors raised by node execution.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the delivered payload.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(flowmesh::node::missing_input),
        help("Check that the upstream node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service error.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(flowmesh::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(flowmesh::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(flowmesh::node::validation),
        help("Check input payload shape and required fields.")
    )]
    ValidationFailed(String),

    /// Event bus communication error.
    #[error("event bus error: {0}")]
    #[diagnostic(code(flowmesh::node::event_bus))]
    EventBus(#[from] NodeContextError),
}
