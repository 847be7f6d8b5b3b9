//! Run lifecycle types: status, errors, cancellation, and the run handle.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use crate::message::Payload;
use crate::node::NodeError;
use crate::types::NodeId;

/// Lifecycle state of one run.
///
/// Transitions: `Pending -> Running -> {Completed | Failed | Cancelled}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Created but not yet dispatching.
    Pending,
    /// Dispatching deliveries.
    Running,
    /// Terminal output was produced.
    Completed,
    /// A fault ended the run.
    Failed,
    /// Cancellation was observed.
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

/// Errors that end a run.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    /// A node handler returned a fatal error.
    #[error("node '{node}' failed")]
    #[diagnostic(code(flowmesh::run::node_fault))]
    NodeFault {
        node: NodeId,
        #[source]
        source: NodeError,
    },

    /// A payload was routed to a node that does not declare its tag.
    #[error("routing fault: node '{node}' does not accept tag '{tag}'")]
    #[diagnostic(
        code(flowmesh::run::routing_fault),
        help(
            "Declare the tag in the node's accepts() set, fix the producing node, \
             or run with RouterMode::Lenient to drop mismatches."
        )
    )]
    RoutingFault { node: NodeId, tag: String },

    /// A node emitted a payload but has no outgoing routes and is not an
    /// output node.
    #[error("unrouted emission: node '{node}' emitted tag '{tag}' but has no outgoing routes")]
    #[diagnostic(
        code(flowmesh::run::unrouted_emission),
        help("Add an outgoing edge for the node or designate it with with_output_from.")
    )]
    UnroutedEmission { node: NodeId, tag: String },

    /// A switch matched an unexpected number of cases for its mode.
    #[error("switch from '{from}' matched {matched} case(s), which its mode does not allow")]
    #[diagnostic(
        code(flowmesh::run::switch_fault),
        help(
            "Exclusive switches require exactly one matching case and any-match \
             switches at least one. Make the predicates cover the payload space."
        )
    )]
    SwitchFault { from: NodeId, matched: usize },

    /// Nothing is in flight but a fan-in round is incomplete.
    #[error(
        "quorum stalled: fan-in into '{target}' has {arrived} of {expected} arrivals \
         and no deliveries remain in flight"
    )]
    #[diagnostic(
        code(flowmesh::run::quorum_stalled),
        help("Some fan-in source can no longer emit. Check upstream routing and switch coverage.")
    )]
    QuorumStalled {
        target: NodeId,
        arrived: usize,
        expected: usize,
    },

    /// The quorum timeout elapsed while waiting for the next handler result.
    #[error("quorum timeout: waited {waited:?} for the next arrival of an incomplete fan-in round")]
    #[diagnostic(code(flowmesh::run::quorum_timeout))]
    QuorumTimeout { waited: Duration },

    /// The per-run delivery cap was exceeded.
    #[error("delivery limit of {limit} exceeded")]
    #[diagnostic(
        code(flowmesh::run::delivery_limit),
        help("A cycle without a loop cap is the usual cause. Add a LoopCap or raise max_deliveries.")
    )]
    DeliveryLimit { limit: u64 },

    /// The run drained without producing terminal output.
    #[error("run ended without output: nothing in flight and no terminal emission was produced")]
    #[diagnostic(
        code(flowmesh::run::no_output),
        help("Designate an output node with with_output_from or emit Emission::Output.")
    )]
    NoOutput,

    /// Cancellation was requested and observed.
    #[error("run cancelled")]
    #[diagnostic(code(flowmesh::run::cancelled))]
    Cancelled,

    /// An internal channel closed unexpectedly, usually a panicked worker.
    #[error("scheduler channel disconnected before the run finished")]
    #[diagnostic(code(flowmesh::run::disconnected))]
    Disconnected,

    /// The run task itself failed to join.
    #[error("run task failed: {0}")]
    #[diagnostic(code(flowmesh::run::join))]
    Join(#[from] tokio::task::JoinError),
}

/// Cooperative cancellation token shared by a run's router and workers.
///
/// Cancelling is sticky and idempotent. Workers check the flag at delivery
/// entry; the router checks it between deliveries. In-flight handlers are not
/// preempted, though they may poll the token themselves through their context.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_one();
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been requested.
    ///
    /// Relies on `notify_one`'s stored permit so a request that lands before
    /// the first await is still observed.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        loop {
            self.notify.notified().await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

/// Handle to a running workflow execution.
///
/// Exposes the run's identity, a watchable status stream, cooperative
/// cancellation, and `join` for the terminal result.
#[derive(Debug)]
pub struct RunHandle {
    run_id: String,
    status: watch::Receiver<RunStatus>,
    cancel: CancelToken,
    join: JoinHandle<Result<Payload, RunError>>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: String,
        status: watch::Receiver<RunStatus>,
        cancel: CancelToken,
        join: JoinHandle<Result<Payload, RunError>>,
    ) -> Self {
        Self {
            run_id,
            status,
            cancel,
            join,
        }
    }

    /// Unique identifier of this run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Current lifecycle status.
    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    /// Watchable status stream for callers that want transition updates.
    pub fn status_stream(&self) -> watch::Receiver<RunStatus> {
        self.status.clone()
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clone of the run's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// True once the run task has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Abort the run task outright. Prefer [`cancel`](Self::cancel); abort
    /// skips cleanup such as event-bus draining.
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Wait for the run's terminal result.
    pub async fn join(self) -> Result<Payload, RunError> {
        self.join.await?
    }
}
