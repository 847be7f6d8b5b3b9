//! Edge specifications: direct links, fan-out/fan-in, and switch routing.
//!
//! Edges are declared against node names and validated at build time. Switch
//! edges carry ordered predicate cases evaluated against the emitted payload;
//! a switch driving a loop-back cycle can additionally carry a [`LoopCap`]
//! that forces an exit route once the cycle has run long enough.

use std::fmt;
use std::sync::Arc;

use crate::message::Payload;
use crate::types::NodeId;

/// Predicate evaluated against an emitted payload to decide a switch case.
///
/// Predicates see the whole [`Payload`], tag included; a predicate written
/// against one tag simply never matches payloads carrying another.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use flowmesh::graphs::SwitchPredicate;
///
/// let approved: SwitchPredicate = Arc::new(|payload| {
///     payload.tag == "decision" && payload.value["approved"] == true
/// });
/// ```
pub type SwitchPredicate = Arc<dyn Fn(&Payload) -> bool + Send + Sync + 'static>;

/// How a switch treats multiple matching cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SwitchMode {
    /// Exactly one case must match; zero or several matches is a routing
    /// fault that fails the run.
    #[default]
    Exclusive,
    /// Every matching case fires; zero matches is a routing fault.
    AnyMatch,
}

/// Iteration cap for switches that drive loop-back cycles.
///
/// Once the switch has been evaluated `max_passes` times within a run, every
/// later payload reaching it is routed straight to `forced`, bypassing
/// predicate evaluation. This is the forced-exit policy for revision loops:
/// the graph stays cyclic, but the run cannot.
#[derive(Clone, Debug)]
pub struct LoopCap {
    /// Number of predicate-driven evaluations allowed before forcing.
    pub max_passes: u32,
    /// Target every payload is routed to once the cap is reached.
    pub forced: NodeId,
}

impl LoopCap {
    pub fn new(max_passes: u32, forced: impl Into<NodeId>) -> Self {
        Self {
            max_passes,
            forced: forced.into(),
        }
    }
}

/// One ordered case of a switch: a predicate and the target it routes to.
#[derive(Clone)]
pub struct SwitchCase {
    target: NodeId,
    predicate: SwitchPredicate,
}

impl SwitchCase {
    pub fn new(
        target: impl Into<NodeId>,
        predicate: impl Fn(&Payload) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            target: target.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        (self.predicate)(payload)
    }
}

impl fmt::Debug for SwitchCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchCase")
            .field("target", &self.target)
            .field("predicate", &"<fn>")
            .finish()
    }
}

/// Ordered predicate cases plus match mode and optional loop cap.
///
/// # Examples
///
/// ```
/// use flowmesh::graphs::{SwitchMode, SwitchSpec};
///
/// let spec = SwitchSpec::exclusive()
///     .case("publish", |p| p.value["approved"] == true)
///     .case("revise", |p| p.value["approved"] == false)
///     .with_cap(3, "publish");
/// assert_eq!(spec.mode(), SwitchMode::Exclusive);
/// assert_eq!(spec.cases().len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct SwitchSpec {
    cases: Vec<SwitchCase>,
    mode: SwitchMode,
    cap: Option<LoopCap>,
}

impl SwitchSpec {
    pub fn new(mode: SwitchMode) -> Self {
        Self {
            cases: Vec::new(),
            mode,
            cap: None,
        }
    }

    /// Exclusive-match switch: exactly one case must match per payload.
    pub fn exclusive() -> Self {
        Self::new(SwitchMode::Exclusive)
    }

    /// Any-match switch: all matching cases fire.
    pub fn any_match() -> Self {
        Self::new(SwitchMode::AnyMatch)
    }

    /// Append a case. Cases are evaluated in declaration order.
    #[must_use]
    pub fn case(
        mut self,
        target: impl Into<NodeId>,
        predicate: impl Fn(&Payload) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.cases.push(SwitchCase::new(target, predicate));
        self
    }

    /// Attach a loop cap forcing `forced` after `max_passes` evaluations.
    #[must_use]
    pub fn with_cap(mut self, max_passes: u32, forced: impl Into<NodeId>) -> Self {
        self.cap = Some(LoopCap::new(max_passes, forced));
        self
    }

    pub fn cases(&self) -> &[SwitchCase] {
        &self.cases
    }

    pub fn mode(&self) -> SwitchMode {
        self.mode
    }

    pub fn cap(&self) -> Option<&LoopCap> {
        self.cap.as_ref()
    }
}

/// Edge declarations collected by the builder, in declaration order.
#[derive(Clone, Debug)]
pub(crate) enum EdgeSpec {
    Direct {
        from: NodeId,
        to: NodeId,
    },
    FanOut {
        from: NodeId,
        targets: Vec<NodeId>,
    },
    FanIn {
        sources: Vec<NodeId>,
        to: NodeId,
    },
    Switch {
        from: NodeId,
        spec: SwitchSpec,
    },
}
