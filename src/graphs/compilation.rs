//! Topology validation and compilation of a builder into a [`Workflow`].
//!
//! Validation is structural and happens once, at build time: every edge
//! endpoint must name a registered node (or the virtual Start as a source),
//! fan-in groups need at least two distinct sources, switches need at least
//! one case, and at least one edge must leave Start. Cycles are explicitly
//! permitted; loop termination is a run-time concern handled by loop caps and
//! the delivery limit.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::builder::GraphBuilder;
use super::edges::EdgeSpec;
use crate::types::NodeId;
use crate::workflow::{CompiledRoute, CompiledSwitch, FanInGroup, Workflow};

/// Errors produced while validating a graph declaration.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphBuildError {
    /// An edge endpoint names a node that was never registered.
    #[error("unknown node '{id}' referenced as {context}")]
    #[diagnostic(
        code(flowmesh::graph::unknown_node),
        help("Register the node with add_node before referencing it in an edge.")
    )]
    UnknownNode { id: NodeId, context: &'static str },

    /// The virtual Start node was used as a delivery target.
    #[error("the virtual Start node cannot be a delivery target")]
    #[diagnostic(
        code(flowmesh::graph::start_as_target),
        help("Start is only an edge source; route to a registered node instead.")
    )]
    StartAsTarget,

    /// The virtual Start node was declared as a fan-in source.
    #[error("the virtual Start node cannot be a fan-in source")]
    #[diagnostic(
        code(flowmesh::graph::start_as_fan_in_source),
        help("Start emits exactly once, so a quorum over it can never refill on loop-back.")
    )]
    StartAsFanInSource,

    /// A fan-in group has fewer than two sources.
    #[error("fan-in into '{target}' declares {count} source(s); at least 2 are required")]
    #[diagnostic(
        code(flowmesh::graph::fan_in_too_small),
        help("A single-source fan-in is just a direct edge; use add_edge.")
    )]
    FanInTooSmall { target: NodeId, count: usize },

    /// The same source appears twice in one fan-in group.
    #[error("duplicate source '{duplicate}' in fan-in into '{target}'")]
    #[diagnostic(code(flowmesh::graph::duplicate_fan_in_source))]
    DuplicateFanInSource { duplicate: NodeId, target: NodeId },

    /// A fan-out edge declares no targets.
    #[error("fan-out from '{from}' declares no targets")]
    #[diagnostic(code(flowmesh::graph::empty_fan_out))]
    EmptyFanOut { from: NodeId },

    /// A switch carries no cases.
    #[error("switch from '{from}' declares no cases")]
    #[diagnostic(
        code(flowmesh::graph::empty_switch),
        help("Add at least one case to the SwitchSpec.")
    )]
    EmptySwitch { from: NodeId },

    /// No edge leaves the virtual Start node.
    #[error("no entry edges: nothing is routed from Start")]
    #[diagnostic(
        code(flowmesh::graph::no_entry_edges),
        help("Add an edge (or fan-out) from NodeId::Start so the initial payload has somewhere to go.")
    )]
    NoEntryEdges,
}

pub(crate) fn build(builder: GraphBuilder) -> Result<Workflow, GraphBuildError> {
    let GraphBuilder {
        nodes,
        edges,
        outputs,
        config,
    } = builder;

    let check_source = |id: &NodeId, context: &'static str| {
        if id.is_start() || nodes.contains_key(id) {
            Ok(())
        } else {
            Err(GraphBuildError::UnknownNode {
                id: id.clone(),
                context,
            })
        }
    };
    let check_target = |id: &NodeId, context: &'static str| {
        if id.is_start() {
            return Err(GraphBuildError::StartAsTarget);
        }
        if nodes.contains_key(id) {
            Ok(())
        } else {
            Err(GraphBuildError::UnknownNode {
                id: id.clone(),
                context,
            })
        }
    };

    let mut routes: FxHashMap<NodeId, Vec<CompiledRoute>> = FxHashMap::default();
    let mut fan_ins: Vec<FanInGroup> = Vec::new();
    let mut switches: Vec<CompiledSwitch> = Vec::new();
    let mut has_entry = false;

    for edge in edges {
        match edge {
            EdgeSpec::Direct { from, to } => {
                check_source(&from, "edge source")?;
                check_target(&to, "edge target")?;
                has_entry |= from.is_start();
                routes.entry(from).or_default().push(CompiledRoute::Direct(to));
            }
            EdgeSpec::FanOut { from, targets } => {
                check_source(&from, "fan-out source")?;
                if targets.is_empty() {
                    return Err(GraphBuildError::EmptyFanOut { from });
                }
                for target in &targets {
                    check_target(target, "fan-out target")?;
                }
                has_entry |= from.is_start();
                routes
                    .entry(from)
                    .or_default()
                    .push(CompiledRoute::FanOut(targets));
            }
            EdgeSpec::FanIn { sources, to } => {
                check_target(&to, "fan-in target")?;
                if sources.len() < 2 {
                    return Err(GraphBuildError::FanInTooSmall {
                        target: to,
                        count: sources.len(),
                    });
                }
                let mut seen = FxHashSet::default();
                for source in &sources {
                    if source.is_start() {
                        return Err(GraphBuildError::StartAsFanInSource);
                    }
                    check_source(source, "fan-in source")?;
                    if !seen.insert(source.clone()) {
                        return Err(GraphBuildError::DuplicateFanInSource {
                            duplicate: source.clone(),
                            target: to,
                        });
                    }
                }
                let group = fan_ins.len();
                for source in &sources {
                    routes
                        .entry(source.clone())
                        .or_default()
                        .push(CompiledRoute::FanInSource(group));
                }
                fan_ins.push(FanInGroup {
                    sources,
                    target: to,
                });
            }
            EdgeSpec::Switch { from, spec } => {
                check_source(&from, "switch source")?;
                if spec.cases().is_empty() {
                    return Err(GraphBuildError::EmptySwitch { from });
                }
                for case in spec.cases() {
                    check_target(case.target(), "switch case target")?;
                }
                if let Some(cap) = spec.cap() {
                    check_target(&cap.forced, "switch forced target")?;
                }
                has_entry |= from.is_start();
                let index = switches.len();
                routes
                    .entry(from.clone())
                    .or_default()
                    .push(CompiledRoute::Switch(index));
                switches.push(CompiledSwitch { from, spec });
            }
        }
    }

    for output in &outputs {
        check_target(output, "output designation")?;
    }

    if !has_entry {
        return Err(GraphBuildError::NoEntryEdges);
    }

    tracing::debug!(
        nodes = nodes.len(),
        fan_ins = fan_ins.len(),
        switches = switches.len(),
        outputs = outputs.len(),
        "graph compiled"
    );

    Ok(Workflow::from_parts(
        nodes, routes, fan_ins, switches, outputs, config,
    ))
}
