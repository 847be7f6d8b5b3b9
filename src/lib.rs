//! # Flowmesh: Graph-driven Message-passing Workflow Executor
//!
//! Flowmesh executes directed graphs of typed message handlers. Nodes declare
//! the payload tags they accept, emit tagged payloads, and are wired together
//! with direct edges, fan-out broadcast, quorum-synchronized fan-in, and
//! predicate-driven switches. Cycles are first-class: revision loops are
//! bounded by per-switch loop caps rather than forbidden topologies.
//!
//! ## Core Concepts
//!
//! - **Payloads**: Tagged JSON messages; tags form a closed dispatch set
//! - **Nodes**: Async handlers with per-node serialization guaranteed
//! - **Graph**: Declarative wiring with fan-out, fan-in, and switch edges
//! - **Scheduler**: Mailbox-per-node workers plus a single routing loop
//! - **Events**: A streaming lifecycle bus with pluggable sinks
//!
//! ## Quick Start
//!
//! ```
//! use async_trait::async_trait;
//! use flowmesh::graphs::GraphBuilder;
//! use flowmesh::message::{Envelope, Payload};
//! use flowmesh::node::{Emission, Node, NodeContext, NodeError};
//! use flowmesh::types::NodeId;
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Node for Greet {
//!     fn accepts(&self) -> &[&str] {
//!         &["name"]
//!     }
//!
//!     async fn handle(
//!         &self,
//!         envelope: Envelope,
//!         ctx: NodeContext,
//!     ) -> Result<Emission, NodeError> {
//!         let name = envelope.payload.as_str().unwrap_or("world");
//!         ctx.emit("greet", "composing greeting")?;
//!         Ok(Emission::Send(Payload::text("greeting", format!("Hello, {name}!"))))
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = GraphBuilder::new()
//!     .add_node("greet", Greet)
//!     .add_edge(NodeId::Start, "greet")
//!     .with_output_from("greet")
//!     .build()?;
//!
//! let runtime = tokio::runtime::Runtime::new()?;
//! let output = runtime.block_on(workflow.run(Payload::text("name", "Ada")))?;
//! assert_eq!(output.as_str(), Some("Hello, Ada!"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Fan-in and loops
//!
//! A fan-in edge synchronizes its sources: the aggregator receives one
//! ordered batch per round, only after every source has emitted. Switches
//! route on payload predicates and can carry a loop cap that forces an exit
//! branch once a cycle has run long enough:
//!
//! ```
//! use flowmesh::graphs::SwitchSpec;
//!
//! let spec = SwitchSpec::exclusive()
//!     .case("publish", |p| p.value["approved"] == true)
//!     .case("draft", |p| p.value["approved"] != true)
//!     .with_cap(3, "publish");
//! # let _ = spec;
//! ```
//!
//! ## Module Guide
//!
//! - [`message`] - Tagged payloads and delivery envelopes
//! - [`node`] - The executor trait, emissions, and execution context
//! - [`graphs`] - Graph declaration, validation, and switch specs
//! - [`workflow`] - The compiled artifact and run entry points
//! - [`runtimes`] - Scheduler, run lifecycle, and configuration
//! - [`state`] - Run-scoped shared key/value state
//! - [`event_bus`] - Lifecycle event streaming with pluggable sinks
//! - [`telemetry`] - Tracing setup and sink-side formatting

pub mod event_bus;
pub mod graphs;
pub mod message;
pub mod node;
pub mod runtimes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod workflow;
