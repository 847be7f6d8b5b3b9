//! Graph construction: declaring nodes and edges, then building a workflow.
//!
//! The [`GraphBuilder`] collects node registrations and edge declarations
//! (direct, fan-out, fan-in, switch) and compiles them into an immutable
//! [`Workflow`](crate::workflow::Workflow) with per-source routing tables.
//!
//! # Edge kinds
//!
//! - **Direct** (`add_edge`): every emission from the source is delivered to
//!   the target.
//! - **Fan-out** (`add_fan_out`): one emission is broadcast to all targets,
//!   which then progress concurrently.
//! - **Fan-in** (`add_fan_in`): the target receives one ordered batch per
//!   round, once every declared source has emitted (quorum synchronization).
//! - **Switch** (`add_switch`): ordered predicate cases over the emitted
//!   payload, with exclusive or any-match semantics and an optional loop cap
//!   for cyclic constructions.
//!
//! # Example
//!
//! ```
//! use flowmesh::graphs::{GraphBuilder, SwitchSpec};
//! use flowmesh::message::{Envelope, Payload};
//! use flowmesh::node::{Emission, Node, NodeContext, NodeError};
//! use flowmesh::types::NodeId;
//!
//! # #[derive(Clone)] struct Stub;
//! # #[async_trait::async_trait]
//! # impl Node for Stub {
//! #     fn accepts(&self) -> &[&str] { &["*"] }
//! #     async fn handle(&self, e: Envelope, _: NodeContext) -> Result<Emission, NodeError> {
//! #         Ok(Emission::Send(e.payload))
//! #     }
//! # }
//! let workflow = GraphBuilder::new()
//!     .add_node("draft", Stub)
//!     .add_node("review", Stub)
//!     .add_node("publish", Stub)
//!     .add_edge(NodeId::Start, "draft")
//!     .add_edge("draft", "review")
//!     .add_switch(
//!         "review",
//!         SwitchSpec::exclusive()
//!             .case("publish", |p| p.value["approved"] == true)
//!             .case("draft", |p| p.value["approved"] != true)
//!             .with_cap(3, "publish"),
//!     )
//!     .with_output_from("publish")
//!     .build()
//!     .unwrap();
//! ```

pub mod builder;
pub mod compilation;
pub mod edges;

pub use builder::GraphBuilder;
pub use compilation::GraphBuildError;
pub use edges::{LoopCap, SwitchCase, SwitchMode, SwitchPredicate, SwitchSpec};
