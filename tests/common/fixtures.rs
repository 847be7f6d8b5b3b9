use flowmesh::graphs::GraphBuilder;
use flowmesh::types::NodeId;
use flowmesh::workflow::Workflow;

use super::nodes::{Emit, Finish, JoinBatch};

/// The canonical join scenario: a two-way fan-out whose branches produce
/// "A" and "B", a fan-in that joins them, and a finishing node prefixing
/// "Done: ".
pub fn join_scenario() -> Workflow {
    GraphBuilder::new()
        .add_node("a", Emit::new(&["text"], "text", "A"))
        .add_node("b", Emit::new(&["text"], "text", "B"))
        .add_node("join", JoinBatch::new("joined"))
        .add_node("final", Finish::new("Done: "))
        .add_fan_out(NodeId::Start, ["a", "b"])
        .add_fan_in(["a", "b"], "join")
        .add_edge("join", "final")
        .build()
        .expect("join scenario builds")
}
