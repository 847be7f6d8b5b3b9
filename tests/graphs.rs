mod common;

use common::{Echo, Emit, JoinBatch};
use flowmesh::graphs::{GraphBuildError, GraphBuilder, SwitchSpec};
use flowmesh::types::NodeId;

#[test]
fn builds_a_valid_graph_with_every_edge_kind() {
    let workflow = GraphBuilder::new()
        .add_node("a", Emit::new(&["text"], "text", "A"))
        .add_node("b", Emit::new(&["text"], "text", "B"))
        .add_node("join", JoinBatch::new("joined"))
        .add_node("sink", Echo)
        .add_fan_out(NodeId::Start, ["a", "b"])
        .add_fan_in(["a", "b"], "join")
        .add_switch("join", SwitchSpec::exclusive().case("sink", |_| true))
        .with_output_from("sink")
        .build()
        .unwrap();
    assert_eq!(workflow.nodes().len(), 4);
}

#[test]
fn rejects_edges_to_unknown_nodes() {
    let err = GraphBuilder::new()
        .add_node("a", Echo)
        .add_edge(NodeId::Start, "a")
        .add_edge("a", "ghost")
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        GraphBuildError::UnknownNode { ref id, .. } if id == &NodeId::named("ghost")
    ));
}

#[test]
fn rejects_start_as_delivery_target() {
    let err = GraphBuilder::new()
        .add_node("a", Echo)
        .add_edge("a", NodeId::Start)
        .build()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::StartAsTarget));
}

#[test]
fn rejects_single_source_fan_in() {
    let err = GraphBuilder::new()
        .add_node("a", Echo)
        .add_node("join", JoinBatch::new("joined"))
        .add_edge(NodeId::Start, "a")
        .add_fan_in(["a"], "join")
        .build()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::FanInTooSmall { count: 1, .. }));
}

#[test]
fn rejects_duplicate_fan_in_sources() {
    let err = GraphBuilder::new()
        .add_node("a", Echo)
        .add_node("join", JoinBatch::new("joined"))
        .add_edge(NodeId::Start, "a")
        .add_fan_in(["a", "a"], "join")
        .build()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::DuplicateFanInSource { .. }));
}

#[test]
fn rejects_switch_without_cases() {
    let err = GraphBuilder::new()
        .add_node("a", Echo)
        .add_edge(NodeId::Start, "a")
        .add_switch("a", SwitchSpec::exclusive())
        .build()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::EmptySwitch { .. }));
}

#[test]
fn rejects_graph_without_entry_edges() {
    let err = GraphBuilder::new()
        .add_node("a", Echo)
        .add_node("b", Echo)
        .add_edge("a", "b")
        .build()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::NoEntryEdges));
}

#[test]
fn rejects_unknown_switch_forced_target() {
    let err = GraphBuilder::new()
        .add_node("a", Echo)
        .add_node("b", Echo)
        .add_edge(NodeId::Start, "a")
        .add_switch(
            "a",
            SwitchSpec::exclusive().case("b", |_| true).with_cap(2, "ghost"),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, GraphBuildError::UnknownNode { .. }));
}

#[test]
fn registering_start_is_ignored() {
    let workflow = GraphBuilder::new()
        .add_node(NodeId::Start, Echo)
        .add_node("a", Echo)
        .add_edge(NodeId::Start, "a")
        .build()
        .unwrap();
    assert_eq!(workflow.nodes().len(), 1);
}

#[test]
fn cycles_are_permitted() {
    GraphBuilder::new()
        .add_node("a", Echo)
        .add_node("b", Echo)
        .add_edge(NodeId::Start, "a")
        .add_edge("a", "b")
        .add_edge("b", "a")
        .build()
        .unwrap();
}
