mod common;

use common::{Emit, Finish, JoinBatch};
use flowmesh::graphs::{GraphBuilder, SwitchSpec};
use flowmesh::message::Payload;
use flowmesh::runtimes::RunError;
use flowmesh::types::NodeId;
use proptest::prelude::*;
use serde_json::json;

fn sign_switch() -> flowmesh::workflow::Workflow {
    GraphBuilder::new()
        .add_node("neg", Finish::new("neg"))
        .add_node("pos", Finish::new("pos"))
        .add_switch(
            NodeId::Start,
            SwitchSpec::exclusive()
                .case("neg", |p| p.value["n"].as_i64().unwrap_or(0) < 0)
                .case("pos", |p| p.value["n"].as_i64().unwrap_or(0) >= 0),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn exclusive_switch_fires_the_single_matching_case() {
    let workflow = sign_switch();
    let output = workflow
        .run_with_sinks(Payload::json("num", json!({"n": -4})), vec![])
        .await
        .unwrap();
    assert_eq!(output.as_str(), Some("neg"));

    let output = workflow
        .run_with_sinks(Payload::json("num", json!({"n": 4})), vec![])
        .await
        .unwrap();
    assert_eq!(output.as_str(), Some("pos"));
}

#[tokio::test]
async fn exclusive_switch_faults_on_zero_matches() {
    let workflow = GraphBuilder::new()
        .add_node("only", Finish::new("only"))
        .add_switch(
            NodeId::Start,
            SwitchSpec::exclusive().case("only", |p| p.tag == "never"),
        )
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("num", "x"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::SwitchFault { matched: 0, .. }));
}

#[tokio::test]
async fn exclusive_switch_faults_on_multiple_matches() {
    let workflow = GraphBuilder::new()
        .add_node("x", Finish::new("x"))
        .add_node("y", Finish::new("y"))
        .add_switch(
            NodeId::Start,
            SwitchSpec::exclusive().case("x", |_| true).case("y", |_| true),
        )
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("any", "x"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::SwitchFault { matched: 2, .. }));
}

#[tokio::test]
async fn any_match_switch_fires_every_true_case() {
    let workflow = GraphBuilder::new()
        .add_node("x", Emit::new(&["signal"], "text", "X"))
        .add_node("y", Emit::new(&["signal"], "text", "Y"))
        .add_node("join", JoinBatch::new("joined"))
        .add_node("final", Finish::new(""))
        .add_switch(
            NodeId::Start,
            SwitchSpec::any_match().case("x", |_| true).case("y", |_| true),
        )
        .add_fan_in(["x", "y"], "join")
        .add_edge("join", "final")
        .build()
        .unwrap();
    let output = workflow
        .run_with_sinks(Payload::text("signal", "go"), vec![])
        .await
        .unwrap();
    assert_eq!(output.as_str(), Some("X\nY"));
}

#[tokio::test]
async fn any_match_switch_faults_on_zero_matches() {
    let workflow = GraphBuilder::new()
        .add_node("x", Finish::new("x"))
        .add_switch(
            NodeId::Start,
            SwitchSpec::any_match().case("x", |_| false),
        )
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("any", "x"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::SwitchFault { matched: 0, .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_value_routes_to_exactly_one_sign_branch(n in -1000i64..1000) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let output = runtime
            .block_on(async {
                sign_switch()
                    .run_with_sinks(Payload::json("num", json!({"n": n})), vec![])
                    .await
            })
            .unwrap();
        let expected = if n < 0 { "neg" } else { "pos" };
        prop_assert_eq!(output.as_str(), Some(expected));
    }
}
