mod common;

use std::time::Duration;

use common::{Echo, Emit, Fail, HoldAll, ReadState, SaveState, join_scenario};
use flowmesh::event_bus::EventBus;
use flowmesh::graphs::GraphBuilder;
use flowmesh::message::Payload;
use flowmesh::runtimes::{RouterMode, RunError, RunStatus, SchedulerConfig};
use flowmesh::types::NodeId;

#[tokio::test]
async fn join_scenario_produces_both_contributions() {
    let workflow = join_scenario();
    let output = workflow
        .run_with_sinks(Payload::text("text", "START"), vec![])
        .await
        .unwrap();
    assert_eq!(output.tag, "done");
    assert_eq!(output.as_str(), Some("Done: A\nB"));
}

#[tokio::test]
async fn identical_runs_produce_identical_output() {
    let workflow = join_scenario();
    let mut outputs = Vec::new();
    for _ in 0..5 {
        let output = workflow
            .run_with_sinks(Payload::text("text", "START"), vec![])
            .await
            .unwrap();
        outputs.push(output);
    }
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn node_failure_fails_the_run() {
    let workflow = GraphBuilder::new()
        .add_node("broken", Fail::new("bad input"))
        .add_edge(NodeId::Start, "broken")
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("text", "go"), vec![])
        .await
        .unwrap_err();
    match err {
        RunError::NodeFault { node, .. } => assert_eq!(node, NodeId::named("broken")),
        other => panic!("expected NodeFault, got {other}"),
    }
}

#[tokio::test]
async fn undeclared_tag_is_a_routing_fault_in_strict_mode() {
    let workflow = GraphBuilder::new()
        .add_node("typed", Emit::new(&["text"], "text", "out"))
        .add_edge(NodeId::Start, "typed")
        .with_output_from("typed")
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("mystery", "?"), vec![])
        .await
        .unwrap_err();
    match err {
        RunError::RoutingFault { node, tag } => {
            assert_eq!(node, NodeId::named("typed"));
            assert_eq!(tag, "mystery");
        }
        other => panic!("expected RoutingFault, got {other}"),
    }
}

#[tokio::test]
async fn lenient_mode_drops_mismatches_and_ends_in_a_stall() {
    let workflow = GraphBuilder::new()
        .add_node("typed", Emit::new(&["text"], "text", "out"))
        .add_edge(NodeId::Start, "typed")
        .with_output_from("typed")
        .with_config(SchedulerConfig::default().with_router_mode(RouterMode::Lenient))
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("mystery", "?"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::NoOutput));
}

#[tokio::test]
async fn emission_without_routes_is_loud() {
    let workflow = GraphBuilder::new()
        .add_node("lonely", Emit::new(&["text"], "text", "out"))
        .add_edge(NodeId::Start, "lonely")
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("text", "go"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::UnroutedEmission { .. }));
}

#[tokio::test]
async fn run_that_only_holds_ends_without_output() {
    let workflow = GraphBuilder::new()
        .add_node("quiet", HoldAll)
        .add_edge(NodeId::Start, "quiet")
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("text", "go"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::NoOutput));
}

#[tokio::test]
async fn uncapped_cycle_hits_the_delivery_limit() {
    let workflow = GraphBuilder::new()
        .add_node("a", Echo)
        .add_node("b", Echo)
        .add_edge(NodeId::Start, "a")
        .add_edge("a", "b")
        .add_edge("b", "a")
        .with_config(SchedulerConfig::default().with_max_deliveries(10))
        .build()
        .unwrap();
    let err = workflow
        .run_with_sinks(Payload::text("text", "round and round"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::DeliveryLimit { limit: 10 }));
}

#[tokio::test]
async fn cancellation_is_cooperative_and_observed() {
    let workflow = GraphBuilder::new()
        .add_node(
            "slow",
            Emit::new(&["text"], "text", "late").with_delay(Duration::from_secs(30)),
        )
        .add_edge(NodeId::Start, "slow")
        .with_output_from("slow")
        .build()
        .unwrap();

    let handle = workflow.start(Payload::text("text", "go"), EventBus::with_sinks(vec![]));
    let status = handle.status_stream();
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    let err = handle.join().await.unwrap_err();
    assert!(matches!(err, RunError::Cancelled));
    assert_eq!(*status.borrow(), RunStatus::Cancelled);
}

#[tokio::test]
async fn status_reaches_completed_after_join() {
    let workflow = join_scenario();
    let handle = workflow.start(
        Payload::text("text", "START"),
        EventBus::with_sinks(vec![]),
    );
    let status = handle.status_stream();
    assert!(handle.run_id().starts_with("run-"));
    handle.join().await.unwrap();
    assert_eq!(*status.borrow(), RunStatus::Completed);
    assert!(status.borrow().is_terminal());
}

#[tokio::test]
async fn run_state_flows_between_nodes() {
    let workflow = GraphBuilder::new()
        .add_node("saver", SaveState::new("note", "remembered"))
        .add_node("reader", ReadState::new("note"))
        .add_edge(NodeId::Start, "saver")
        .add_edge("saver", "reader")
        .build()
        .unwrap();
    let output = workflow
        .run_with_sinks(Payload::text("text", "go"), vec![])
        .await
        .unwrap();
    assert_eq!(output.as_str(), Some("remembered"));
}
