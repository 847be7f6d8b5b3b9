//! The run scheduler: per-node workers, the router loop, and quorum logic.
//!
//! One run is executed by a set of worker tasks (one per registered node,
//! each draining a bounded mailbox) and a single router task. Workers hand
//! every handler result back to the router over an unbounded channel, and the
//! router performs all routing: direct edges, fan-out broadcast, fan-in
//! quorum accounting, and switch evaluation.
//!
//! Two structural guarantees fall out of this shape:
//!
//! - **Per-node serialization.** A node's deliveries are processed strictly
//!   in mailbox order by its single worker, so node-private state never sees
//!   concurrent handler invocations.
//! - **Atomic quorum accounting.** Fan-in round buffers live only in the
//!   router task. A handler awaiting mid-execution cannot interleave with the
//!   count, because arrivals are counted when the router routes the finished
//!   result, in one synchronous step.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::event_bus::{EventBus, RunEvent};
use crate::graphs::SwitchMode;
use crate::message::{Envelope, Payload};
use crate::node::{ANY_TAG, Emission, Node, NodeContext, NodeError};
use crate::state::RunState;
use crate::types::NodeId;
use crate::utils::id_generator::IdGenerator;
use crate::workflow::{CompiledRoute, Workflow};

use super::config::{RouterMode, SchedulerConfig};
use super::run::{CancelToken, RunError, RunHandle, RunStatus};

/// Entry point that turns a workflow and an event bus into a running task.
pub struct Scheduler {
    workflow: Arc<Workflow>,
    bus: EventBus,
}

impl Scheduler {
    pub fn new(workflow: Arc<Workflow>, bus: EventBus) -> Self {
        Self { workflow, bus }
    }

    /// Spawn the run task and return its handle.
    pub fn start(self, initial: Payload) -> RunHandle {
        let run_id = IdGenerator::new().generate_run_id();
        let (status_tx, status_rx) = watch::channel(RunStatus::Pending);
        let cancel = CancelToken::new();
        let join = tokio::spawn(run_loop(
            self.workflow,
            self.bus,
            initial,
            status_tx,
            cancel.clone(),
            run_id.clone(),
        ));
        RunHandle::new(run_id, status_rx, cancel, join)
    }
}

/// One delivery sitting in a node's mailbox.
struct Delivery {
    envelope: Envelope,
    delivery: u64,
    visit: u32,
}

/// What a worker reports back to the router.
enum RouterMsg {
    Handled {
        node: NodeId,
        result: Result<Emission, NodeError>,
    },
    Skipped {
        node: NodeId,
    },
}

#[tracing::instrument(
    name = "run",
    skip_all,
    fields(run_id = %run_id)
)]
async fn run_loop(
    workflow: Arc<Workflow>,
    bus: EventBus,
    initial: Payload,
    status_tx: watch::Sender<RunStatus>,
    cancel: CancelToken,
    run_id: String,
) -> Result<Payload, RunError> {
    let events = bus.get_sender();
    bus.listen_for_events();

    let state = RunState::new();
    let (results_tx, results_rx) = flume::unbounded();
    let mut mailboxes: FxHashMap<NodeId, flume::Sender<Delivery>> = FxHashMap::default();
    for (id, node) in workflow.nodes() {
        let (tx, rx) = flume::bounded(workflow.config().mailbox_capacity);
        mailboxes.insert(id.clone(), tx);
        tokio::spawn(worker_loop(
            id.clone(),
            node.clone(),
            rx,
            results_tx.clone(),
            events.clone(),
            state.clone(),
            cancel.clone(),
        ));
    }
    // Workers hold the only live senders now; recv errors once they are gone.
    drop(results_tx);

    let _ = status_tx.send(RunStatus::Running);

    let mut router = Router {
        config: workflow.config().clone(),
        workflow: workflow.clone(),
        mailboxes,
        results_rx,
        events: events.clone(),
        cancel: cancel.clone(),
        in_flight: 0,
        deliveries: 0,
        visits: FxHashMap::default(),
        rounds: vec![FxHashMap::default(); workflow.fan_ins().len()],
        switch_passes: vec![0; workflow.switches().len()],
    };
    let outcome = router.run(initial).await;
    drop(router); // closes the mailboxes so idle workers exit

    match &outcome {
        Ok(payload) => {
            tracing::info!(tag = %payload.tag, "run completed");
            let _ = events.send(RunEvent::WorkflowOutput {
                payload: payload.clone(),
            });
            let _ = status_tx.send(RunStatus::Completed);
        }
        Err(RunError::Cancelled) => {
            tracing::info!("run cancelled");
            let _ = status_tx.send(RunStatus::Cancelled);
        }
        Err(error) => {
            tracing::error!(%error, "run failed");
            let _ = events.send(RunEvent::RunFailed {
                cause: error.to_string(),
            });
            let _ = status_tx.send(RunStatus::Failed);
        }
    }

    // Wake any handler that polls the token after the run is decided.
    cancel.cancel();
    bus.stop_listener().await;
    outcome
}

async fn worker_loop(
    id: NodeId,
    node: Arc<dyn Node>,
    mailbox: flume::Receiver<Delivery>,
    results: flume::Sender<RouterMsg>,
    events: flume::Sender<RunEvent>,
    state: RunState,
    cancel: CancelToken,
) {
    while let Ok(delivery) = mailbox.recv_async().await {
        if cancel.is_cancelled() {
            let _ = results.send(RouterMsg::Skipped { node: id.clone() });
            continue;
        }
        let _ = events.send(RunEvent::NodeStarted {
            node: id.clone(),
            delivery: delivery.delivery,
        });
        let ctx = NodeContext {
            node_id: id.clone(),
            delivery: delivery.delivery,
            visit: delivery.visit,
            state: state.clone(),
            cancel: cancel.clone(),
            events: events.clone(),
        };
        let result = node.handle(delivery.envelope, ctx).await;
        let _ = results.send(RouterMsg::Handled {
            node: id.clone(),
            result,
        });
    }
}

struct Router {
    config: SchedulerConfig,
    workflow: Arc<Workflow>,
    mailboxes: FxHashMap<NodeId, flume::Sender<Delivery>>,
    results_rx: flume::Receiver<RouterMsg>,
    events: flume::Sender<RunEvent>,
    cancel: CancelToken,
    /// Deliveries sent to mailboxes whose results have not come back yet.
    in_flight: usize,
    /// Total deliveries dispatched in this run.
    deliveries: u64,
    /// Per-node delivery counts within this run.
    visits: FxHashMap<NodeId, u32>,
    /// Fan-in round buffers, indexed like `workflow.fan_ins()`. Keyed by
    /// source id so a duplicate emission replaces rather than double-counts.
    rounds: Vec<FxHashMap<NodeId, Payload>>,
    /// Per-switch evaluation counts, indexed like `workflow.switches()`.
    switch_passes: Vec<u32>,
}

impl Router {
    async fn run(&mut self, initial: Payload) -> Result<Payload, RunError> {
        self.route_emission(&NodeId::Start, initial).await?;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            if self.in_flight == 0 {
                return Err(self.stall_error());
            }
            match self.next_result().await? {
                RouterMsg::Skipped { node } => {
                    tracing::debug!(%node, "delivery skipped after cancellation");
                    self.in_flight -= 1;
                }
                RouterMsg::Handled { node, result } => {
                    self.in_flight -= 1;
                    match result {
                        Err(source) => return Err(RunError::NodeFault { node, source }),
                        Ok(Emission::Hold) => {
                            tracing::trace!(%node, "held");
                        }
                        Ok(Emission::Output(payload)) => return Ok(payload),
                        Ok(Emission::Send(payload)) => {
                            let _ = self.events.send(RunEvent::NodeOutput {
                                source: node.clone(),
                                payload: payload.clone(),
                            });
                            if self.workflow.is_output(&node) {
                                return Ok(payload);
                            }
                            self.route_emission(&node, payload).await?;
                        }
                    }
                }
            }
        }
    }

    /// Wait for the next worker result, honoring cancellation and, while a
    /// fan-in round is incomplete, the optional quorum timeout.
    async fn next_result(&self) -> Result<RouterMsg, RunError> {
        let quorum_pending = self.rounds.iter().any(|round| !round.is_empty());
        if let Some(limit) = self.config.quorum_timeout
            && quorum_pending
        {
            tokio::select! {
                _ = self.cancel.cancelled() => Err(RunError::Cancelled),
                result = tokio::time::timeout(limit, self.results_rx.recv_async()) => {
                    match result {
                        Ok(Ok(msg)) => Ok(msg),
                        Ok(Err(_)) => Err(RunError::Disconnected),
                        Err(_) => Err(RunError::QuorumTimeout { waited: limit }),
                    }
                }
            }
        } else {
            tokio::select! {
                _ = self.cancel.cancelled() => Err(RunError::Cancelled),
                result = self.results_rx.recv_async() => {
                    result.map_err(|_| RunError::Disconnected)
                }
            }
        }
    }

    /// Route one emitted payload along every outgoing route of `origin`.
    async fn route_emission(&mut self, origin: &NodeId, payload: Payload) -> Result<(), RunError> {
        let routes = self
            .workflow
            .routes_from(origin)
            .map(<[CompiledRoute]>::to_vec)
            .unwrap_or_default();
        if routes.is_empty() {
            return self.unrouted(origin, payload);
        }
        for route in routes {
            match route {
                CompiledRoute::Direct(to) => {
                    self.deliver(&to, payload.clone(), origin).await?;
                }
                CompiledRoute::FanOut(targets) => {
                    for target in &targets {
                        self.deliver(target, payload.clone(), origin).await?;
                    }
                }
                CompiledRoute::FanInSource(group) => {
                    self.collect_fan_in(group, origin, payload.clone()).await?;
                }
                CompiledRoute::Switch(index) => {
                    self.route_switch(index, origin, payload.clone()).await?;
                }
            }
        }
        Ok(())
    }

    fn unrouted(&self, origin: &NodeId, payload: Payload) -> Result<(), RunError> {
        match self.config.router_mode {
            RouterMode::Strict => Err(RunError::UnroutedEmission {
                node: origin.clone(),
                tag: payload.tag,
            }),
            RouterMode::Lenient => {
                tracing::warn!(node = %origin, tag = %payload.tag, "dropping unrouted emission");
                Ok(())
            }
        }
    }

    /// Record one fan-in arrival; fire the batch when the round completes.
    async fn collect_fan_in(
        &mut self,
        group: usize,
        origin: &NodeId,
        payload: Payload,
    ) -> Result<(), RunError> {
        let (sources, target) = {
            let spec = &self.workflow.fan_ins()[group];
            (spec.sources.clone(), spec.target.clone())
        };

        let round = &mut self.rounds[group];
        if round.insert(origin.clone(), payload).is_some() {
            tracing::warn!(
                source = %origin,
                into = %target,
                "duplicate fan-in arrival within one round; replacing earlier payload"
            );
        }
        if round.len() < sources.len() {
            tracing::debug!(
                into = %target,
                arrived = round.len(),
                expected = sources.len(),
                "fan-in arrival recorded"
            );
            return Ok(());
        }

        // Round complete: drain in source-declaration order and reset the
        // buffer so a loop-back can start a fresh round.
        let parts: Vec<Payload> = sources
            .iter()
            .map(|source| {
                round
                    .remove(source)
                    .expect("complete round holds every declared source")
            })
            .collect();
        round.clear();
        tracing::debug!(into = %target, parts = parts.len(), "fan-in quorum reached");
        self.deliver(&target, Payload::batch(parts), origin).await
    }

    /// Evaluate a switch for one payload and deliver along the chosen routes.
    async fn route_switch(
        &mut self,
        index: usize,
        origin: &NodeId,
        payload: Payload,
    ) -> Result<(), RunError> {
        let switch = self.workflow.switches()[index].clone();
        let pass = self.switch_passes[index];
        self.switch_passes[index] += 1;

        if let Some(cap) = switch.spec.cap()
            && pass >= cap.max_passes
        {
            tracing::info!(
                from = %switch.from,
                forced = %cap.forced,
                passes = pass,
                "loop cap reached; forcing switch target"
            );
            let forced = cap.forced.clone();
            return self.deliver(&forced, payload, origin).await;
        }

        let matched: Vec<NodeId> = switch
            .spec
            .cases()
            .iter()
            .filter(|case| case.matches(&payload))
            .map(|case| case.target().clone())
            .collect();
        tracing::debug!(
            from = %switch.from,
            matched = matched.len(),
            mode = ?switch.spec.mode(),
            "switch evaluated"
        );

        match switch.spec.mode() {
            SwitchMode::Exclusive => {
                if matched.len() != 1 {
                    return Err(RunError::SwitchFault {
                        from: switch.from.clone(),
                        matched: matched.len(),
                    });
                }
                self.deliver(&matched[0], payload, origin).await
            }
            SwitchMode::AnyMatch => {
                if matched.is_empty() {
                    return Err(RunError::SwitchFault {
                        from: switch.from.clone(),
                        matched: 0,
                    });
                }
                for target in &matched {
                    self.deliver(target, payload.clone(), origin).await?;
                }
                Ok(())
            }
        }
    }

    /// Put one payload into a node's mailbox, enforcing the delivery cap and
    /// the target's declared tag set.
    async fn deliver(
        &mut self,
        to: &NodeId,
        payload: Payload,
        origin: &NodeId,
    ) -> Result<(), RunError> {
        self.deliveries += 1;
        if self.deliveries > self.config.max_deliveries {
            return Err(RunError::DeliveryLimit {
                limit: self.config.max_deliveries,
            });
        }

        let accepted = {
            let node = self
                .workflow
                .nodes()
                .get(to)
                .expect("targets are validated at build time");
            let tags = node.accepts();
            tags.contains(&payload.tag.as_str()) || tags.contains(&ANY_TAG)
        };
        if !accepted {
            match self.config.router_mode {
                RouterMode::Strict => {
                    return Err(RunError::RoutingFault {
                        node: to.clone(),
                        tag: payload.tag,
                    });
                }
                RouterMode::Lenient => {
                    tracing::warn!(
                        node = %to,
                        tag = %payload.tag,
                        "dropping delivery with undeclared tag"
                    );
                    return Ok(());
                }
            }
        }

        let visit = {
            let counter = self.visits.entry(to.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let mailbox = self
            .mailboxes
            .get(to)
            .expect("every registered node has a mailbox")
            .clone();
        tracing::trace!(
            %to,
            from = %origin,
            tag = %payload.tag,
            delivery = self.deliveries,
            visit,
            "delivering"
        );
        self.in_flight += 1;
        mailbox
            .send_async(Delivery {
                envelope: Envelope::new(payload, origin.clone()),
                delivery: self.deliveries,
                visit,
            })
            .await
            .map_err(|_| RunError::Disconnected)
    }

    /// Deterministic diagnosis when nothing is in flight and no output has
    /// been produced: an incomplete fan-in round means a stalled quorum,
    /// otherwise the graph simply drained.
    fn stall_error(&self) -> RunError {
        for (index, round) in self.rounds.iter().enumerate() {
            if !round.is_empty() {
                let spec = &self.workflow.fan_ins()[index];
                return RunError::QuorumStalled {
                    target: spec.target.clone(),
                    arrived: round.len(),
                    expected: spec.sources.len(),
                };
            }
        }
        RunError::NoOutput
    }
}
