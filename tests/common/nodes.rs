use std::time::Duration;

use async_trait::async_trait;
use flowmesh::message::{BATCH_TAG, Envelope, Payload};
use flowmesh::node::{Emission, Node, NodeContext, NodeError};
use serde_json::json;

/// Emits a fixed text payload, optionally after a delay.
#[derive(Debug, Clone)]
pub struct Emit {
    accepts: Vec<&'static str>,
    tag: &'static str,
    text: String,
    delay: Option<Duration>,
}

impl Emit {
    pub fn new(accepts: &[&'static str], tag: &'static str, text: impl Into<String>) -> Self {
        Self {
            accepts: accepts.to_vec(),
            tag,
            text: text.into(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Node for Emit {
    fn accepts(&self) -> &[&str] {
        &self.accepts
    }

    async fn handle(&self, _envelope: Envelope, _ctx: NodeContext) -> Result<Emission, NodeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Emission::Send(Payload::text(self.tag, self.text.clone())))
    }
}

/// Re-emits every incoming payload unchanged.
#[derive(Debug, Clone)]
pub struct Echo;

#[async_trait]
impl Node for Echo {
    fn accepts(&self) -> &[&str] {
        &["*"]
    }

    async fn handle(&self, envelope: Envelope, _ctx: NodeContext) -> Result<Emission, NodeError> {
        Ok(Emission::Send(envelope.payload))
    }
}

/// Joins a fan-in batch's string parts with newlines.
#[derive(Debug, Clone)]
pub struct JoinBatch {
    out_tag: &'static str,
}

impl JoinBatch {
    pub fn new(out_tag: &'static str) -> Self {
        Self { out_tag }
    }
}

#[async_trait]
impl Node for JoinBatch {
    fn accepts(&self) -> &[&str] {
        &[BATCH_TAG]
    }

    async fn handle(&self, envelope: Envelope, _ctx: NodeContext) -> Result<Emission, NodeError> {
        let parts = envelope
            .payload
            .parts()
            .ok_or(NodeError::MissingInput { what: "batch" })?;
        let joined: Vec<&str> = parts.iter().filter_map(Payload::as_str).collect();
        Ok(Emission::Send(Payload::text(self.out_tag, joined.join("\n"))))
    }
}

/// Produces the run's terminal output with a prefix.
#[derive(Debug, Clone)]
pub struct Finish {
    prefix: &'static str,
}

impl Finish {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix }
    }
}

#[async_trait]
impl Node for Finish {
    fn accepts(&self) -> &[&str] {
        &["*"]
    }

    async fn handle(&self, envelope: Envelope, ctx: NodeContext) -> Result<Emission, NodeError> {
        ctx.emit("finish", "producing terminal output")?;
        let text = envelope.payload.as_str().unwrap_or_default();
        Ok(Emission::Output(Payload::text(
            "done",
            format!("{}{}", self.prefix, text),
        )))
    }
}

/// Emits a `decision` payload; approves once the visit count reaches a bound.
#[derive(Debug, Clone)]
pub struct ApproveAfter {
    approve_at: u32,
}

impl ApproveAfter {
    pub fn new(approve_at: u32) -> Self {
        Self { approve_at }
    }
}

#[async_trait]
impl Node for ApproveAfter {
    fn accepts(&self) -> &[&str] {
        &["draft"]
    }

    async fn handle(&self, _envelope: Envelope, ctx: NodeContext) -> Result<Emission, NodeError> {
        let approved = ctx.visit >= self.approve_at;
        Ok(Emission::Send(Payload::json(
            "decision",
            json!({"approved": approved, "visit": ctx.visit}),
        )))
    }
}

/// Always fails.
#[derive(Debug, Clone)]
pub struct Fail {
    message: &'static str,
}

impl Fail {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

#[async_trait]
impl Node for Fail {
    fn accepts(&self) -> &[&str] {
        &["*"]
    }

    async fn handle(&self, _envelope: Envelope, _ctx: NodeContext) -> Result<Emission, NodeError> {
        Err(NodeError::ValidationFailed(self.message.to_string()))
    }
}

/// Accepts anything and emits nothing.
#[derive(Debug, Clone)]
pub struct HoldAll;

#[async_trait]
impl Node for HoldAll {
    fn accepts(&self) -> &[&str] {
        &["*"]
    }

    async fn handle(&self, _envelope: Envelope, _ctx: NodeContext) -> Result<Emission, NodeError> {
        Ok(Emission::Hold)
    }
}

/// Saves a value into run state, then forwards the payload.
#[derive(Debug, Clone)]
pub struct SaveState {
    key: &'static str,
    value: &'static str,
}

impl SaveState {
    pub fn new(key: &'static str, value: &'static str) -> Self {
        Self { key, value }
    }
}

#[async_trait]
impl Node for SaveState {
    fn accepts(&self) -> &[&str] {
        &["*"]
    }

    async fn handle(&self, envelope: Envelope, ctx: NodeContext) -> Result<Emission, NodeError> {
        ctx.state.save(self.key, json!(self.value));
        Ok(Emission::Send(envelope.payload))
    }
}

/// Reads a run-state key and outputs it as text.
#[derive(Debug, Clone)]
pub struct ReadState {
    key: &'static str,
}

impl ReadState {
    pub fn new(key: &'static str) -> Self {
        Self { key }
    }
}

#[async_trait]
impl Node for ReadState {
    fn accepts(&self) -> &[&str] {
        &["*"]
    }

    async fn handle(&self, _envelope: Envelope, ctx: NodeContext) -> Result<Emission, NodeError> {
        let value = ctx
            .state
            .read(self.key)
            .ok_or(NodeError::MissingInput { what: "state key" })?;
        let text = value.as_str().unwrap_or_default().to_string();
        Ok(Emission::Output(Payload::text("done", text)))
    }
}
