// SPDX-License-Identifier: MIT

//! Executor - the polymorphic unit of computation in the workflow graph
//!
//! An executor accepts one input (the raw initial value, a message, or a
//! batch of messages) and emits through its [WorkflowContext]: forwarded
//! messages travel along the graph's edges, a yielded output terminates
//! the run.

use crate::adk::agent::Agent;
use crate::adk::error::ExecutorError;
use crate::confluence::workflow::message::Message;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Input delivered to a single executor invocation
#[derive(Debug, Clone)]
pub enum ExecutorInput {
    /// The run's initial opaque value, delivered to the start executor
    Text(String),
    /// One message from an upstream executor
    Message(Message),
    /// A batch of messages from upstream executors
    Batch(Vec<Message>),
}

impl ExecutorInput {
    /// Flatten the input into prompt text
    pub fn to_prompt(&self) -> String {
        match self {
            ExecutorInput::Text(text) => text.clone(),
            ExecutorInput::Message(msg) => msg.text.clone(),
            ExecutorInput::Batch(msgs) => msgs
                .iter()
                .map(|m| m.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Per-invocation handle the engine gives an executor for emitting
///
/// Forwarded messages are routed by the engine along the graph's edges;
/// the yielded output is the run's single terminal value.
#[derive(Clone)]
pub struct WorkflowContext {
    node: String,
    forwards: mpsc::UnboundedSender<Message>,
    output: mpsc::Sender<String>,
}

impl WorkflowContext {
    pub fn new(
        node: impl Into<String>,
        forwards: mpsc::UnboundedSender<Message>,
        output: mpsc::Sender<String>,
    ) -> Self {
        Self {
            node: node.into(),
            forwards,
            output,
        }
    }

    /// Create a context together with receivers for its two channels.
    /// The output channel is bounded at one slot: a run has at most one
    /// terminal output.
    pub fn channel(
        node: impl Into<String>,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<Message>,
        mpsc::Receiver<String>,
    ) {
        let (forwards_tx, forwards_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::channel(1);
        (Self::new(node, forwards_tx, output_tx), forwards_rx, output_rx)
    }

    /// Name of the executor this context was issued to
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Emit a message to this executor's downstream targets
    pub fn forward(&self, message: Message) -> Result<(), ExecutorError> {
        self.forwards
            .send(message)
            .map_err(|_| ExecutorError::ChannelClosed {
                node: self.node.clone(),
            })
    }

    /// Emit the workflow's terminal output
    pub async fn yield_output(&self, text: String) -> Result<(), ExecutorError> {
        self.output
            .send(text)
            .await
            .map_err(|_| ExecutorError::ChannelClosed {
                node: self.node.clone(),
            })
    }
}

/// A named unit of computation in the workflow graph
#[async_trait]
pub trait Executor: Send + Sync {
    /// Unique name within a graph
    fn name(&self) -> &str;

    /// Handle one input, emitting through the context
    async fn handle(
        &self,
        input: ExecutorInput,
        ctx: &WorkflowContext,
    ) -> Result<(), ExecutorError>;
}

/// Start executor: lifts the initial input into a message and re-emits
/// it to every fan-out target. Stateless, one invocation per run.
pub struct StartExecutor {
    name: String,
}

impl StartExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for StartExecutor {
    fn default() -> Self {
        Self::new("start")
    }
}

#[async_trait]
impl Executor for StartExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        input: ExecutorInput,
        ctx: &WorkflowContext,
    ) -> Result<(), ExecutorError> {
        let message = match input {
            ExecutorInput::Text(text) => Message::from_user(text),
            ExecutorInput::Message(msg) => msg,
            ExecutorInput::Batch(_) => {
                return Err(ExecutorError::UnsupportedInput {
                    node: self.name.clone(),
                })
            }
        };
        ctx.forward(message)
    }
}

/// Agent executor: delegates one message to an [Agent] and forwards the
/// answer attributed to the agent. Stateless across runs.
pub struct AgentExecutor {
    agent: Arc<dyn Agent>,
}

impl AgentExecutor {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Executor for AgentExecutor {
    fn name(&self) -> &str {
        self.agent.name()
    }

    async fn handle(
        &self,
        input: ExecutorInput,
        ctx: &WorkflowContext,
    ) -> Result<(), ExecutorError> {
        let prompt = input.to_prompt();
        log::info!("Executing node: {}", self.name());

        let answer = self
            .agent
            .invoke(&prompt)
            .await
            .map_err(|e| ExecutorError::agent(self.name(), e))?;

        ctx.forward(Message::new(self.agent.name(), answer))
    }
}
