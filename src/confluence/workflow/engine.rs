// SPDX-License-Identifier: MIT

//! Execution engine - runs a workflow graph against one input
//!
//! The start node's fan-out dispatch is synchronous; each fan-out
//! branch then runs as its own tokio task because the agent call behind
//! it may block for a non-trivial duration, and branches must not
//! serialize behind one another. Branch contributions converge on the
//! aggregator, whose released value surfaces as the run's single
//! `Output` event.
//!
//! The event sequence is single-pass and finite: it ends after the
//! output, after a failure, or silently after cancellation.

use crate::adk::error::RunError;
use crate::confluence::workflow::executor::{ExecutorInput, WorkflowContext};
use crate::confluence::workflow::graph::WorkflowGraph;
use crate::confluence::workflow::message::Message;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Lifecycle and output events observed while a run progresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowEvent {
    /// The run has been scheduled and the start node dispatched
    Started,
    /// The single terminal output of the run
    Output(String),
    /// The run failed; no output will follow
    Error(RunError),
}

/// Caller-supplied run controls
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Deadline for the whole run; on expiry in-flight branches are
    /// dropped and the run reports [RunError::Timeout]
    pub timeout: Option<Duration>,
    /// Cooperative cancellation signal
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: CancellationToken::new(),
        }
    }
}

/// One in-flight run: a single-pass, non-restartable event sequence
pub struct WorkflowRun {
    events: mpsc::Receiver<WorkflowEvent>,
    cancellation: CancellationToken,
}

impl WorkflowRun {
    /// Pull the next event; `None` means the sequence has ended
    pub async fn next_event(&mut self) -> Option<WorkflowEvent> {
        self.events.recv().await
    }

    /// Request cancellation of the run
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// The run as a [futures::Stream] of events
    pub fn into_stream(self) -> ReceiverStream<WorkflowEvent> {
        ReceiverStream::new(self.events)
    }

    /// Drain the event sequence down to the run's result: the payload
    /// of the single `Output` event, or the failure classification
    pub async fn collect_output(mut self) -> Result<String, RunError> {
        while let Some(event) = self.next_event().await {
            match event {
                WorkflowEvent::Started => {}
                WorkflowEvent::Output(output) => return Ok(output),
                WorkflowEvent::Error(err) => return Err(err),
            }
        }
        // The sequence ended without output or error: cancellation
        // closes the stream without a trailing event.
        if self.cancellation.is_cancelled() {
            Err(RunError::Cancelled)
        } else {
            Err(RunError::MissingOutput)
        }
    }
}

/// In-process workflow execution
pub struct ExecutionEngine;

impl ExecutionEngine {
    /// Schedule a run and expose it as an event sequence. Consuming the
    /// returned [WorkflowRun] advances the run; dropping it aborts
    /// nothing until the driver task notices its channel closed.
    pub fn stream(
        graph: WorkflowGraph,
        input: impl Into<String>,
        options: RunOptions,
    ) -> WorkflowRun {
        let input = input.into();
        let (events_tx, events_rx) = mpsc::channel(16);
        let cancellation = options.cancel.clone();
        let task_cancel = options.cancel;
        let timeout = options.timeout;

        tokio::spawn(async move {
            if events_tx.send(WorkflowEvent::Started).await.is_err() {
                return;
            }

            let outcome = tokio::select! {
                _ = task_cancel.cancelled() => Err(RunError::Cancelled),
                res = Self::execute_with_deadline(graph, input, timeout) => res,
            };

            match outcome {
                Ok(output) => {
                    let _ = events_tx.send(WorkflowEvent::Output(output)).await;
                }
                Err(RunError::Cancelled) => {
                    // No further events after cancellation is observed
                    log::info!("Workflow run cancelled");
                }
                Err(err) => {
                    log::error!("Workflow run failed: {}", err);
                    let _ = events_tx.send(WorkflowEvent::Error(err)).await;
                }
            }
        });

        WorkflowRun {
            events: events_rx,
            cancellation,
        }
    }

    /// Convenience wrapper: run to completion and return the output
    pub async fn run(
        graph: WorkflowGraph,
        input: impl Into<String>,
        options: RunOptions,
    ) -> Result<String, RunError> {
        Self::stream(graph, input, options).collect_output().await
    }

    async fn execute_with_deadline(
        graph: WorkflowGraph,
        input: String,
        timeout: Option<Duration>,
    ) -> Result<String, RunError> {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, Self::execute(graph, input)).await {
                Ok(result) => result,
                Err(_) => Err(RunError::Timeout(limit)),
            },
            None => Self::execute(graph, input).await,
        }
    }

    async fn execute(graph: WorkflowGraph, input: String) -> Result<String, RunError> {
        // Fan-out dispatch from the start node is synchronous: no
        // external call happens before the branches are spawned.
        let start = graph
            .node(graph.start())
            .expect("start node registered at build time");
        let (start_ctx, mut start_rx, _start_out) = WorkflowContext::channel(graph.start());

        start
            .handle(ExecutorInput::Text(input), &start_ctx)
            .await
            .map_err(|e| RunError::branch(graph.start(), &e))?;
        drop(start_ctx);

        let mut seeds: Vec<Message> = Vec::new();
        while let Some(msg) = start_rx.recv().await {
            seeds.push(msg);
        }
        if seeds.is_empty() {
            return Err(RunError::Branch {
                node: graph.start().to_string(),
                message: "start executor emitted no messages".to_string(),
            });
        }

        let aggregator = graph
            .node(graph.fan_in_target())
            .expect("fan-in target registered at build time");
        let aggregator_name = graph.fan_in_target().to_string();

        // One output slot for the whole run; the aggregator's context is
        // cloned into every branch so deliveries happen on the branch's
        // own task.
        let (output_tx, mut output_rx) = mpsc::channel::<String>(1);
        let (agg_fwd_tx, _agg_fwd_rx) = mpsc::unbounded_channel::<Message>();
        let agg_ctx = WorkflowContext::new(&aggregator_name, agg_fwd_tx, output_tx);

        let mut branches: JoinSet<Result<(), RunError>> = JoinSet::new();
        for name in graph.fan_out_targets() {
            let node = graph
                .node(name)
                .expect("fan-out target registered at build time");
            let node_name = name.clone();
            let seed_input = if seeds.len() == 1 {
                ExecutorInput::Message(seeds[0].clone())
            } else {
                ExecutorInput::Batch(seeds.clone())
            };
            let aggregator = aggregator.clone();
            let aggregator_name = aggregator_name.clone();
            let agg_ctx = agg_ctx.clone();

            log::info!("Spawning branch: {}", node_name);
            branches.spawn(async move {
                let (ctx, mut forwarded, _branch_out) = WorkflowContext::channel(&node_name);

                node.handle(seed_input, &ctx)
                    .await
                    .map_err(|e| RunError::branch(&node_name, &e))?;
                drop(ctx);

                while let Some(msg) = forwarded.recv().await {
                    aggregator
                        .handle(ExecutorInput::Message(msg), &agg_ctx)
                        .await
                        .map_err(|e| RunError::branch(&aggregator_name, &e))?;
                }

                log::info!("Branch {} completed", node_name);
                Ok(())
            });
        }
        drop(agg_ctx);

        // A failed branch means the barrier can never fill; fail the
        // run immediately instead of waiting on it.
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    branches.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    branches.abort_all();
                    return Err(RunError::Branch {
                        node: "branch".to_string(),
                        message: join_err.to_string(),
                    });
                }
            }
        }

        match output_rx.try_recv() {
            Ok(output) => Ok(output),
            Err(_) => Err(RunError::MissingOutput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::agent::Agent;
    use crate::adk::error::AgentError;
    use crate::confluence::workflow::aggregator::AggregationExecutor;
    use crate::confluence::workflow::builder::WorkflowBuilder;
    use crate::confluence::workflow::executor::{AgentExecutor, Executor, StartExecutor};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Mock agent with a configurable delay and outcome
    struct MockAgent {
        name: String,
        answer: Result<String, String>,
        delay: Duration,
    }

    impl MockAgent {
        fn new(name: &str, answer: &str) -> Self {
            Self {
                name: name.to_string(),
                answer: Ok(answer.to_string()),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn failing(name: &str, error: &str) -> Self {
            Self {
                name: name.to_string(),
                answer: Err(error.to_string()),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Agent for MockAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn invoke(&self, _prompt: &str) -> Result<String, AgentError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(AgentError::Other(msg.clone())),
            }
        }
    }

    fn expert(agent: MockAgent) -> Arc<dyn Executor> {
        Arc::new(AgentExecutor::new(Arc::new(agent)))
    }

    fn two_expert_graph(physicist: MockAgent, chemist: MockAgent) -> WorkflowGraph {
        WorkflowBuilder::new(Arc::new(StartExecutor::default()))
            .add_fan_out_edge("start", vec![expert(physicist), expert(chemist)])
            .add_fan_in_edge(
                &["Physicist", "Chemist"],
                Arc::new(AggregationExecutor::new("aggregator", 2)),
            )
            .with_output_from("aggregator")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_aggregates_both_experts() {
        let graph = two_expert_graph(
            MockAgent::new("Physicist", "Temperature is average kinetic energy."),
            MockAgent::new("Chemist", "Temperature reflects molecular motion."),
        );

        let output = ExecutionEngine::run(graph, "What is temperature?", RunOptions::default())
            .await
            .unwrap();

        assert!(output.contains("Physicist: Temperature is average kinetic energy."));
        assert!(output.contains("Chemist: Temperature reflects molecular motion."));
        assert_eq!(output.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_event_sequence_is_started_then_single_output() {
        let graph = two_expert_graph(
            MockAgent::new("Physicist", "a"),
            MockAgent::new("Chemist", "b"),
        );

        let mut run = ExecutionEngine::stream(graph, "q", RunOptions::default());

        assert_eq!(run.next_event().await, Some(WorkflowEvent::Started));
        match run.next_event().await {
            Some(WorkflowEvent::Output(_)) => {}
            other => panic!("expected output event, got {:?}", other),
        }
        assert_eq!(run.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_joins_in_arrival_order() {
        // The slower branch lands second regardless of wiring order
        let graph = two_expert_graph(
            MockAgent::new("Physicist", "slow answer").with_delay(Duration::from_millis(50)),
            MockAgent::new("Chemist", "fast answer"),
        );

        let output = ExecutionEngine::run(graph, "q", RunOptions::default())
            .await
            .unwrap();

        assert_eq!(
            output,
            "Chemist: fast answer\nPhysicist: slow answer"
        );
    }

    #[tokio::test]
    async fn test_branch_failure_fails_run_without_hanging() {
        let graph = two_expert_graph(
            MockAgent::failing("Physicist", "transport error"),
            MockAgent::new("Chemist", "fine"),
        );

        let err = ExecutionEngine::run(graph, "q", RunOptions::default())
            .await
            .unwrap_err();

        match err {
            RunError::Branch { node, message } => {
                assert_eq!(node, "Physicist");
                assert!(message.contains("transport error"));
            }
            other => panic!("expected branch failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_branch_failure_emits_error_event_and_no_output() {
        let graph = two_expert_graph(
            MockAgent::failing("Physicist", "boom"),
            MockAgent::new("Chemist", "fine"),
        );

        let mut run = ExecutionEngine::stream(graph, "q", RunOptions::default());
        assert_eq!(run.next_event().await, Some(WorkflowEvent::Started));
        match run.next_event().await {
            Some(WorkflowEvent::Error(RunError::Branch { .. })) => {}
            other => panic!("expected error event, got {:?}", other),
        }
        assert_eq!(run.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported_distinctly() {
        let graph = two_expert_graph(
            MockAgent::new("Physicist", "eventually").with_delay(Duration::from_secs(3600)),
            MockAgent::new("Chemist", "fast"),
        );

        let err = ExecutionEngine::run(
            graph,
            "q",
            RunOptions::with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

        assert_eq!(err, RunError::Timeout(Duration::from_millis(100)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_ends_stream_without_output() {
        let graph = two_expert_graph(
            MockAgent::new("Physicist", "done"),
            MockAgent::new("Chemist", "late").with_delay(Duration::from_secs(3600)),
        );

        let options = RunOptions::default();
        let cancel = options.cancel.clone();
        let mut run = ExecutionEngine::stream(graph, "q", options);

        assert_eq!(run.next_event().await, Some(WorkflowEvent::Started));
        cancel.cancel();
        assert_eq!(run.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_classifies_as_cancelled() {
        let graph = two_expert_graph(
            MockAgent::new("Physicist", "done"),
            MockAgent::new("Chemist", "late").with_delay(Duration::from_secs(3600)),
        );

        let mut run = ExecutionEngine::stream(graph, "q", RunOptions::default());
        assert_eq!(run.next_event().await, Some(WorkflowEvent::Started));
        run.cancel();

        let err = run.collect_output().await.unwrap_err();
        assert_eq!(err, RunError::Cancelled);
    }

    #[tokio::test]
    async fn test_underfilled_barrier_reports_missing_output() {
        // Aggregator expects three contributions but only two branches
        // exist: a wiring bug the engine must surface, not hang on.
        let graph = WorkflowBuilder::new(Arc::new(StartExecutor::default()))
            .add_fan_out_edge(
                "start",
                vec![
                    expert(MockAgent::new("Physicist", "a")),
                    expert(MockAgent::new("Chemist", "b")),
                ],
            )
            .add_fan_in_edge(
                &["Physicist", "Chemist"],
                Arc::new(AggregationExecutor::new("aggregator", 3)),
            )
            .with_output_from("aggregator")
            .build()
            .unwrap();

        let err = ExecutionEngine::run(graph, "q", RunOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, RunError::MissingOutput);
    }

    #[tokio::test]
    async fn test_single_branch_workflow() {
        let graph = WorkflowBuilder::new(Arc::new(StartExecutor::default()))
            .add_fan_out_edge("start", vec![expert(MockAgent::new("Solo", "only answer"))])
            .add_fan_in_edge(
                &["Solo"],
                Arc::new(AggregationExecutor::new("aggregator", 1)),
            )
            .with_output_from("aggregator")
            .build()
            .unwrap();

        let output = ExecutionEngine::run(graph, "q", RunOptions::default())
            .await
            .unwrap();
        assert_eq!(output, "Solo: only answer");
    }
}
