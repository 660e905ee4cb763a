// SPDX-License-Identifier: MIT

//! Aggregation barrier executor
//!
//! Buffers one contribution per concurrent branch and releases a single
//! merged output the instant the configured contributor count is
//! reached. The append-and-check sequence runs under one mutex so two
//! concurrent deliveries can never both observe the barrier as
//! one-short-of-full and both emit.

use crate::adk::error::ExecutorError;
use crate::confluence::workflow::executor::{Executor, ExecutorInput, WorkflowContext};
use crate::confluence::workflow::message::Message;
use async_trait::async_trait;
use std::sync::Mutex;

struct BarrierState {
    messages: Vec<Message>,
    completed: bool,
}

/// Stateful executor that joins `expected_count` messages into one
/// output. A fresh instance must be created per run; the accumulator is
/// append-only and never re-arms after releasing.
pub struct AggregationExecutor {
    name: String,
    expected_count: usize,
    state: Mutex<BarrierState>,
}

impl AggregationExecutor {
    pub fn new(name: impl Into<String>, expected_count: usize) -> Self {
        Self {
            name: name.into(),
            expected_count,
            state: Mutex::new(BarrierState {
                messages: Vec::with_capacity(expected_count),
                completed: false,
            }),
        }
    }

    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    /// Number of contributions received so far
    pub fn received_count(&self) -> usize {
        self.state.lock().expect("barrier state poisoned").messages.len()
    }

    /// Join buffered messages as `"{author}: {text}"` lines, in the
    /// order they arrived. Arrival order depends on branch timing and is
    /// deliberately not sorted by branch identity.
    fn format_output(messages: &[Message]) -> String {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.author, m.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Executor for AggregationExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        input: ExecutorInput,
        ctx: &WorkflowContext,
    ) -> Result<(), ExecutorError> {
        let incoming = match input {
            ExecutorInput::Message(msg) => vec![msg],
            ExecutorInput::Batch(msgs) => msgs,
            ExecutorInput::Text(_) => {
                return Err(ExecutorError::UnsupportedInput {
                    node: self.name.clone(),
                })
            }
        };

        // Append and check atomically; only the caller that fills the
        // barrier leaves this block holding the formatted output.
        let released = {
            let mut state = self.state.lock().expect("barrier state poisoned");

            if state.completed {
                log::error!(
                    "Aggregator {} received delivery after completing ({} expected)",
                    self.name,
                    self.expected_count
                );
                return Err(ExecutorError::overdelivery(&self.name));
            }

            state.messages.extend(incoming);

            if state.messages.len() >= self.expected_count {
                state.completed = true;
                Some(Self::format_output(&state.messages))
            } else {
                None
            }
        };

        if let Some(output) = released {
            log::info!(
                "Aggregator {} completed with {} contributions",
                self.name,
                self.expected_count
            );
            ctx.yield_output(output).await?;
        }

        Ok(())
    }
}
