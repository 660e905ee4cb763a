// SPDX-License-Identifier: MIT

//! Concurrent fan-out/fan-in workflow engine

pub mod aggregator;
pub mod builder;
pub mod engine;
pub mod executor;
pub mod graph;
pub mod message;
pub mod registry;

pub use aggregator::AggregationExecutor;
pub use builder::WorkflowBuilder;
pub use engine::{ExecutionEngine, RunOptions, WorkflowEvent, WorkflowRun};
pub use executor::{AgentExecutor, Executor, ExecutorInput, StartExecutor, WorkflowContext};
pub use graph::WorkflowGraph;
pub use message::Message;
pub use registry::AgentRegistry;
