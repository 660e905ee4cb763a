// SPDX-License-Identifier: MIT

//! Workflow builder - validates and assembles a workflow graph
//!
//! Mirrors the shape of the runs this engine supports: a start executor,
//! one fan-out edge to the concurrent branches, one fan-in edge into the
//! aggregator, and a designated output executor. All wiring mistakes are
//! rejected here, before any execution begins.

use crate::adk::error::BuildError;
use crate::confluence::workflow::executor::Executor;
use crate::confluence::workflow::graph::WorkflowGraph;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Builder for [WorkflowGraph]
pub struct WorkflowBuilder {
    nodes: HashMap<String, Arc<dyn Executor>>,
    duplicates: Vec<String>,
    start: String,
    fan_out: Option<(String, Vec<String>)>,
    fan_in: Option<(Vec<String>, String)>,
    output: Option<String>,
}

impl WorkflowBuilder {
    /// Start a workflow rooted at the given executor
    pub fn new(start: Arc<dyn Executor>) -> Self {
        let start_name = start.name().to_string();
        let mut builder = Self {
            nodes: HashMap::new(),
            duplicates: Vec::new(),
            start: start_name,
            fan_out: None,
            fan_in: None,
            output: None,
        };
        builder.register(start);
        builder
    }

    fn register(&mut self, executor: Arc<dyn Executor>) {
        let name = executor.name().to_string();
        if self.nodes.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.nodes.insert(name, executor);
        }
    }

    /// Route the named source's output to every target, registering the
    /// targets as nodes
    pub fn add_fan_out_edge(mut self, source: &str, targets: Vec<Arc<dyn Executor>>) -> Self {
        let target_names = targets.iter().map(|t| t.name().to_string()).collect();
        for target in targets {
            self.register(target);
        }
        self.fan_out = Some((source.to_string(), target_names));
        self
    }

    /// Route every named source's output to the target, registering the
    /// target as a node
    pub fn add_fan_in_edge(mut self, sources: &[&str], target: Arc<dyn Executor>) -> Self {
        let target_name = target.name().to_string();
        self.register(target);
        let source_names = sources.iter().map(|s| s.to_string()).collect();
        self.fan_in = Some((source_names, target_name));
        self
    }

    /// Designate the executor whose yielded value is the run's output
    pub fn with_output_from(mut self, node: &str) -> Self {
        self.output = Some(node.to_string());
        self
    }

    /// Validate the wiring and produce an immutable graph.
    /// No execution begins here.
    pub fn build(self) -> Result<WorkflowGraph, BuildError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(BuildError::DuplicateExecutor(name));
        }

        let (fan_out_source, fan_out_targets) =
            self.fan_out.ok_or(BuildError::EmptyFanOut)?;
        if fan_out_targets.is_empty() {
            return Err(BuildError::EmptyFanOut);
        }
        if !self.nodes.contains_key(&fan_out_source) {
            return Err(BuildError::DanglingEdge(fan_out_source));
        }

        let (fan_in_sources, fan_in_target) = self.fan_in.ok_or(BuildError::MissingFanIn)?;

        // The fan-in sources and fan-out targets must name the same set
        // of executors: that is what keeps the topology a single
        // fan-out/fan-in stage.
        let target_set: HashSet<&str> = fan_out_targets.iter().map(|s| s.as_str()).collect();
        for source in &fan_in_sources {
            if !self.nodes.contains_key(source) || !target_set.contains(source.as_str()) {
                return Err(BuildError::DanglingEdge(source.clone()));
            }
        }
        let source_set: HashSet<&str> = fan_in_sources.iter().map(|s| s.as_str()).collect();
        for target in &fan_out_targets {
            if !source_set.contains(target.as_str()) {
                return Err(BuildError::UnjoinedBranch(target.clone()));
            }
        }

        let output_node = self.output.ok_or(BuildError::MissingOutput)?;
        if !self.nodes.contains_key(&output_node) {
            return Err(BuildError::DanglingEdge(output_node));
        }

        log::info!(
            "Built workflow graph: {} -> {:?} -> {}",
            self.start,
            fan_out_targets,
            fan_in_target
        );

        Ok(WorkflowGraph::new(
            self.nodes,
            self.start,
            fan_out_targets,
            fan_in_sources,
            fan_in_target,
            output_node,
        ))
    }
}
