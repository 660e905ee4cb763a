// SPDX-License-Identifier: MIT

//! Workflow graph - immutable description of nodes and edges
//!
//! The supported topology is exactly one fan-out stage followed by one
//! fan-in stage: start -> N targets -> aggregator. Construction goes
//! through [crate::confluence::workflow::builder::WorkflowBuilder],
//! which validates the shape.

use crate::confluence::workflow::executor::Executor;
use std::collections::HashMap;
use std::sync::Arc;

/// Validated, immutable workflow description
pub struct WorkflowGraph {
    nodes: HashMap<String, Arc<dyn Executor>>,
    start: String,
    fan_out_targets: Vec<String>,
    fan_in_sources: Vec<String>,
    fan_in_target: String,
    output_node: String,
}

impl WorkflowGraph {
    pub(crate) fn new(
        nodes: HashMap<String, Arc<dyn Executor>>,
        start: String,
        fan_out_targets: Vec<String>,
        fan_in_sources: Vec<String>,
        fan_in_target: String,
        output_node: String,
    ) -> Self {
        Self {
            nodes,
            start,
            fan_out_targets,
            fan_in_sources,
            fan_in_target,
            output_node,
        }
    }

    /// Look up a registered executor by name
    pub fn node(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.nodes.get(name).cloned()
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    /// Fan-out targets in registration order
    pub fn fan_out_targets(&self) -> &[String] {
        &self.fan_out_targets
    }

    /// Fan-in sources in registration order
    pub fn fan_in_sources(&self) -> &[String] {
        &self.fan_in_sources
    }

    pub fn fan_in_target(&self) -> &str {
        &self.fan_in_target
    }

    pub fn output_node(&self) -> &str {
        &self.output_node
    }

    /// Number of contributions the fan-in stage expects
    pub fn expected_contributions(&self) -> usize {
        self.fan_in_sources.len()
    }
}

impl std::fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("start", &self.start)
            .field("fan_out_targets", &self.fan_out_targets)
            .field("fan_in_target", &self.fan_in_target)
            .field("output_node", &self.output_node)
            .finish()
    }
}
