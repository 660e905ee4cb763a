// SPDX-License-Identifier: MIT

//! Typed error handling for confluence-rs
//!
//! This module provides the error type hierarchy using thiserror. Each
//! layer has its own error type; `ConfluenceError` is the top-level
//! wrapper used at the crate boundary.

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for confluence-rs
#[derive(Debug, Error)]
pub enum ConfluenceError {
    /// Graph construction errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Run-level failures (branch failure, timeout, cancellation)
    #[error("Run error: {0}")]
    Run(#[from] RunError),

    /// Model/provider errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper for compatibility
    #[error("{0}")]
    Other(String),
}

impl ConfluenceError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for ConfluenceError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for ConfluenceError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

/// Errors rejected at graph construction, before any run starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// An edge references an executor that was never registered, or a
    /// fan-in source that is not one of the fan-out targets
    #[error("Edge references unknown executor: {0}")]
    DanglingEdge(String),

    /// The workflow has no fan-out targets
    #[error("Workflow has no fan-out targets")]
    EmptyFanOut,

    /// No fan-in edge was added
    #[error("Workflow has no fan-in edge")]
    MissingFanIn,

    /// A fan-out target is not wired into the fan-in stage, so its
    /// branch output would never reach the aggregator
    #[error("Fan-out target '{0}' is not a fan-in source")]
    UnjoinedBranch(String),

    /// No output executor was designated
    #[error("Workflow has no output executor")]
    MissingOutput,

    /// Two executors were registered under the same name
    #[error("Duplicate executor name: {0}")]
    DuplicateExecutor(String),
}

/// Errors raised by a single executor invocation
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The agent call behind an executor failed
    #[error("Agent call in executor '{node}' failed: {source}")]
    Agent {
        node: String,
        #[source]
        source: AgentError,
    },

    /// A delivery arrived at an aggregator after it already emitted its
    /// output
    #[error("Executor '{node}' received a delivery after completing")]
    Overdelivery { node: String },

    /// The executor received an input shape it does not handle
    #[error("Executor '{node}' received unsupported input")]
    UnsupportedInput { node: String },

    /// The workflow context channel was closed before the executor
    /// finished emitting
    #[error("Executor '{node}' lost its output channel")]
    ChannelClosed { node: String },
}

impl ExecutorError {
    pub fn agent(node: impl Into<String>, source: AgentError) -> Self {
        Self::Agent {
            node: node.into(),
            source,
        }
    }

    pub fn overdelivery(node: impl Into<String>) -> Self {
        Self::Overdelivery { node: node.into() }
    }
}

/// Run-level failure classification, surfaced to the run's caller.
///
/// Carries flattened messages rather than source chains so events can be
/// cloned and serialized onto the run's event stream.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RunError {
    /// A branch failed before delivering to the aggregator
    #[error("Branch '{node}' failed: {message}")]
    Branch { node: String, message: String },

    /// The run's deadline elapsed before the aggregator completed
    #[error("Run timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled by the caller
    #[error("Run was cancelled")]
    Cancelled,

    /// All branches completed but no output was emitted (the aggregator
    /// never reached its expected count - a wiring bug)
    #[error("Run ended without an output")]
    MissingOutput,
}

impl RunError {
    pub fn branch(node: impl Into<String>, source: &ExecutorError) -> Self {
        Self::Branch {
            node: node.into(),
            message: source.to_string(),
        }
    }
}

/// Agent-level errors
#[derive(Debug, Error)]
pub enum AgentError {
    /// The underlying model call failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Generic agent failure
    #[error("{0}")]
    Other(String),
}

impl From<&str> for AgentError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for AgentError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Error response from the provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Transport-level failure
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
