// SPDX-License-Identifier: MIT

//! Model module - defines the chat-completion trait and implementations
//!
//! Model implementations are in their own submodules:
//! - [openai] - OpenAI-compatible chat completions API

pub mod openai;

use crate::adk::error::ModelError;
use async_trait::async_trait;

/// A single chat-completion request: system instructions, one user
/// prompt, and an optional JSON schema constraining the response.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest<'a> {
    pub instructions: &'a str,
    pub prompt: &'a str,
    /// When set, the provider is asked to return JSON matching this
    /// schema (structured output); the reply is the raw JSON text.
    pub response_schema: Option<&'a serde_json::Value>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(instructions: &'a str, prompt: &'a str) -> Self {
        Self {
            instructions,
            prompt,
            response_schema: None,
        }
    }

    pub fn with_response_schema(mut self, schema: &'a serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Core trait for chat model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Run one completion and return the assistant's text
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ModelError>;
}
