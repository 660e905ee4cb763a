// SPDX-License-Identifier: MIT

//! Agent module - the "answer a prompt" capability
//!
//! An [Agent] is an opaque asynchronous capability: given a prompt it
//! produces one answer. [ChatAgent] is the standard implementation,
//! delegating to a chat [Model] with fixed instructions.

use crate::adk::error::AgentError;
use crate::adk::model::{CompletionRequest, Model};
use async_trait::async_trait;
use std::sync::Arc;

/// Core agent trait
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent name
    fn name(&self) -> &str;

    /// Returns the agent description
    fn description(&self) -> &str {
        ""
    }

    /// Answer a single prompt
    async fn invoke(&self, prompt: &str) -> Result<String, AgentError>;
}

/// Chat-backed agent: a name, fixed instructions, and a model handle
pub struct ChatAgent {
    name: String,
    description: String,
    instructions: String,
    model: Arc<dyn Model>,
    response_schema: Option<serde_json::Value>,
}

impl ChatAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
        model: Arc<dyn Model>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
            model,
            response_schema: None,
        }
    }

    /// Constrain replies to JSON matching the given schema
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, prompt: &str) -> Result<String, AgentError> {
        log::info!("Agent {} answering prompt ({} chars)", self.name, prompt.len());

        let mut request = CompletionRequest::new(&self.instructions, prompt);
        if let Some(schema) = &self.response_schema {
            request = request.with_response_schema(schema);
        }

        let answer = self.model.complete(request).await?;
        log::info!(
            "Agent {} produced answer ({} chars)",
            self.name,
            answer.len()
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ModelError;
    use std::sync::Mutex;

    /// Mock model that records the requests it receives
    struct MockModel {
        reply: String,
        seen: Mutex<Vec<(String, String, bool)>>,
    }

    impl MockModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Model for MockModel {
        async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ModelError> {
            self.seen.lock().unwrap().push((
                request.instructions.to_string(),
                request.prompt.to_string(),
                request.response_schema.is_some(),
            ));
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_chat_agent_delegates_to_model() {
        let model = Arc::new(MockModel::new("Temperature is average kinetic energy."));
        let agent = ChatAgent::new(
            "Physicist",
            "physics expert",
            "You answer from a physics perspective.",
            model.clone(),
        );

        let answer = agent.invoke("What is temperature?").await.unwrap();
        assert_eq!(answer, "Temperature is average kinetic energy.");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "You answer from a physics perspective.");
        assert_eq!(seen[0].1, "What is temperature?");
        assert!(!seen[0].2);
    }

    #[tokio::test]
    async fn test_chat_agent_passes_response_schema() {
        let model = Arc::new(MockModel::new(r#"{"answer": "yes"}"#));
        let agent = ChatAgent::new("Validator", "", "Validate.", model.clone())
            .with_response_schema(serde_json::json!({"type": "object"}));

        let answer = agent.invoke("Is this fraudulent?").await.unwrap();
        assert_eq!(answer, r#"{"answer": "yes"}"#);
        assert!(model.seen.lock().unwrap()[0].2);
    }
}
