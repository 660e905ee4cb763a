// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions API implementation
//!
//! Works against any OpenAI-compatible endpoint (the official API,
//! Azure OpenAI, or the GitHub Models inference endpoint) selected via
//! `OPENAI_BASE_URL`.

use super::{CompletionRequest, Model};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;

/// OpenAI chat-completions model implementation
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String) -> Result<Self, ModelError> {
        let api_key =
            env::var("OPENAI_API_KEY").map_err(|_| ModelError::ApiKeyMissing("OpenAI".into()))?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url,
        })
    }

    /// Build the request body for a completion
    fn build_body(&self, request: &CompletionRequest<'_>) -> serde_json::Value {
        let mut body = json!({
            "model": self.model_name,
            "messages": [
                { "role": "system", "content": request.instructions },
                { "role": "user", "content": request.prompt }
            ]
        });

        if let Some(schema) = request.response_schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "schema": schema,
                    "strict": true
                }
            });
        }

        body
    }

    /// Pull the assistant text out of a chat-completions response
    fn parse_response(response: &serde_json::Value) -> Result<String, ModelError> {
        if let Some(error) = response.get("error") {
            let message = error["message"].as_str().unwrap_or("unknown error");
            return Err(ModelError::api("OpenAI", message));
        }

        let content = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| {
                ModelError::InvalidResponse("No message content in OpenAI response".to_string())
            })?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request);

        log::info!(
            "OpenAI request to {} with model {}",
            url,
            self.model_name
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let value: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = value["error"]["message"]
                .as_str()
                .unwrap_or("request failed")
                .to_string();
            log::error!("OpenAI request failed ({}): {}", status, message);
            return Err(ModelError::api("OpenAI", format!("{}: {}", status, message)));
        }

        Self::parse_response(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_model() -> OpenAIModel {
        OpenAIModel {
            client: Client::new(),
            api_key: "test-key".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            base_url: "https://example.invalid/v1".to_string(),
        }
    }

    #[test]
    fn test_build_body_plain() {
        let model = test_model();
        let req = CompletionRequest::new("You are a physicist.", "What is temperature?");
        let body = model.build_body(&req);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "What is temperature?");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_build_body_with_schema() {
        let model = test_model();
        let schema = json!({"type": "object", "properties": {"answer": {"type": "string"}}});
        let req = CompletionRequest::new("inst", "prompt").with_response_schema(&schema);
        let body = model.build_body(&req);

        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(
            body["response_format"]["json_schema"]["schema"]["type"],
            "object"
        );
    }

    #[test]
    fn test_parse_response_text() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "42 degrees" } }]
        });

        let text = OpenAIModel::parse_response(&response).unwrap();
        assert_eq!(text, "42 degrees");
    }

    #[test]
    fn test_parse_response_error_body() {
        let response = json!({ "error": { "message": "invalid api key" } });

        let err = OpenAIModel::parse_response(&response).unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
    }

    #[test]
    fn test_parse_response_missing_choices() {
        let response = json!({ "choices": [] });

        let err = OpenAIModel::parse_response(&response).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
