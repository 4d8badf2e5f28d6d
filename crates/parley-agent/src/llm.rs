//! Reply generation over the Azure OpenAI chat completions endpoint.
//!
//! Azure hosts OpenAI models with slightly different API conventions: the
//! deployment name lives in the URL rather than the request body,
//! authentication uses the `api-key` header, and an `api-version` query
//! parameter is required. The pipeline is request/response per turn, so
//! only the non-streaming response shape is modeled.

use async_trait::async_trait;
use parley_types::ChatMessage;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::error::GenerationError;
use crate::traits::ReplyGenerator;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generates the next assistant message from the conversation context.
#[derive(Debug, Clone)]
pub struct ChatService {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(config: ChatConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }
}

#[async_trait]
impl ReplyGenerator for ChatService {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.config.api_key)
            .json(&ChatCompletionRequest { messages })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(GenerationError::EmptyReply)?;

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_includes_deployment_and_api_version() {
        let service = ChatService::new(ChatConfig {
            endpoint: "https://example.openai.azure.com".to_string(),
            api_key: "k".to_string(),
            deployment: "gpt-35-turbo".to_string(),
            api_version: "2024-06-01".to_string(),
            timeout_secs: 30,
        })
        .unwrap();

        assert_eq!(
            service.completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-35-turbo/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn response_parsing_tolerates_missing_fields() {
        let completion: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(completion.choices.is_empty());

        let completion: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":" hola "}}]}"#).unwrap();
        let content = completion.choices[0]
            .message
            .as_ref()
            .and_then(|m| m.content.as_deref());
        assert_eq!(content, Some(" hola "));
    }
}
