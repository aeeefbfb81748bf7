//! [`LanguageModel`] implementation backed by an OpenAI-compatible API.

use async_trait::async_trait;
use llm_client::{ChatRequest, LlmClient, LlmClientError, Message};

use crate::error::LlmError;
use crate::traits::llm::{CompletionRequest, LanguageModel};

/// Language model served by an OpenAI-compatible chat endpoint.
pub struct OpenAiModel {
    client: LlmClient,
    model: String,
}

impl OpenAiModel {
    /// Create a model handle for the given client and model name.
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        let client = LlmClient::from_env().map_err(map_client_error)?;
        Ok(Self::new(client, model))
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let mut chat = ChatRequest::new(&self.model)
            .message(Message::system(request.system))
            .message(Message::user(request.prompt))
            .temperature(request.temperature);

        if let Some(mut schema) = request.schema {
            llm_client::schema::strictify(&mut schema);
            chat = chat.json_schema("pipeline_response", schema);
        }

        let response = self.client.chat(chat).await.map_err(map_client_error)?;
        Ok(response.content)
    }
}

fn map_client_error(error: LlmClientError) -> LlmError {
    match error {
        LlmClientError::Network(message) => LlmError::Transport(message),
        LlmClientError::Parse(message) => LlmError::MalformedResponse(message),
        LlmClientError::Api { status, message } => {
            LlmError::Api(format!("status {status}: {message}"))
        }
        LlmClientError::Config(message) => LlmError::Api(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_llm_errors() {
        let err = map_client_error(LlmClientError::Api {
            status: 429,
            message: "rate limited".into(),
        });
        assert!(matches!(err, LlmError::Api(_)));
        assert!(err.to_string().contains("429"));

        let err = map_client_error(LlmClientError::Parse("bad json".into()));
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }
}
