//! Language-model trait: the seam between the pipeline and the LLM
//! service.
//!
//! The service is consumed as a black box: one prompt in, one structured or
//! free-text response out. Implementations wrap specific providers; the
//! pipeline validates response shape itself and treats malformed output as
//! a per-task failure, never a fatal error.

use async_trait::async_trait;

use crate::error::LlmError;

/// A single completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt; built once per run and shared across batch calls so
    /// the service context is warm-started once
    pub system: String,

    /// User prompt
    pub prompt: String,

    /// JSON schema constraining the response, when the caller needs
    /// structured output
    pub schema: Option<serde_json::Value>,

    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create a request with the given system and user prompts.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            schema: None,
            temperature: 0.0,
        }
    }

    /// Constrain the response to a JSON schema.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Language-model service consumed by the classifier and synthesizer.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt, returning the raw response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
