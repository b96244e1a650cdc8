use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant for a note-taking app. Provide concise, accurate responses.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }
}

/// Turns a single prompt into completion text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for std::sync::Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        (**self).complete(request).await
    }
}
