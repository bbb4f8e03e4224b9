//! Generative model access.
//!
//! Both the LLM judge and the rewrite step talk to a [`TextGenerator`]. The only
//! production implementation is [`gemini::GeminiClient`]; tests substitute scripted
//! generators.

pub mod gemini;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// One generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt_text: String,
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A text-in, text-out generative service.
///
/// An empty string is a valid response; callers decide whether it counts as failure.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
