use async_trait::async_trait;

pub mod gemini;

pub use gemini::GeminiClient;

/// One-shot text completion against a generative model.
///
/// Every call is independent; no conversation history is kept between calls.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Returns `None` when the provider answered without any text.
    async fn complete(&self, prompt: &str) -> crate::Result<Option<String>>;
}
