use async_trait::async_trait;

use crate::core::errors::RagError;

/// Maps text to fixed-dimension vectors.
///
/// The dimension is constant for the lifetime of a configuration, and the
/// mapping must be deterministic for identical text and configuration. Used
/// at both ingestion and query time; implementations are stateless and shared
/// by all sessions.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the provider name (e.g. "openai_compat", "mock")
    fn name(&self) -> &str;

    /// Embed a batch of inputs, one vector per input, in order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Produces a text answer from a filled prompt. May be non-deterministic.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}
