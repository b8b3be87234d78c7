use thiserror::Error;

/// Error taxonomy for the RAG core.
///
/// "Answer is not in the context" outcomes are *not* errors; they are
/// ordinary [`crate::rag::Answer`] values carrying the fallback sentence.
/// Every variant here is a genuine failure of the pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// Required credentials, model configuration or session identifier are
    /// missing or invalid. Fatal at startup; the binary must not serve.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The document could not be read, or extraction yielded no text.
    /// The session stays usable; the index is unchanged.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    /// An operation was issued against a session whose index has been
    /// released. The caller must reopen the session before retrying.
    #[error("session not ready: {0}")]
    NotReady(String),

    /// An embedding or generation call failed. Not retried by the core.
    #[error("provider error: {0}")]
    Provider(String),

    /// Index open/persist failed, or embedding dimensions were mixed.
    /// Fatal for that session only.
    #[error("storage error: {0}")]
    Storage(String),
}

impl RagError {
    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        RagError::Provider(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }
}
