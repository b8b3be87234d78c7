//! Retrieval-augmented query engine.
//!
//! Embeds the question, retrieves the top-k most similar chunks from the
//! session's index, and constrains the generation model to the retrieved
//! context through a fixed prompt template. The template's "not found"
//! instruction is the backstop against hallucination; retrieval alone cannot
//! guarantee the context is relevant.

use std::sync::Arc;

use super::index::SqliteVectorIndex;
use crate::core::errors::RagError;
use crate::llm::{EmbeddingProvider, GenerationProvider};

/// The sentence the assistant must produce when the context does not contain
/// the answer. A normal, successful answer value, never an error.
pub const FALLBACK_ANSWER: &str =
    "Based on the provided documents, I could not find the exact answer or data required.";

/// A generated answer. `grounded` records whether any chunks were retrieved;
/// ungrounded answers carry the fallback sentence.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub grounded: bool,
}

pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            generator,
            top_k,
        }
    }

    /// Answer `question` from the given index.
    ///
    /// With zero retrieved chunks there is nothing to ground an answer in, so
    /// the fallback sentence is returned directly without invoking the
    /// generation model.
    pub async fn answer(
        &self,
        question: &str,
        index: &SqliteVectorIndex,
    ) -> Result<Answer, RagError> {
        let embedded = self.embedder.embed(&[question.to_string()]).await?;
        let query_embedding = embedded.into_iter().next().ok_or_else(|| {
            RagError::Provider("embedding provider returned no vector for the question".to_string())
        })?;

        let hits = index.search(&query_embedding, self.top_k).await?;

        if hits.is_empty() {
            tracing::debug!("no chunks retrieved; returning fallback answer");
            return Ok(Answer {
                text: FALLBACK_ANSWER.to_string(),
                grounded: false,
            });
        }

        let context = hits
            .iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = fill_prompt(&context, question);
        let text = self.generator.generate(&prompt).await?;

        Ok(Answer {
            text,
            grounded: true,
        })
    }
}

/// Fill the fixed answer template with context and question.
pub(crate) fn fill_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a highly professional, accurate, and specialized knowledge assistant.\n\
         Your goal is to answer the user's question ONLY and STRICTLY based on the context provided below.\n\
         \n\
         The context is extracted from the document(s) loaded for this specific session.\n\
         You must analyze all structured data (like tables or lists) in the context to find the exact details.\n\
         \n\
         If the exact answer, specific data, or rule is not found in the context, clearly state:\n\
         \"{fallback}\"\n\
         \n\
         Answer in a professional, human-like, and neutral tone.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Answer:",
        fallback = FALLBACK_ANSWER,
        context = context,
        question = question,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_context_question_and_fallback_instruction() {
        let prompt = fill_prompt("Total: 42 units", "What is the total?");
        assert!(prompt.contains("Context:\nTotal: 42 units"));
        assert!(prompt.contains("Question:\nWhat is the total?"));
        assert!(prompt.contains(FALLBACK_ANSWER));
        assert!(prompt.ends_with("Answer:"));
    }
}
