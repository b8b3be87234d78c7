use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, GenerationProvider};
use crate::core::errors::RagError;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub base_url: String,
    /// Bearer token; local servers (LM Studio, llama.cpp) run without one.
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub chat_model: String,
}

impl OpenAiCompatConfig {
    pub fn validate(&self) -> Result<(), RagError> {
        if self.base_url.trim().is_empty() {
            return Err(RagError::Configuration(
                "provider base URL must not be empty".to_string(),
            ));
        }
        if self.embedding_model.trim().is_empty() || self.chat_model.trim().is_empty() {
            return Err(RagError::Configuration(
                "embedding and chat model identifiers must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Client for any server speaking the OpenAI HTTP surface
/// (`/v1/embeddings`, `/v1/chat/completions`).
///
/// Stateless apart from the connection pool; one instance serves every
/// session concurrently.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    config: OpenAiCompatConfig,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self {
            config: OpenAiCompatConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client: Client::new(),
        })
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let builder = self.client.post(url);
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.config.embedding_model,
            "input": inputs,
        });

        let res = self
            .request("/v1/embeddings")
            .json(&body)
            .send()
            .await
            .map_err(RagError::provider)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Provider(format!(
                "embeddings request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::provider)?;

        let data = payload["data"]
            .as_array()
            .ok_or_else(|| RagError::Provider("embeddings response missing 'data'".to_string()))?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let vals = item["embedding"].as_array().ok_or_else(|| {
                RagError::Provider("embeddings response entry missing 'embedding'".to_string())
            })?;
            let vec: Vec<f32> = vals
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            embeddings.push(vec);
        }

        if embeddings.len() != inputs.len() {
            return Err(RagError::Provider(format!(
                "embeddings response returned {} vectors for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl GenerationProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let body = json!({
            "model": self.config.chat_model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });

        let res = self
            .request("/v1/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(RagError::provider)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Provider(format!(
                "chat request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::provider)?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                RagError::Provider("chat response missing message content".to_string())
            })?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OpenAiCompatConfig {
        OpenAiCompatConfig {
            base_url: "http://localhost:1234/".to_string(),
            api_key: None,
            embedding_model: "text-embedding-test".to_string(),
            chat_model: "chat-test".to_string(),
        }
    }

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let provider = OpenAiCompatProvider::new(config()).unwrap();
        assert_eq!(provider.config.base_url, "http://localhost:1234");
    }

    #[test]
    fn empty_model_identifiers_are_rejected() {
        let bad = OpenAiCompatConfig {
            chat_model: String::new(),
            ..config()
        };
        assert!(matches!(
            OpenAiCompatProvider::new(bad),
            Err(RagError::Configuration(_))
        ));
    }
}
