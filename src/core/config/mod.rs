pub mod paths;

pub use paths::StorePaths;

use serde::{Deserialize, Serialize};

/// Tunables for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between neighboring chunks in characters.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
    /// Bounded wait between releasing the index handle and deleting its
    /// storage directory. The OS does not guarantee file locks are free the
    /// instant the pool closes; environments with strict synchronous release
    /// may set this to 0.
    pub release_grace_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            release_grace_ms: 400,
        }
    }
}

impl RagConfig {
    pub fn validate(&self) -> Result<(), super::errors::RagError> {
        if self.chunk_size == 0 {
            return Err(super::errors::RagError::Configuration(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(super::errors::RagError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(super::errors::RagError::Configuration(
                "top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let config = RagConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
