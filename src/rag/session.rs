//! Session store: one isolated knowledge base per session identifier.
//!
//! Owns the session's vector index for its full lifecycle: lazily loaded
//! from disk on construction (or initialized empty), fed by `ingest`,
//! queried through the RAG engine, and torn down by `destroy`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::engine::{Answer, QueryEngine};
use super::index::SqliteVectorIndex;
use super::splitter::{DocumentChunk, RecursiveSplitter};
use crate::core::config::{RagConfig, StorePaths};
use crate::core::errors::RagError;
use crate::extract::DocumentExtractor;
use crate::llm::{EmbeddingProvider, GenerationProvider};

/// What an ingestion run added to the index.
#[derive(Debug, Clone, Copy)]
pub struct IngestReport {
    pub segments: usize,
    pub chunks_indexed: usize,
}

pub struct SessionStore {
    session_id: String,
    store_dir: PathBuf,
    release_grace: Duration,
    splitter: RecursiveSplitter,
    extractor: Arc<dyn DocumentExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    engine: QueryEngine,
    /// Taken by `destroy`; `None` afterwards, and every operation other than
    /// `destroy` reports NotReady.
    index: RwLock<Option<SqliteVectorIndex>>,
}

impl SessionStore {
    /// Open the session `session_id`, loading its index from disk if one was
    /// persisted earlier, or initializing an empty one.
    pub async fn open(
        session_id: impl Into<String>,
        paths: &StorePaths,
        config: &RagConfig,
        extractor: Arc<dyn DocumentExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self, RagError> {
        config.validate()?;
        let session_id = session_id.into();
        let store_dir = paths.session_dir(&session_id)?;

        let index = SqliteVectorIndex::open(store_dir.clone()).await?;
        let stored = index.count().await?;
        tracing::info!(session = %session_id, chunks = stored, "session store opened");

        Ok(Self {
            session_id,
            store_dir,
            release_grace: Duration::from_millis(config.release_grace_ms),
            splitter: RecursiveSplitter::new(config.chunk_size, config.chunk_overlap),
            extractor,
            embedder: embedder.clone(),
            engine: QueryEngine::new(embedder, generator, config.top_k),
            index: RwLock::new(Some(index)),
        })
    }

    /// Like [`SessionStore::open`], but if the persisted index cannot be
    /// opened, discards it and starts the session over with an empty index.
    ///
    /// This is the degraded-recovery path for a corrupt store. The data loss
    /// is explicit here and logged loudly; plain `open` never does this.
    pub async fn open_or_recover(
        session_id: impl Into<String>,
        paths: &StorePaths,
        config: &RagConfig,
        extractor: Arc<dyn DocumentExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self, RagError> {
        let session_id = session_id.into();
        match Self::open(
            session_id.clone(),
            paths,
            config,
            extractor.clone(),
            embedder.clone(),
            generator.clone(),
        )
        .await
        {
            Err(RagError::Storage(reason)) => {
                tracing::warn!(
                    session = %session_id,
                    %reason,
                    "persisted index unreadable; discarding it and reinitializing empty"
                );
                let dir = paths.session_dir(&session_id)?;
                if dir.exists() {
                    tokio::fs::remove_dir_all(&dir)
                        .await
                        .map_err(RagError::storage)?;
                }
                Self::open(session_id, paths, config, extractor, embedder, generator).await
            }
            other => other,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Extract, chunk, embed and index one document, then persist.
    ///
    /// An unreadable file or a document with no extractable text is an
    /// ingestion error; in the latter case the index is unchanged and the
    /// session stays usable. A failure partway through a multi-segment add
    /// may leave earlier chunks in the index (no rollback guarantee).
    pub async fn ingest(&self, document: &Path) -> Result<IngestReport, RagError> {
        let guard = self.index.read().await;
        let index = guard.as_ref().ok_or_else(|| self.not_ready())?;

        let source = document
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| document.display().to_string());

        let segments = self.extractor.extract(document).await?;

        let mut chunks: Vec<DocumentChunk> = Vec::new();
        for segment in &segments {
            chunks.extend(self.splitter.split(&segment.text, &source, segment.page));
        }

        if chunks.is_empty() {
            return Err(RagError::Ingestion(format!(
                "no text extracted from {}",
                document.display()
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        index.add(&chunks, &embeddings).await?;
        index.persist().await?;

        tracing::info!(
            session = %self.session_id,
            %source,
            segments = segments.len(),
            chunks = chunks.len(),
            "document ingested"
        );

        Ok(IngestReport {
            segments: segments.len(),
            chunks_indexed: chunks.len(),
        })
    }

    /// Answer a question from this session's documents.
    pub async fn query(&self, question: &str) -> Result<Answer, RagError> {
        let guard = self.index.read().await;
        let index = guard.as_ref().ok_or_else(|| self.not_ready())?;
        self.engine.answer(question, index).await
    }

    /// Number of chunks currently indexed for this session.
    pub async fn chunk_count(&self) -> Result<usize, RagError> {
        let guard = self.index.read().await;
        let index = guard.as_ref().ok_or_else(|| self.not_ready())?;
        index.count().await
    }

    /// Tear the session's knowledge base down: release the index handle,
    /// wait out the lock-release grace period, then delete the storage
    /// directory. Idempotent; destroying twice is a no-op.
    pub async fn destroy(&self) -> Result<(), RagError> {
        let taken = self.index.write().await.take();

        if let Some(index) = taken {
            index.release().await?;
            if !self.release_grace.is_zero() {
                tokio::time::sleep(self.release_grace).await;
            }
        }

        if self.store_dir.exists() {
            tokio::fs::remove_dir_all(&self.store_dir)
                .await
                .map_err(RagError::storage)?;
            tracing::info!(session = %self.session_id, "session data deleted");
        }

        Ok(())
    }

    fn not_ready(&self) -> RagError {
        RagError::NotReady(format!(
            "session {} has been destroyed; reopen it before continuing",
            self.session_id
        ))
    }
}
