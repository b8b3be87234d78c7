//! Per-session persistent vector index.
//!
//! One SQLite file per session directory, embeddings stored as little-endian
//! f32 BLOBs, brute-force cosine similarity at query time. Exact enough for a
//! single session's worth of chunks; ordering is deterministic given
//! deterministic embeddings (stable sort over insertion order).

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::splitter::DocumentChunk;
use crate::core::errors::RagError;

const INDEX_FILE: &str = "index.db";

/// A chunk as stored in the index, with its identifier.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub content: String,
    pub source: String,
    pub page: Option<usize>,
    pub start_offset: usize,
    pub chunk_index: usize,
}

/// Result of a similarity search. Higher score = more similar.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub score: f32,
}

pub struct SqliteVectorIndex {
    pool: SqlitePool,
    dir: PathBuf,
}

impl SqliteVectorIndex {
    /// Load the index at `dir`, or initialize a fresh empty one if the
    /// directory does not exist yet.
    ///
    /// Creating the directory and the index is one logical step: if schema
    /// initialization fails after this call created the directory, the
    /// directory is removed again so a later `open` never finds a
    /// half-initialized path. A fresh index holds zero entries.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RagError> {
        let dir = dir.into();
        let created = !dir.exists();
        if created {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(RagError::storage)?;
        }

        match Self::connect(&dir).await {
            Ok(pool) => {
                tracing::debug!(path = %dir.display(), created, "vector index opened");
                Ok(Self { pool, dir })
            }
            Err(err) => {
                if created {
                    let _ = tokio::fs::remove_dir_all(&dir).await;
                }
                Err(err)
            }
        }
    }

    async fn connect(dir: &Path) -> Result<SqlitePool, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(dir.join(INDEX_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(RagError::storage)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                page INTEGER,
                start_offset INTEGER NOT NULL DEFAULT 0,
                chunk_index INTEGER NOT NULL DEFAULT 0,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&pool)
        .await
        .map_err(RagError::storage)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&pool)
        .await
        .map_err(RagError::storage)?;

        Ok(pool)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Append chunks with their embeddings. Accumulates across calls.
    ///
    /// The embedding dimension is recorded on the first insert; later inserts
    /// with a different dimension are a storage error (mixing dimensions in
    /// one index corrupts every similarity ranking).
    pub async fn add(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::Provider(format!(
                "embedding count ({}) does not match chunk count ({})",
                embeddings.len(),
                chunks.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let dim = embeddings[0].len();
        if dim == 0 {
            return Err(RagError::Provider(
                "embedding provider returned an empty vector".to_string(),
            ));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
            return Err(RagError::Storage(format!(
                "mixed embedding dimensions in one batch ({} vs {})",
                bad.len(),
                dim
            )));
        }
        self.check_dimension(dim).await?;

        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            let blob = serialize_embedding(embedding);

            sqlx::query(
                "INSERT INTO chunks (chunk_id, content, source, page, start_offset, chunk_index, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&chunk.text)
            .bind(&chunk.source)
            .bind(chunk.page.map(|p| p as i64))
            .bind(chunk.start_offset as i64)
            .bind(chunk.chunk_index as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(RagError::storage)?;
        }

        sqlx::query(
            "INSERT OR REPLACE INTO index_meta (key, value, updated_at)
             VALUES ('embedding_dim', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(dim.to_string())
        .execute(&mut *tx)
        .await
        .map_err(RagError::storage)?;

        tx.commit().await.map_err(RagError::storage)?;
        Ok(())
    }

    async fn check_dimension(&self, dim: usize) -> Result<(), RagError> {
        let recorded: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'embedding_dim'")
                .fetch_optional(&self.pool)
                .await
                .map_err(RagError::storage)?;

        if let Some(recorded) = recorded {
            let recorded: usize = recorded.parse().map_err(RagError::storage)?;
            if recorded != dim {
                return Err(RagError::Storage(format!(
                    "embedding dimension {} does not match index dimension {}",
                    dim, recorded
                )));
            }
        }
        Ok(())
    }

    /// Flush in-memory mutations to the main database file.
    pub async fn persist(&self) -> Result<(), RagError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .map_err(RagError::storage)?;
        Ok(())
    }

    /// Top-k nearest chunks by cosine similarity, descending.
    ///
    /// Returns fewer than `k` entries if the index holds fewer; an empty
    /// index returns an empty result. Ties keep insertion order (rows are
    /// scanned in rowid order and the sort is stable).
    pub async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, content, source, page, start_offset, chunk_index, embedding
             FROM chunks
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::storage)?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = deserialize_embedding(&embedding_bytes);
                let score = cosine_similarity(query_embedding, &stored);

                Some(ScoredChunk {
                    chunk: row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    pub async fn count(&self) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::storage)?;
        Ok(count as usize)
    }

    /// Drop all in-process handles on the backing storage so the directory
    /// can be deleted by another actor.
    ///
    /// The OS does not guarantee the file locks are free the instant this
    /// returns; callers that intend to delete the directory must wait the
    /// configured grace period first.
    pub async fn release(self) -> Result<(), RagError> {
        self.pool.close().await;
        Ok(())
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
    StoredChunk {
        chunk_id: row.get("chunk_id"),
        content: row.get("content"),
        source: row.get("source"),
        page: row.get::<Option<i64>, _>("page").map(|p| p as usize),
        start_offset: row.get::<i64, _>("start_offset") as usize,
        chunk_index: row.get::<i64, _>("chunk_index") as usize,
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("sessionrag-index-test-{}", uuid::Uuid::new_v4()))
    }

    fn make_chunk(text: &str, chunk_index: usize) -> DocumentChunk {
        DocumentChunk {
            text: text.to_string(),
            source: "doc".to_string(),
            page: None,
            start_offset: chunk_index * 100,
            chunk_index,
        }
    }

    #[tokio::test]
    async fn add_and_search_ranks_by_similarity() {
        let index = SqliteVectorIndex::open(scratch_dir()).await.unwrap();

        let chunks = vec![make_chunk("apples", 0), make_chunk("oranges", 1)];
        let embeddings = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        index.add(&chunks, &embeddings).await.unwrap();

        let results = index.search(&[0.0, 1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "oranges");
        assert!(results[0].score > 0.99);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn search_returns_at_most_the_stored_entries() {
        let index = SqliteVectorIndex::open(scratch_dir()).await.unwrap();

        index
            .add(&[make_chunk("only one", 0)], &[vec![1.0, 0.0]])
            .await
            .unwrap();

        let results = index.search(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn empty_index_searches_to_zero_results() {
        let index = SqliteVectorIndex::open(scratch_dir()).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);

        let results = index.search(&[1.0, 0.0], 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn add_accumulates_across_calls() {
        let index = SqliteVectorIndex::open(scratch_dir()).await.unwrap();

        index
            .add(&[make_chunk("first", 0)], &[vec![1.0, 0.0]])
            .await
            .unwrap();
        index
            .add(&[make_chunk("second", 1)], &[vec![0.0, 1.0]])
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reopen_yields_identical_search_results() {
        let dir = scratch_dir();

        {
            let index = SqliteVectorIndex::open(dir.clone()).await.unwrap();
            let chunks = vec![make_chunk("alpha", 0), make_chunk("beta", 1)];
            index
                .add(&chunks, &[vec![0.9, 0.1], vec![0.1, 0.9]])
                .await
                .unwrap();
            index.persist().await.unwrap();
            index.release().await.unwrap();
        }

        let first = SqliteVectorIndex::open(dir.clone()).await.unwrap();
        let run_one: Vec<(String, f32)> = first
            .search(&[1.0, 0.0], 2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.chunk.content, r.score))
            .collect();
        first.release().await.unwrap();

        let second = SqliteVectorIndex::open(dir).await.unwrap();
        let run_two: Vec<(String, f32)> = second
            .search(&[1.0, 0.0], 2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.chunk.content, r.score))
            .collect();

        assert_eq!(run_one, run_two);
        assert_eq!(run_one[0].0, "alpha");
    }

    #[tokio::test]
    async fn mixed_dimensions_are_rejected() {
        let index = SqliteVectorIndex::open(scratch_dir()).await.unwrap();

        index
            .add(&[make_chunk("three dims", 0)], &[vec![1.0, 0.0, 0.0]])
            .await
            .unwrap();

        let err = index
            .add(&[make_chunk("two dims", 1)], &[vec![1.0, 0.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Storage(_)));

        // Failed insert must not have changed the store.
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn embedding_count_mismatch_is_a_provider_error() {
        let index = SqliteVectorIndex::open(scratch_dir()).await.unwrap();

        let err = index
            .add(&[make_chunk("one chunk", 0)], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Provider(_)));
    }
}
