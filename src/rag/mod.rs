//! Session-isolated RAG pipeline.
//!
//! # Components
//!
//! - `splitter`: Recursive chunk splitter (paragraph → sentence → character)
//! - `index`: Per-session persistent vector index (SQLite)
//! - `engine`: Retrieval-augmented query engine and prompt assembly
//! - `session`: Session store owning one index's full lifecycle

mod engine;
mod index;
mod session;
mod splitter;


pub use engine::{Answer, QueryEngine, FALLBACK_ANSWER};
pub use index::{ScoredChunk, SqliteVectorIndex, StoredChunk};
pub use session::{IngestReport, SessionStore};
pub use splitter::{DocumentChunk, RecursiveSplitter};
