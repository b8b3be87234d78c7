//! Session-isolated retrieval-augmented generation.
//!
//! Each conversation session owns a private on-disk vector index built from
//! the documents uploaded into it. Questions are answered by embedding the
//! question, retrieving the top-k most similar chunks from that session's
//! index, and constraining a generation model to the retrieved context.
//!
//! # Components
//!
//! - [`rag`]: chunk splitter, per-session vector index, session store, query
//!   engine
//! - [`llm`]: embedding/generation provider seams and the OpenAI-compatible
//!   HTTP implementation
//! - [`extract`]: document text extraction seam
//! - [`core`]: error taxonomy and configuration

pub mod core;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod rag;

pub use crate::core::config::{RagConfig, StorePaths};
pub use crate::core::errors::RagError;
pub use crate::rag::{Answer, IngestReport, SessionStore, FALLBACK_ANSWER};
