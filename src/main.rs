use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use sessionrag::core::config::{RagConfig, StorePaths};
use sessionrag::extract::{DocumentExtractor, PlainTextExtractor};
use sessionrag::llm::{
    EmbeddingProvider, GenerationProvider, OpenAiCompatConfig, OpenAiCompatProvider,
};
use sessionrag::rag::SessionStore;

/// Interactive session chat: each session is isolated to its own uploaded
/// documents. Commands: /new, /clear, /load <path>, /quit; anything else is
/// a question against the current session.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = StorePaths::new();
    sessionrag::logging::init(&paths);

    let provider_config = provider_config_from_env()
        .context("provider configuration is incomplete; refusing to start")?;
    let provider = Arc::new(OpenAiCompatProvider::new(provider_config)?);
    let embedder: Arc<dyn EmbeddingProvider> = provider.clone();
    let generator: Arc<dyn GenerationProvider> = provider;
    let extractor: Arc<dyn DocumentExtractor> = Arc::new(PlainTextExtractor);

    let config = RagConfig::default();

    let mut session = open_session(&paths, &config, &extractor, &embedder, &generator).await?;
    println!("Session {} ready. Upload a document with /load <path>.", session.session_id());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(a, b)| (a, b.trim())) {
            ("/quit", _) => break,
            ("/new", _) => {
                // Previous session's store stays on disk; only the active
                // session changes.
                session = open_session(&paths, &config, &extractor, &embedder, &generator).await?;
                println!("New session {} started. Upload a document.", session.session_id());
            }
            ("/clear", _) => {
                session.destroy().await?;
                session = open_session(&paths, &config, &extractor, &embedder, &generator).await?;
                println!("Session data cleared. New session {} started.", session.session_id());
            }
            ("/load", path) if !path.is_empty() => {
                match session.ingest(Path::new(path)).await {
                    Ok(report) => println!(
                        "Document added: {} segment(s), {} chunk(s) indexed.",
                        report.segments, report.chunks_indexed
                    ),
                    Err(err) => eprintln!("Could not ingest {}: {}", path, err),
                }
            }
            ("/load", _) => eprintln!("Usage: /load <path>"),
            _ => match session.query(line).await {
                Ok(answer) => println!("{}", answer.text),
                Err(err) => eprintln!("Query failed: {}", err),
            },
        }
    }

    Ok(())
}

async fn open_session(
    paths: &StorePaths,
    config: &RagConfig,
    extractor: &Arc<dyn DocumentExtractor>,
    embedder: &Arc<dyn EmbeddingProvider>,
    generator: &Arc<dyn GenerationProvider>,
) -> anyhow::Result<SessionStore> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let session = SessionStore::open_or_recover(
        session_id,
        paths,
        config,
        extractor.clone(),
        embedder.clone(),
        generator.clone(),
    )
    .await?;
    Ok(session)
}

fn provider_config_from_env() -> anyhow::Result<OpenAiCompatConfig> {
    let base_url = env::var("SESSIONRAG_API_BASE")
        .context("SESSIONRAG_API_BASE is not set (OpenAI-compatible endpoint URL)")?;
    let embedding_model = env::var("SESSIONRAG_EMBED_MODEL")
        .context("SESSIONRAG_EMBED_MODEL is not set (embedding model identifier)")?;
    let chat_model = env::var("SESSIONRAG_CHAT_MODEL")
        .context("SESSIONRAG_CHAT_MODEL is not set (chat model identifier)")?;
    let api_key = env::var("SESSIONRAG_API_KEY").ok();

    Ok(OpenAiCompatConfig {
        base_url,
        api_key,
        embedding_model,
        chat_model,
    })
}
