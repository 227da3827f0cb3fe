//! Rulebook question answering.
//!
//! ```text
//! file -> load -> chunk -> embed -> upsert(namespace)
//!
//! query -> embed -> search(namespace) -> prompt -> completion
//! ```
//!
//! Embeddings and completions come from an OpenAI-compatible API, vectors
//! live in a Pinecone index partitioned by namespace (one per game).

mod build_prompt;
mod chunk_text;
mod client;
mod config;
mod embed_chunks;
mod embed_query;
mod error;
mod generate;
mod http;
mod load_document;
mod namespaces;
mod retrieve_chunks;
mod store_pinecone;

use std::path::Path;

use tracing::{info, warn};
use uuid::Uuid;

pub use build_prompt::{build_prompt, format_context_from_hits};
pub use chunk_text::{chunk_text, split_by_delimiter, split_by_length, Chunk, ChunkMetadata, ChunkingConfig, SplitMode};
pub use client::RagClient;
pub use config::{Config, EmptyContextPolicy};
pub use embed_chunks::Embedding;
pub use error::{Error, Result};
pub use load_document::{collect_documents, load_document};
pub use namespaces::supported_namespaces;
pub use retrieve_chunks::ScoredChunk;

use embed_chunks::embed_texts;
use embed_query::embed_query;
use generate::generate_answer;
use retrieve_chunks::retrieve_top;
use store_pinecone::{store_vectors, Vector, VectorMetadata};

/// Answer returned when a namespace has nothing to retrieve and the
/// completion call is skipped.
pub const NO_CONTEXT_ANSWER: &str = "No rules have been indexed for this game.";

/// Where and what a pipeline run may ingest.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// `None` writes to the index's default namespace (single-index mode).
    pub namespace: Option<String>,
    pub supported_exts: Vec<String>,
}

impl PipelineOptions {
    pub fn new(cfg: &Config, namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            supported_exts: cfg.supported_exts.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestReport {
    pub namespace: Option<String>,
    pub documents: usize,
    pub chunks: usize,
    pub upserted: usize,
}

#[derive(Clone, Debug)]
pub struct QueryAnswer {
    pub answer: String,
    /// Retrieved chunk texts, most similar first
    pub sources: Vec<String>,
    pub matches: Vec<ScoredChunk>,
    /// False when the namespace returned nothing to ground the answer on
    pub has_context: bool,
}

/// Splits, embeds and upserts the document(s) at `path`.
///
/// Everything local (existence, extension, reading, splitting) is checked
/// before the first remote call. The first remote failure aborts the run.
pub async fn ingest_document(rag: &RagClient, path: &Path, opts: &PipelineOptions) -> Result<IngestReport> {
    let namespace = normalize_namespace(opts.namespace.as_deref());
    if namespace.is_none() && rag.config().require_namespace {
        return Err(Error::InvalidInput("a namespace is required".to_string()));
    }

    let files = collect_documents(path, &opts.supported_exts)?;
    let chunking = rag.config().chunking();
    let mut prepared: Vec<(Chunk, Option<String>)> = Vec::new();
    for file in &files {
        let text = load_document(file).await?;
        let name = match namespace {
            Some(ns) => ns.to_string(),
            None => file_stem(file),
        };
        let chunks = chunk_text(&text, &name, &chunking)?;
        if chunks.is_empty() {
            warn!(file = %file.display(), "document has no text, skipping");
            continue;
        }
        info!(file = %file.display(), chunks = chunks.len(), "split document");
        let source = file.file_name().map(|n| n.to_string_lossy().to_string());
        prepared.extend(chunks.into_iter().map(|c| (c, source.clone())));
    }
    if prepared.is_empty() {
        return Err(Error::InvalidInput(format!("{} contains no text to index", path.display())));
    }

    let texts: Vec<String> = prepared.iter().map(|(c, _)| c.text.clone()).collect();
    let vectors = embed_texts(rag, &texts).await?;
    let points: Vec<Vector> = prepared
        .into_iter()
        .zip(vectors)
        .map(|((chunk, source), values)| Vector {
            id: Uuid::new_v4().to_string(),
            values,
            metadata: VectorMetadata {
                text: chunk.text,
                name: chunk.metadata.name,
                chunk_index: chunk.metadata.chunk_index,
                id: chunk.metadata.id,
                source,
            },
        })
        .collect();

    let upserted = store_vectors(rag, namespace, &points).await?;
    info!(
        namespace = namespace.unwrap_or(""),
        documents = files.len(),
        chunks = points.len(),
        upserted,
        "ingestion complete"
    );
    Ok(IngestReport {
        namespace: namespace.map(str::to_string),
        documents: files.len(),
        chunks: points.len(),
        upserted,
    })
}

/// Answers `question` from the chunks stored under `namespace`.
pub async fn answer_query(rag: &RagClient, question: &str, namespace: Option<&str>) -> Result<QueryAnswer> {
    let question = question.trim();
    if question.is_empty() {
        return Err(Error::InvalidInput("query must not be empty".to_string()));
    }
    let namespace = normalize_namespace(namespace);
    if namespace.is_none() && rag.config().require_namespace {
        return Err(Error::InvalidInput("a game is required".to_string()));
    }

    let query_vec = embed_query(rag, question).await?;
    let hits = retrieve_top(rag, &query_vec, namespace).await?;
    if hits.is_empty() {
        warn!(namespace = namespace.unwrap_or(""), "nothing retrieved for query");
        if rag.config().empty_context == EmptyContextPolicy::ShortCircuit {
            return Ok(QueryAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: vec![],
                matches: vec![],
                has_context: false,
            });
        }
    }

    let prompt = build_prompt(question, &hits);
    let answer = generate_answer(rag, &prompt).await?;
    Ok(QueryAnswer {
        answer,
        sources: hits.iter().map(|h| h.chunk.text.clone()).collect(),
        has_context: !hits.is_empty(),
        matches: hits,
    })
}

fn normalize_namespace(namespace: Option<&str>) -> Option<&str> {
    namespace.map(str::trim).filter(|ns| !ns.is_empty())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}
