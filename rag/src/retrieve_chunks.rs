use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chunk_text::{Chunk, ChunkMetadata};
use crate::client::RagClient;
use crate::error::Result;

/// A retrieved chunk with its similarity score (higher is more similar).
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    /// File the chunk was read from, when it was recorded at ingestion
    pub source: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<MatchMetadata>,
}

// The index hands numbers back as floats, so everything here is lenient.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchMetadata {
    text: Option<String>,
    name: Option<String>,
    chunk_index: Option<f64>,
    id: Option<String>,
    source: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

/// Returns up to `top_k` chunks nearest to `vector`, most similar first.
/// `namespace: None` searches the index's default namespace.
pub async fn retrieve_top(rag: &RagClient, vector: &[f32], namespace: Option<&str>) -> Result<Vec<ScoredChunk>> {
    if vector.is_empty() {
        return Ok(vec![]);
    }
    let url = rag.index_url("query");
    let req = QueryRequest {
        vector,
        top_k: rag.config().top_k,
        include_metadata: true,
        include_values: false,
        namespace,
    };
    let res = rag
        .http()
        .post_json::<QueryResponse, _>(&url, rag.pinecone_auth(), &req)
        .await?;
    debug!(matches = res.matches.len(), namespace = namespace.unwrap_or(""), "query returned");
    Ok(into_ranked(res.matches))
}

fn into_ranked(matches: Vec<Match>) -> Vec<ScoredChunk> {
    let mut hits: Vec<ScoredChunk> = matches
        .into_iter()
        .filter_map(|m| {
            let Some(meta) = m.metadata else {
                warn!(id = %m.id, "match has no metadata, skipping");
                return None;
            };
            let Some(text) = meta.text else {
                warn!(id = %m.id, "match has no stored text, skipping");
                return None;
            };
            Some(ScoredChunk {
                chunk: Chunk {
                    text,
                    metadata: ChunkMetadata {
                        name: meta.name.unwrap_or_default(),
                        chunk_index: meta.chunk_index.map_or(0, |i| i.max(0.0) as usize),
                        id: meta.id,
                    },
                },
                score: m.score,
                source: meta.source,
            })
        })
        .collect();
    // the index already ranks, but the ordering is part of our contract
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_ranked_and_metadata_decoded() {
        let res: QueryResponse = serde_json::from_str(
            r#"{"matches":[
                {"id":"a","score":0.2,"metadata":{"text":"Pawns move forward.","name":"chess","chunkIndex":0.0}},
                {"id":"b","score":0.9,"metadata":{"text":"Castling moves the king.","name":"chess","chunkIndex":1.0,"id":"chess-1"}},
                {"id":"c","score":0.5},
                {"id":"d","score":0.7,"metadata":{"name":"chess"}}
            ],"namespace":"chess"}"#,
        )
        .expect("valid response");
        let hits = into_ranked(res.matches);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "Castling moves the king.");
        assert_eq!(hits[0].chunk.metadata.chunk_index, 1);
        assert_eq!(hits[0].chunk.metadata.id.as_deref(), Some("chess-1"));
        assert_eq!(hits[1].chunk.metadata.chunk_index, 0);
    }

    #[test]
    fn query_body_omits_namespace_when_unscoped() {
        let req = QueryRequest {
            vector: &[0.1],
            top_k: 4,
            include_metadata: true,
            include_values: false,
            namespace: None,
        };
        let value = serde_json::to_value(&req).expect("serializable");
        assert!(value.get("namespace").is_none());
        assert_eq!(value["topK"], 4);
    }
}
