use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RagClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{Auth, HttpClient};

/// Metadata stored with every vector; `text` is what retrieval hands back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMetadata {
    pub text: String,
    pub name: String,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Vector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [Vector],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Deserialize)]
struct WhoAmI {
    project_name: String,
}

#[derive(Serialize)]
struct DescribeStatsRequest {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceStats>,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub total_vector_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

/// Finds the data-plane host of the configured index through the
/// environment's controller.
pub async fn resolve_index_host(cfg: &Config, http: &HttpClient) -> Result<String> {
    let url = format!("{}/actions/whoami", cfg.controller_url());
    let who = http
        .get_json::<WhoAmI>(&url, Auth::ApiKey(&cfg.pinecone_api_key))
        .await?;
    if who.project_name.trim().is_empty() {
        return Err(Error::Decode("controller returned an empty project name".to_string()));
    }
    Ok(format!(
        "https://{}-{}.svc.{}.pinecone.io",
        cfg.pinecone_index, who.project_name, cfg.pinecone_environment
    ))
}

/// Upserts `vectors` under `namespace`, in configured batches. Returns the
/// number of vectors the index acknowledged.
pub async fn store_vectors(rag: &RagClient, namespace: Option<&str>, vectors: &[Vector]) -> Result<usize> {
    if vectors.is_empty() {
        return Ok(0);
    }
    let url = rag.index_url("vectors/upsert");
    let mut upserted = 0;
    for batch in vectors.chunks(rag.config().upsert_batch_size.max(1)) {
        debug!(vectors = batch.len(), namespace = namespace.unwrap_or(""), "upserting");
        let body = UpsertRequest {
            vectors: batch,
            namespace,
        };
        let res = rag
            .http()
            .post_json::<UpsertResponse, _>(&url, rag.pinecone_auth(), &body)
            .await?;
        upserted += res.upserted_count;
    }
    Ok(upserted)
}

pub async fn describe_index_stats(rag: &RagClient) -> Result<IndexStats> {
    let url = rag.index_url("describe_index_stats");
    rag.http()
        .post_json::<IndexStats, _>(&url, rag.pinecone_auth(), &DescribeStatsRequest {})
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_omits_absent_fields() {
        let meta = VectorMetadata {
            text: "Pawns move forward.".to_string(),
            name: "chess".to_string(),
            chunk_index: 0,
            id: None,
            source: None,
        };
        let value = serde_json::to_value(&meta).expect("serializable");
        assert_eq!(
            value,
            serde_json::json!({"text": "Pawns move forward.", "name": "chess", "chunkIndex": 0})
        );
    }

    #[test]
    fn stats_tolerate_missing_fields() {
        let stats: IndexStats = serde_json::from_str(
            r#"{"namespaces":{"chess":{"vectorCount":3},"empty":{}},"dimension":1536}"#,
        )
        .expect("valid stats");
        assert_eq!(stats.namespaces["chess"].vector_count, 3);
        assert_eq!(stats.namespaces["empty"].vector_count, 0);
        assert_eq!(stats.total_vector_count, 0);
    }
}
