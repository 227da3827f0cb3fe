use crate::client::RagClient;
use crate::config::Config;
use crate::error::Result;
use crate::store_pinecone::{describe_index_stats, IndexStats};

/// Namespaces that hold at least one vector and are not hidden by config,
/// sorted by name.
pub async fn supported_namespaces(rag: &RagClient) -> Result<Vec<String>> {
    let stats = describe_index_stats(rag).await?;
    Ok(visible_namespaces(stats, rag.config()))
}

fn visible_namespaces(stats: IndexStats, cfg: &Config) -> Vec<String> {
    stats
        .namespaces
        .into_iter()
        .filter(|(name, ns)| ns.vector_count > 0 && !name.is_empty() && !cfg.is_excluded(name))
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_default_and_excluded_namespaces_are_hidden() {
        let stats: IndexStats = serde_json::from_str(
            r#"{"namespaces":{
                "chess":{"vectorCount":12},
                "admin-test":{"vectorCount":4},
                "go":{"vectorCount":0},
                "":{"vectorCount":7},
                "catan":{"vectorCount":1}
            }}"#,
        )
        .expect("valid stats");
        let cfg = Config {
            excluded_namespaces: vec!["admin-test".to_string()],
            ..Config::default()
        };
        let visible = visible_namespaces(stats, &cfg);
        assert_eq!(visible, vec!["catan", "chess"]);
    }
}
