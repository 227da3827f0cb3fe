use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::http::{Auth, HttpClient};
use crate::store_pinecone::resolve_index_host;

/// Everything a pipeline call needs: settings, the pooled HTTP client and
/// the data-plane host of the vector index. Built once, then shared.
#[derive(Clone, Debug)]
pub struct RagClient {
    cfg: Config,
    http: HttpClient,
    index_host: String,
}

impl RagClient {
    /// Validates `cfg`, builds the HTTP client and resolves the index host.
    pub async fn connect(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let http = HttpClient::new(Duration::from_secs(cfg.request_timeout_secs))?;
        let index_host = match &cfg.pinecone_host {
            Some(host) => normalize_host(host),
            None => resolve_index_host(&cfg, &http).await?,
        };
        info!(index_host = %index_host, "Vector index client ready");
        Ok(Self {
            cfg,
            http,
            index_host,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn index_host(&self) -> &str {
        &self.index_host
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http
    }

    pub(crate) fn openai_auth(&self) -> Auth<'_> {
        Auth::Bearer(&self.cfg.openai_api_key)
    }

    pub(crate) fn pinecone_auth(&self) -> Auth<'_> {
        Auth::ApiKey(&self.cfg.pinecone_api_key)
    }

    pub(crate) fn openai_url(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.openai_base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn index_url(&self, path: &str) -> String {
        format!("{}/{}", self.index_host, path)
    }
}

pub(crate) fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosts_without_scheme_default_to_https() {
        assert_eq!(normalize_host("rules-abc.svc.gcp.pinecone.io/"), "https://rules-abc.svc.gcp.pinecone.io");
        assert_eq!(normalize_host("http://127.0.0.1:8080"), "http://127.0.0.1:8080");
    }
}
