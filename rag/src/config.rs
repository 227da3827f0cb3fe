use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::chunk_text::{ChunkingConfig, SplitMode};
use crate::error::{Error, Result};

/// What to do when a namespace has nothing to retrieve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptyContextPolicy {
    /// Skip the completion call and answer with a fixed "no rules" message.
    #[default]
    ShortCircuit,
    /// Ask the completion model anyway, with an empty context.
    Generate,
}

impl FromStr for EmptyContextPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short-circuit" | "short_circuit" | "skip" => Ok(Self::ShortCircuit),
            "generate" => Ok(Self::Generate),
            other => Err(Error::Config(format!("unknown empty context policy '{}'", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embed_model: String,
    pub completion_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub pinecone_api_key: String,
    pub pinecone_environment: String,
    pub pinecone_index: String,
    pub pinecone_host: Option<String>,
    pub pinecone_controller_url: Option<String>,
    pub port: u16,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub split_mode: SplitMode,
    pub split_delimiter: String,
    pub top_k: usize,
    pub excluded_namespaces: Vec<String>,
    pub supported_exts: Vec<String>,
    pub require_namespace: bool,
    pub empty_context: EmptyContextPolicy,
    pub embed_batch_size: usize,
    pub upsert_batch_size: usize,
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
    /// Variables that were set but could not be parsed, as `NAME: reason`
    pub env_errors: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            embed_model: "text-embedding-ada-002".to_string(),
            completion_model: "gpt-3.5-turbo-instruct".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            pinecone_api_key: String::new(),
            pinecone_environment: String::new(),
            pinecone_index: String::new(),
            pinecone_host: None,
            pinecone_controller_url: None,
            port: 4000,
            chunk_size: 1000,
            chunk_overlap: 200,
            split_mode: SplitMode::Length,
            split_delimiter: "\n\n".to_string(),
            top_k: 4,
            excluded_namespaces: Vec::new(),
            supported_exts: vec![".txt".to_string(), ".pdf".to_string()],
            require_namespace: true,
            empty_context: EmptyContextPolicy::ShortCircuit,
            embed_batch_size: 512,
            upsert_batch_size: 100,
            request_timeout_secs: 120,
            max_concurrent_requests: 16,
            env_errors: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        // Pick up a local .env so keys don't have to be exported by hand.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source. Values that fail to parse
    /// fall back to the default and are kept in `env_errors`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut vars = EnvVars { lookup, errors: Vec::new() };
        let mut cfg = Self {
            openai_api_key: vars.string("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: vars
                .string("OPENAI_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            embed_model: vars.string("OPENAI_EMBED_MODEL").unwrap_or(defaults.embed_model),
            completion_model: vars
                .string("OPENAI_COMPLETION_MODEL")
                .unwrap_or(defaults.completion_model),
            temperature: vars.parse("OPENAI_TEMPERATURE", defaults.temperature),
            max_tokens: vars.parse("OPENAI_MAX_TOKENS", defaults.max_tokens),
            pinecone_api_key: vars.string("PINECONE_API_KEY").unwrap_or_default(),
            pinecone_environment: vars.string("PINECONE_ENVIRONMENT").unwrap_or_default(),
            pinecone_index: vars.string("PINECONE_INDEX").unwrap_or_default(),
            pinecone_host: non_empty(vars.string("PINECONE_HOST")),
            pinecone_controller_url: non_empty(vars.string("PINECONE_CONTROLLER_URL")),
            port: vars.parse("PORT", defaults.port),
            chunk_size: vars.parse("RAG_CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: vars.parse("RAG_CHUNK_OVERLAP", defaults.chunk_overlap),
            split_mode: vars.parse("RAG_SPLIT_MODE", defaults.split_mode),
            split_delimiter: vars
                .string("RAG_SPLIT_DELIMITER")
                .map(|v| unescape(&v))
                .unwrap_or(defaults.split_delimiter),
            top_k: vars.parse("RAG_TOP_K", defaults.top_k),
            excluded_namespaces: split_list(&vars.string("RAG_EXCLUDED_NAMESPACES").unwrap_or_default()),
            supported_exts: vars
                .string("RAG_SUPPORTED_EXTS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.supported_exts),
            require_namespace: vars.parse("RAG_REQUIRE_NAMESPACE", defaults.require_namespace),
            empty_context: vars.parse("RAG_EMPTY_CONTEXT", defaults.empty_context),
            embed_batch_size: vars.parse("RAG_EMBED_BATCH_SIZE", defaults.embed_batch_size),
            upsert_batch_size: vars.parse("RAG_UPSERT_BATCH_SIZE", defaults.upsert_batch_size),
            request_timeout_secs: vars.parse("RAG_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            max_concurrent_requests: vars.parse("MAX_CONCURRENT_REQUESTS", defaults.max_concurrent_requests),
            env_errors: Vec::new(),
        };
        cfg.env_errors = vars.errors;
        cfg
    }

    /// Fails if any variable was set to something that could not be parsed.
    pub fn check_env(&self) -> Result<()> {
        if self.env_errors.is_empty() {
            return Ok(());
        }
        Err(Error::Config(self.env_errors.join("; ")))
    }

    /// Checks the settings every remote call depends on.
    pub fn validate(&self) -> Result<()> {
        self.check_env()?;
        if self.openai_api_key.trim().is_empty() {
            return Err(Error::Config("OPENAI_API_KEY is not set".to_string()));
        }
        if self.pinecone_api_key.trim().is_empty() {
            return Err(Error::Config("PINECONE_API_KEY is not set".to_string()));
        }
        if self.pinecone_host.is_none() {
            if self.pinecone_environment.trim().is_empty() {
                return Err(Error::Config("PINECONE_ENVIRONMENT is not set".to_string()));
            }
            if self.pinecone_index.trim().is_empty() {
                return Err(Error::Config("PINECONE_INDEX is not set".to_string()));
            }
        }
        if self.top_k == 0 {
            return Err(Error::Config("RAG_TOP_K must be at least 1".to_string()));
        }
        if self.embed_batch_size == 0 || self.upsert_batch_size == 0 {
            return Err(Error::Config("batch sizes must be at least 1".to_string()));
        }
        self.chunking().validate()
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            mode: self.split_mode,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            delimiter: self.split_delimiter.clone(),
        }
    }

    pub fn controller_url(&self) -> String {
        self.pinecone_controller_url
            .clone()
            .unwrap_or_else(|| format!("https://controller.{}.pinecone.io", self.pinecone_environment))
    }

    pub fn is_excluded(&self, namespace: &str) -> bool {
        self.excluded_namespaces.iter().any(|n| n == namespace)
    }
}

struct EnvVars<F> {
    lookup: F,
    errors: Vec<String>,
}

impl<F: Fn(&str) -> Option<String>> EnvVars<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    fn parse<T>(&mut self, name: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(raw) = (self.lookup)(name) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(value) => value,
            Err(err) => {
                self.errors.push(format!("{}={:?}: {}", name, raw, err));
                default
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Env files can't carry raw newlines, so accept the usual escapes.
fn unescape(raw: &str) -> String {
    raw.replace("\\r", "\r").replace("\\n", "\n").replace("\\t", "\t")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn valid() -> Config {
        Config {
            openai_api_key: "sk-test".to_string(),
            pinecone_api_key: "pc-test".to_string(),
            pinecone_environment: "us-west1-gcp".to_string(),
            pinecone_index: "rules".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_validate_once_keys_are_present() {
        assert!(valid().validate().is_ok());
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn explicit_host_makes_environment_optional() {
        let cfg = Config {
            pinecone_environment: String::new(),
            pinecone_index: String::new(),
            pinecone_host: Some("http://127.0.0.1:9000".to_string()),
            ..valid()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let cfg = Config { chunk_size: 100, chunk_overlap: 100, ..valid() };
        assert!(matches!(cfg.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn controller_url_follows_environment() {
        assert_eq!(valid().controller_url(), "https://controller.us-west1-gcp.pinecone.io");
    }

    fn lookup(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = lookup(&[
            ("RAG_SPLIT_MODE", "delimiter"),
            ("RAG_EMPTY_CONTEXT", "generate"),
            ("RAG_REQUIRE_NAMESPACE", "false"),
            ("RAG_TOP_K", " 6 "),
            ("RAG_SPLIT_DELIMITER", "\\n---\\n"),
        ]);
        assert_eq!(cfg.split_mode, SplitMode::Delimiter);
        assert_eq!(cfg.empty_context, EmptyContextPolicy::Generate);
        assert!(!cfg.require_namespace);
        assert_eq!(cfg.top_k, 6);
        assert_eq!(cfg.split_delimiter, "\n---\n");
        assert!(cfg.check_env().is_ok());
    }

    #[test]
    fn unparseable_variables_fail_validation() {
        let cfg = Config {
            openai_api_key: "sk-test".to_string(),
            pinecone_api_key: "pc-test".to_string(),
            pinecone_host: Some("http://127.0.0.1:9000".to_string()),
            ..lookup(&[
                ("RAG_SPLIT_MODE", "paragraphs"),
                ("RAG_EMPTY_CONTEXT", "generat"),
                ("RAG_REQUIRE_NAMESPACE", "nope"),
            ])
        };
        assert_eq!(cfg.env_errors.len(), 3);
        let err = cfg.validate().expect_err("typos must not pass");
        assert!(matches!(err, Error::Config(_)));
        let msg = err.to_string();
        assert!(msg.contains("RAG_SPLIT_MODE"), "{}", msg);
        assert!(msg.contains("RAG_EMPTY_CONTEXT"), "{}", msg);
        assert!(msg.contains("RAG_REQUIRE_NAMESPACE"), "{}", msg);
    }

    #[test]
    fn list_and_escape_helpers() {
        assert_eq!(split_list(" admin, ,test "), vec!["admin", "test"]);
        assert_eq!(unescape("\\r\\r"), "\r\r");
        assert!("generate".parse::<EmptyContextPolicy>().is_ok());
        assert!("nope".parse::<EmptyContextPolicy>().is_err());
    }
}
