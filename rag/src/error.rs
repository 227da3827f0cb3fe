//! Error types for the rulebook pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed environment configuration
    #[error("configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    /// Caller supplied something the pipeline cannot work with
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from {path}: {message}")]
    Pdf { path: String, message: String },

    /// A collaborator answered with a non-success status
    #[error("{method} {url} failed: {status} {body}")]
    Remote {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("{method} {url} timed out")]
    Timeout { method: &'static str, url: String },

    #[error("{method} {url} transport error: {message}")]
    Transport {
        method: &'static str,
        url: String,
        message: String,
    },

    /// A collaborator answered with a body we could not interpret
    #[error("decode failed: {0}")]
    Decode(String),
}

impl Error {
    /// True for failures raised before any remote call was attempted.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::FileNotFound(_)
                | Error::UnsupportedExtension(_)
                | Error::InvalidInput(_)
                | Error::Io { .. }
                | Error::Pdf { .. }
        )
    }
}
