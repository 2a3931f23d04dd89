// src/error.rs

//! Unified error handling for changelog ingestion.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or a body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File watcher could not be set up
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Configuration failed validation, with every issue found
    #[error("The provided changelog configuration is invalid.\n{}", .issues.join("\n"))]
    InvalidConfig { issues: Vec<String> },

    /// A local changelog file does not exist
    #[error("The provided changelog file path at {} does not exist.", .0.display())]
    SourceNotFound(PathBuf),

    /// Transport failure while fetching a remote source
    #[error("Failed to fetch data from {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote source answered with an unexpected status
    #[error("Failed to fetch data from {url}: {status} - {reason}")]
    Upstream {
        url: String,
        status: u16,
        reason: String,
    },

    /// Payload could not be parsed
    #[error("Failed to parse data from {origin}: {message}")]
    Parse { origin: String, message: String },

    /// Failure while syncing a Markdown changelog
    #[error("Failed to read the changelog file at {origin}: {source}")]
    Source {
        origin: String,
        #[source]
        source: Box<AppError>,
    },

    /// Provider dispatch error
    #[error("Provider error: {0}")]
    Provider(String),
}

impl AppError {
    /// Create a configuration error from a list of issues.
    pub fn invalid_config(issues: Vec<String>) -> Self {
        Self::InvalidConfig { issues }
    }

    /// Create a single-issue configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            issues: vec![message.into()],
        }
    }

    /// Create a parse error with the originating path or URL.
    pub fn parse(origin: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    /// Wrap an error raised while syncing a changelog source.
    pub fn changelog(origin: impl Into<String>, error: AppError) -> Self {
        Self::Source {
            origin: origin.into(),
            source: Box::new(error),
        }
    }

    /// Create a provider dispatch error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}
