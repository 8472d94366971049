//! Error types for acquisition, decoding and rendering

use crate::source::strip_query;

/// Errors from the backend and content fetches
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("No access token found. Please login again.")]
    MissingToken,

    #[error("Request timeout: {url}")]
    Timeout { url: String },

    #[error("{context}: {status}")]
    Status { context: &'static str, status: u16 },

    #[error("{0}")]
    InvalidResponse(String),

    #[error("HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Timeout for `url`; the query string is never kept
    pub fn timeout(url: &str) -> Self {
        Self::Timeout {
            url: strip_query(url).to_string(),
        }
    }

    /// Map a reqwest failure, keeping timeouts distinct.
    ///
    /// Signed URLs carry their credentials in the query, so neither variant
    /// keeps the full request URL.
    pub fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(url)
        } else {
            Self::Transport(err.without_url())
        }
    }
}

/// Errors from PDF and image decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Engine(#[from] mupdf::error::Error),

    #[error("Image: {0}")]
    Image(#[from] image::ImageError),

    #[error("{detail}")]
    Generic { detail: String },
}

impl DecodeError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Failure of a single acquisition strategy
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// One failed attempt recorded by the acquisition chain
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub error: StrategyError,
}

/// Failure of the whole acquisition chain
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// Every applicable strategy failed; the message is the last failure
    #[error("{}", last_message(.failures))]
    Exhausted { failures: Vec<StrategyFailure> },

    #[error("Document load cancelled")]
    Cancelled,
}

fn last_message(failures: &[StrategyFailure]) -> String {
    failures
        .last()
        .map(|f| f.error.to_string())
        .unwrap_or_else(|| "No acquisition strategy applicable".to_string())
}

/// Errors from rendering a single page
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("page {page} out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors from reading or writing the settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
