//! Backend collaborators consumed by the viewer
//!
//! The reports API (signed URLs, proxied PDF bytes, vitals, document
//! records) and raw content fetching sit behind traits so the pipeline can
//! be driven by the HTTP backend in production and by fixtures in tests.

mod http;

pub use http::{HttpBackend, StaticToken, TokenProvider};

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// A short-lived pre-authorized URL for a stored object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_in: Duration,
}

/// How raw content is requested
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// A pre-signed URL; no credentials
    Signed,
    /// The stored URL, asking for PDF and bypassing caches
    Direct,
    /// Plain anonymous fetch, the last resort
    Anonymous,
    /// Image content
    Image,
}

impl FetchMode {
    pub fn accept(&self) -> &'static str {
        match self {
            FetchMode::Image => "image/*",
            FetchMode::Signed | FetchMode::Direct | FetchMode::Anonymous => "application/pdf",
        }
    }
}

/// The authenticated reports endpoints
#[async_trait(?Send)]
pub trait ReportsApi {
    /// Resolve a storage-relative path to a signed URL
    async fn signed_url(&self, storage_path: &str) -> Result<SignedUrl, FetchError>;

    /// Raw PDF bytes proxied through the backend
    async fn pdf_bytes(&self, document_id: &str) -> Result<Vec<u8>, FetchError>;

    /// Extracted vitals for a document, as returned by the backend
    async fn vitals(&self, document_id: &str) -> Result<Value, FetchError>;

    /// The raw document record
    async fn document(&self, document_id: &str) -> Result<Value, FetchError>;
}

/// Fetches content bytes from arbitrary URLs without credentials
#[async_trait(?Send)]
pub trait ContentFetcher {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<Vec<u8>, FetchError>;
}
