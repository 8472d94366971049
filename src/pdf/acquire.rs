//! PDF acquisition strategy chain
//!
//! Strategies run in a fixed preference order and the first success wins:
//!
//! 1. signed URL for the stored object
//! 2. backend proxy returning the raw bytes
//! 3. direct fetch of the stored URL
//! 4. anonymous fetch of the stored URL
//!
//! A strategy whose inputs are missing is skipped rather than failed.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Url;

use super::decoder::{PdfDecoder, PdfDocument};
use crate::api::{ContentFetcher, FetchMode, ReportsApi};
use crate::error::{AcquireError, StrategyError, StrategyFailure};
use crate::source::strip_query;

const BLOB_HOST_SUFFIX: &str = ".blob.core.windows.net";

/// Everything a strategy may use for one acquisition
pub struct AcquireContext<'a> {
    pub document_id: Option<&'a str>,
    pub content_url: &'a str,
    pub api: &'a dyn ReportsApi,
    pub fetcher: &'a dyn ContentFetcher,
    pub decoder: &'a dyn PdfDecoder,
    /// Returns true once the owning session has been closed or superseded
    pub cancelled: &'a dyn Fn() -> bool,
}

/// One way of obtaining a decoded document
#[async_trait(?Send)]
pub trait AcquireStrategy {
    fn name(&self) -> &'static str;

    /// Whether the strategy's required inputs are present
    fn applies(&self, ctx: &AcquireContext<'_>) -> bool;

    async fn attempt(
        &self,
        ctx: &AcquireContext<'_>,
    ) -> Result<Box<dyn PdfDocument>, StrategyError>;
}

/// A successful acquisition
pub struct Acquired {
    pub document: Box<dyn PdfDocument>,
    pub strategy: &'static str,
}

impl std::fmt::Debug for Acquired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquired")
            .field("strategy", &self.strategy)
            .field("page_count", &self.document.page_count())
            .finish()
    }
}

/// Ordered list of strategies
pub struct AcquisitionChain {
    strategies: Vec<Box<dyn AcquireStrategy>>,
}

impl Default for AcquisitionChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl AcquisitionChain {
    /// The standard four-step chain
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(SignedUrlStrategy),
            Box::new(BackendProxyStrategy),
            Box::new(DirectStrategy),
            Box::new(ManualFetchStrategy),
        ])
    }

    #[must_use]
    pub fn new(strategies: Vec<Box<dyn AcquireStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order until one yields a document
    pub async fn acquire(&self, ctx: &AcquireContext<'_>) -> Result<Acquired, AcquireError> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            if (ctx.cancelled)() {
                debug!("Acquisition cancelled before {}", strategy.name());
                return Err(AcquireError::Cancelled);
            }
            if !strategy.applies(ctx) {
                debug!("Skipping {} strategy: inputs missing", strategy.name());
                continue;
            }

            debug!("Attempting PDF load via {}", strategy.name());
            match strategy.attempt(ctx).await {
                Ok(document) => {
                    info!(
                        "{} strategy succeeded: {} pages",
                        strategy.name(),
                        document.page_count()
                    );
                    return Ok(Acquired {
                        document,
                        strategy: strategy.name(),
                    });
                }
                Err(error) => {
                    warn!("{} strategy failed: {error}", strategy.name());
                    failures.push(StrategyFailure {
                        strategy: strategy.name(),
                        error,
                    });
                }
            }
        }

        if (ctx.cancelled)() {
            return Err(AcquireError::Cancelled);
        }
        Err(AcquireError::Exhausted { failures })
    }
}

/// Resolve a signed URL for the stored object and decode its bytes
pub struct SignedUrlStrategy;

#[async_trait(?Send)]
impl AcquireStrategy for SignedUrlStrategy {
    fn name(&self) -> &'static str {
        "signed-url"
    }

    fn applies(&self, ctx: &AcquireContext<'_>) -> bool {
        storage_path(ctx.content_url).is_some()
    }

    async fn attempt(
        &self,
        ctx: &AcquireContext<'_>,
    ) -> Result<Box<dyn PdfDocument>, StrategyError> {
        let path = storage_path(ctx.content_url).unwrap_or_default();
        debug!("Extracted storage path: {path}");
        let signed = ctx.api.signed_url(&path).await?;
        let bytes = ctx.fetcher.fetch(&signed.url, FetchMode::Signed).await?;
        Ok(ctx.decoder.open(bytes).await?)
    }
}

/// Let the backend fetch the bytes on our behalf
pub struct BackendProxyStrategy;

#[async_trait(?Send)]
impl AcquireStrategy for BackendProxyStrategy {
    fn name(&self) -> &'static str {
        "backend-proxy"
    }

    fn applies(&self, ctx: &AcquireContext<'_>) -> bool {
        ctx.document_id.is_some_and(|id| !id.is_empty())
    }

    async fn attempt(
        &self,
        ctx: &AcquireContext<'_>,
    ) -> Result<Box<dyn PdfDocument>, StrategyError> {
        let id = ctx.document_id.unwrap_or_default();
        let bytes = ctx.api.pdf_bytes(id).await?;
        Ok(ctx.decoder.open(bytes).await?)
    }
}

/// Fetch the stored URL asking explicitly for a PDF
pub struct DirectStrategy;

#[async_trait(?Send)]
impl AcquireStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn applies(&self, ctx: &AcquireContext<'_>) -> bool {
        !ctx.content_url.is_empty()
    }

    async fn attempt(
        &self,
        ctx: &AcquireContext<'_>,
    ) -> Result<Box<dyn PdfDocument>, StrategyError> {
        let bytes = ctx
            .fetcher
            .fetch(ctx.content_url, FetchMode::Direct)
            .await?;
        Ok(ctx.decoder.open(bytes).await?)
    }
}

/// Plain anonymous fetch, the last resort
pub struct ManualFetchStrategy;

#[async_trait(?Send)]
impl AcquireStrategy for ManualFetchStrategy {
    fn name(&self) -> &'static str {
        "manual-fetch"
    }

    fn applies(&self, ctx: &AcquireContext<'_>) -> bool {
        !ctx.content_url.is_empty()
    }

    async fn attempt(
        &self,
        ctx: &AcquireContext<'_>,
    ) -> Result<Box<dyn PdfDocument>, StrategyError> {
        let bytes = ctx
            .fetcher
            .fetch(ctx.content_url, FetchMode::Anonymous)
            .await?;
        debug!("PDF data fetched, size: {} bytes", bytes.len());
        Ok(ctx.decoder.open(bytes).await?)
    }
}

/// Derive the storage-relative path of a stored URL.
///
/// Blob-storage URLs lose their host and container segment, other absolute
/// URLs lose their host, and query strings are always dropped. Segments are
/// taken from the stored text as-is, never percent-encoded.
#[must_use]
pub fn storage_path(stored: &str) -> Option<String> {
    let stored = stored.trim();
    let path = match Url::parse(stored) {
        Ok(url) if url.has_host() => {
            let host = url.host_str().unwrap_or_default();
            let after_scheme = stored.split_once("://").map_or(stored, |(_, rest)| rest);
            let raw_path = strip_query(after_scheme)
                .split_once('/')
                .map_or("", |(_, path)| path);
            let mut segments: Vec<&str> =
                raw_path.split('/').filter(|seg| !seg.is_empty()).collect();
            if host.ends_with(BLOB_HOST_SUFFIX) && !segments.is_empty() {
                segments.remove(0);
            }
            segments.join("/")
        }
        _ => strip_query(stored).trim_start_matches('/').to_string(),
    };

    (!path.is_empty()).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_urls_drop_host_container_and_query() {
        assert_eq!(
            storage_path(
                "https://acct.blob.core.windows.net/reports/user-1/2024/scan.pdf?sv=1&sig=x"
            )
            .as_deref(),
            Some("user-1/2024/scan.pdf")
        );
    }

    #[test]
    fn other_hosts_keep_the_whole_path() {
        assert_eq!(
            storage_path("https://files.example.org/a/b.pdf").as_deref(),
            Some("a/b.pdf")
        );
    }

    #[test]
    fn relative_paths_pass_through() {
        assert_eq!(
            storage_path("user-1/scan.pdf?x=1").as_deref(),
            Some("user-1/scan.pdf")
        );
        assert_eq!(storage_path("/user-1/scan.pdf").as_deref(), Some("user-1/scan.pdf"));
    }

    #[test]
    fn segments_are_passed_through_unencoded() {
        assert_eq!(
            storage_path("https://acct.blob.core.windows.net/reports/user 1/CBC March.pdf")
                .as_deref(),
            Some("user 1/CBC March.pdf")
        );
        assert_eq!(
            storage_path("https://acct.blob.core.windows.net/reports/user-1/CBC%20March.pdf")
                .as_deref(),
            Some("user-1/CBC%20March.pdf")
        );
        assert_eq!(
            storage_path("https://files.example.org/uploads/résumé labs.pdf?x=1").as_deref(),
            Some("uploads/résumé labs.pdf")
        );
    }

    #[test]
    fn unresolvable_paths() {
        assert_eq!(storage_path(""), None);
        assert_eq!(storage_path("https://acct.blob.core.windows.net/"), None);
        assert_eq!(storage_path("?sig=only"), None);
    }

    #[test]
    fn standard_order() {
        assert_eq!(
            AcquisitionChain::standard().strategy_names(),
            vec!["signed-url", "backend-proxy", "direct", "manual-fetch"]
        );
    }
}
