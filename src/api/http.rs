//! reqwest implementation of the backend collaborators

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ContentFetcher, FetchMode, ReportsApi, SignedUrl};
use crate::error::FetchError;
use crate::source::strip_query;

/// Supplies the bearer token for authenticated calls
pub trait TokenProvider {
    fn access_token(&self) -> Option<String>;
}

/// A token fixed at construction time
#[derive(Clone, Debug, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(default)]
    success: bool,
    signed_url: Option<String>,
    expires_in: Option<u64>,
    message: Option<String>,
}

/// HTTP client for the reports backend and for raw content
pub struct HttpBackend {
    client: Client,
    base_url: String,
    tokens: Box<dyn TokenProvider>,
}

impl HttpBackend {
    /// Build a client whose every request aborts after `timeout`
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: Box<dyn TokenProvider>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, FetchError> {
        let token = self.tokens.access_token().ok_or(FetchError::MissingToken)?;
        Ok(request.header(AUTHORIZATION, format!("Bearer {token}")))
    }

    async fn send(
        &self,
        url: &str,
        method: &str,
        request: RequestBuilder,
        context: &'static str,
    ) -> Result<reqwest::Response, FetchError> {
        let shown = strip_query(url);
        debug!("[API] {method} {shown}");
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;
        let status = response.status();
        debug!("[API] {method} {shown} ({})", status.as_u16());

        if status.is_success() {
            Ok(response)
        } else {
            Err(FetchError::Status {
                context,
                status: status.as_u16(),
            })
        }
    }

    async fn get_json(&self, path: &str, context: &'static str) -> Result<Value, FetchError> {
        let url = self.endpoint(path);
        let request = self.authorized(self.client.get(&url))?;
        let response = self.send(&url, "GET", request, context).await?;
        response
            .json()
            .await
            .map_err(|e| FetchError::from_transport(&url, e))
    }
}

#[async_trait(?Send)]
impl ReportsApi for HttpBackend {
    async fn signed_url(&self, storage_path: &str) -> Result<SignedUrl, FetchError> {
        let url = self.endpoint("reports/get-signed-url");
        let request = self
            .authorized(self.client.post(&url))?
            .json(&json!({ "blob_path": storage_path }));
        let response = self
            .send(&url, "POST", request, "Failed to get signed URL")
            .await?;
        let body: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| FetchError::from_transport(&url, e))?;

        let signed = parse_signed_url(body)?;
        info!(
            "Signed URL received, expires in {} seconds",
            signed.expires_in.as_secs()
        );
        Ok(signed)
    }

    async fn pdf_bytes(&self, document_id: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.endpoint(&format!("reports/get_pdf_data/{document_id}"));
        let request = self.authorized(self.client.get(&url))?;
        let response = self
            .send(&url, "GET", request, "Failed to get PDF data")
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_transport(&url, e))?;
        info!("PDF data received via proxy: {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn vitals(&self, document_id: &str) -> Result<Value, FetchError> {
        self.get_json(
            &format!("reports/get_vitals/{document_id}"),
            "Failed to get document vitals",
        )
        .await
    }

    async fn document(&self, document_id: &str) -> Result<Value, FetchError> {
        self.get_json(
            &format!("reports/get_document/{document_id}"),
            "Failed to get document content",
        )
        .await
    }
}

#[async_trait(?Send)]
impl ContentFetcher for HttpBackend {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url).header(ACCEPT, mode.accept());
        if mode == FetchMode::Direct {
            request = request.header(CACHE_CONTROL, "no-cache");
        }

        let context = match mode {
            FetchMode::Image => "Failed to load image",
            FetchMode::Signed | FetchMode::Direct | FetchMode::Anonymous => {
                "Failed to fetch PDF data"
            }
        };
        let response = self.send(url, "GET", request, context).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;
        if bytes.is_empty() {
            warn!("Empty body from {}", strip_query(url));
        }
        Ok(bytes.to_vec())
    }
}

fn parse_signed_url(body: SignedUrlResponse) -> Result<SignedUrl, FetchError> {
    match body.signed_url.filter(|u| !u.is_empty()) {
        Some(url) if body.success => Ok(SignedUrl {
            url,
            expires_in: Duration::from_secs(body.expires_in.unwrap_or(0)),
        }),
        _ => Err(FetchError::invalid(
            body.message
                .unwrap_or_else(|| "No signed URL in response".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(token: Option<&str>) -> HttpBackend {
        HttpBackend::new(
            "http://localhost:8000",
            Duration::from_secs(30),
            Box::new(StaticToken(token.map(str::to_string))),
        )
        .expect("client builds")
    }

    #[test]
    fn endpoints_join_base_url() {
        let api = backend(None);
        assert_eq!(
            api.endpoint("reports/get_vitals/7"),
            "http://localhost:8000/reports/get_vitals/7"
        );
        assert_eq!(
            api.endpoint("/reports/get-signed-url"),
            "http://localhost:8000/reports/get-signed-url"
        );
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let api = backend(None);
        let err = api.signed_url("u1/report.pdf").await.unwrap_err();
        assert!(matches!(err, FetchError::MissingToken));
        assert_eq!(
            err.to_string(),
            "No access token found. Please login again."
        );

        let err = api.pdf_bytes("doc-1").await.unwrap_err();
        assert!(matches!(err, FetchError::MissingToken));
    }

    #[tokio::test]
    async fn transport_errors_do_not_carry_signed_query() {
        let api = backend(Some("t"));
        let err = api
            .fetch("http://127.0.0.1:9/reports/u1/a.pdf?sv=1&sig=secret", FetchMode::Signed)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout { .. }));
        assert!(!err.to_string().contains("sig=secret"));
    }

    #[test]
    fn empty_token_counts_as_missing() {
        assert_eq!(StaticToken(Some(String::new())).access_token(), None);
        assert_eq!(
            StaticToken(Some("t".into())).access_token().as_deref(),
            Some("t")
        );
    }

    #[test]
    fn signed_url_response_parsing() {
        let ok = parse_signed_url(SignedUrlResponse {
            success: true,
            signed_url: Some("https://signed.example/r.pdf?sig=1".into()),
            expires_in: Some(3600),
            message: None,
        })
        .unwrap();
        assert_eq!(ok.expires_in, Duration::from_secs(3600));

        let err = parse_signed_url(SignedUrlResponse {
            success: false,
            signed_url: Some("https://signed.example/r.pdf".into()),
            expires_in: None,
            message: Some("Blob not found".into()),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Blob not found");

        let err = parse_signed_url(SignedUrlResponse {
            success: true,
            signed_url: None,
            expires_in: None,
            message: None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "No signed URL in response");
    }
}
