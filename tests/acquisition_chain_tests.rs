use std::cell::Cell;

use report_viewer::api::FetchMode;
use report_viewer::error::AcquireError;
use report_viewer::pdf::{AcquireContext, AcquisitionChain, NoPdfEngine};
use report_viewer::test_utils::test_helpers::*;

const STORED: &str = "https://acct.blob.core.windows.net/reports/user-7/labs.pdf";
const SIGNED: &str = "https://acct.blob.core.windows.net/reports/user-7/labs.pdf?sig=1";

fn context<'a>(
    id: Option<&'a str>,
    url: &'a str,
    api: &'a MockApi,
    fetcher: &'a MockFetcher,
    decoder: &'a MockDecoder,
    cancelled: &'a dyn Fn() -> bool,
) -> AcquireContext<'a> {
    AcquireContext {
        document_id: id,
        content_url: url,
        api,
        fetcher,
        decoder,
        cancelled,
    }
}

#[tokio::test]
async fn first_success_wins_and_later_strategies_do_not_run() {
    let api = MockApi::new();
    let fetcher = MockFetcher::new().with_mode_reply(STORED, FetchMode::Direct, Ok(fake_pdf_bytes()));
    let decoder = MockDecoder::letter(2);
    let never = || false;
    let ctx = context(Some("doc-7"), STORED, &api, &fetcher, &decoder, &never);

    let acquired = AcquisitionChain::standard().acquire(&ctx).await.unwrap();

    assert_eq!(acquired.strategy, "direct");
    assert_eq!(acquired.document.page_count(), 2);
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::SignedUrl("user-7/labs.pdf".into()),
            ApiCall::PdfBytes("doc-7".into()),
        ]
    );
    assert_eq!(fetcher.modes(), vec![FetchMode::Direct]);
}

#[tokio::test]
async fn signed_url_is_preferred() {
    let api = MockApi::new()
        .with_signed_url(SIGNED)
        .with_pdf_bytes(fake_pdf_bytes());
    let fetcher = MockFetcher::new().with_response(SIGNED, fake_pdf_bytes());
    let decoder = MockDecoder::letter(1);
    let never = || false;
    let ctx = context(Some("doc-7"), STORED, &api, &fetcher, &decoder, &never);

    let acquired = AcquisitionChain::standard().acquire(&ctx).await.unwrap();

    assert_eq!(acquired.strategy, "signed-url");
    assert_eq!(fetcher.calls(), vec![(SIGNED.to_string(), FetchMode::Signed)]);
    assert_eq!(decoder.opened(), 1);
}

#[tokio::test]
async fn corrupt_bytes_fall_through_to_the_proxy() {
    let api = MockApi::new()
        .with_signed_url(SIGNED)
        .with_pdf_bytes(fake_pdf_bytes());
    let fetcher = MockFetcher::new().with_response(SIGNED, b"<html>expired</html>".to_vec());
    let decoder = MockDecoder::letter(3);
    let never = || false;
    let ctx = context(Some("doc-7"), STORED, &api, &fetcher, &decoder, &never);

    let acquired = AcquisitionChain::standard().acquire(&ctx).await.unwrap();

    assert_eq!(acquired.strategy, "backend-proxy");
    assert_eq!(acquired.document.page_count(), 3);
}

#[tokio::test]
async fn proxy_is_skipped_without_an_id() {
    let api = MockApi::new().with_pdf_bytes(fake_pdf_bytes());
    let fetcher = MockFetcher::new();
    let decoder = MockDecoder::letter(1);
    let never = || false;
    let ctx = context(None, STORED, &api, &fetcher, &decoder, &never);

    let err = AcquisitionChain::standard().acquire(&ctx).await.unwrap_err();

    assert_eq!(api.calls(), vec![ApiCall::SignedUrl("user-7/labs.pdf".into())]);
    assert_eq!(fetcher.modes(), vec![FetchMode::Direct, FetchMode::Anonymous]);
    match err {
        AcquireError::Exhausted { failures } => {
            let names: Vec<_> = failures.iter().map(|f| f.strategy).collect();
            assert_eq!(names, vec!["signed-url", "direct", "manual-fetch"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn exhausted_error_carries_last_failure() {
    let api = MockApi::new().failing_signed_url(MockFailure::MissingToken);
    let fetcher = MockFetcher::new().with_mode_reply(
        STORED,
        FetchMode::Anonymous,
        Err(MockFailure::Status("Failed to fetch PDF data", 403)),
    );
    let decoder = MockDecoder::letter(1);
    let never = || false;
    let ctx = context(Some("doc-7"), STORED, &api, &fetcher, &decoder, &never);

    let err = AcquisitionChain::standard().acquire(&ctx).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to fetch PDF data: 403");
}

#[tokio::test]
async fn nothing_applicable_without_url_or_id() {
    let api = MockApi::new();
    let fetcher = MockFetcher::new();
    let decoder = MockDecoder::letter(1);
    let never = || false;
    let ctx = context(None, "", &api, &fetcher, &decoder, &never);

    let err = AcquisitionChain::standard().acquire(&ctx).await.unwrap_err();

    assert_eq!(err.to_string(), "No acquisition strategy applicable");
    assert!(api.calls().is_empty());
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn cancellation_stops_before_the_next_strategy() {
    let api = MockApi::new();
    let fetcher = MockFetcher::new();
    let decoder = MockDecoder::letter(1);
    let checks = Cell::new(0);
    // Cancel once the first strategy has run
    let cancelled = || {
        checks.set(checks.get() + 1);
        checks.get() > 1
    };
    let ctx = context(Some("doc-7"), STORED, &api, &fetcher, &decoder, &cancelled);

    let err = AcquisitionChain::standard().acquire(&ctx).await.unwrap_err();

    assert!(matches!(err, AcquireError::Cancelled));
    assert_eq!(api.calls(), vec![ApiCall::SignedUrl("user-7/labs.pdf".into())]);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn builds_without_engine_report_decode_failure() {
    let api = MockApi::new().with_pdf_bytes(fake_pdf_bytes());
    let fetcher = MockFetcher::new();
    let decoder = NoPdfEngine;
    let never = || false;
    let ctx = AcquireContext {
        document_id: Some("doc-7"),
        content_url: "",
        api: &api,
        fetcher: &fetcher,
        decoder: &decoder,
        cancelled: &never,
    };

    let err = AcquisitionChain::standard().acquire(&ctx).await.unwrap_err();

    assert!(err.to_string().contains("PDF support not compiled in"));
}
