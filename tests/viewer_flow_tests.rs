use std::rc::Rc;

use serde_json::json;
use tokio::sync::Notify;

use report_viewer::api::FetchMode;
use report_viewer::test_utils::test_helpers::*;
use report_viewer::vitals::{NO_PARAMETERS_MESSAGE, NOT_AVAILABLE_MESSAGE};
use report_viewer::{ContentKind, DocumentRecord, OpenOutcome, RasterSurface, Viewer, VitalsOutcome};

const STORED: &str = "https://acct.blob.core.windows.net/reports/user-3/cbc.pdf";
const SIGNED: &str = "https://acct.blob.core.windows.net/reports/user-3/cbc.pdf?sig=z";

fn viewer(
    api: &Rc<MockApi>,
    fetcher: &Rc<MockFetcher>,
    decoder: &Rc<MockDecoder>,
) -> Viewer<RecordingSurface> {
    Viewer::new(
        services(Rc::clone(api), Rc::clone(fetcher), Rc::clone(decoder)),
        RecordingSurface::new(),
    )
}

#[tokio::test]
async fn falls_back_to_direct_fetch_and_renders() {
    let api = Rc::new(MockApi::new());
    let fetcher = Rc::new(
        MockFetcher::new().with_mode_reply(STORED, FetchMode::Direct, Ok(fake_pdf_bytes())),
    );
    let decoder = Rc::new(MockDecoder::letter(5));
    let mut viewer = viewer(&api, &fetcher, &decoder);

    let outcome = viewer
        .open(DocumentRecord::new(Some("doc-3"), Some(STORED)))
        .await;

    assert_eq!(outcome, OpenOutcome::Shown(ContentKind::Pdf));
    assert_eq!(fetcher.modes(), vec![FetchMode::Direct]);
    assert_eq!(viewer.state().total_pages, 5);
    assert_eq!(viewer.surface().dimensions(), (918, 1188));
    assert_eq!(
        viewer.surface().canvas().pixels().get_pixel(10, 10),
        &page_color(1)
    );
}

#[tokio::test]
async fn record_json_aliases_drive_the_open() {
    let api = Rc::new(
        MockApi::new()
            .with_pdf_bytes(fake_pdf_bytes())
            .with_vitals(json!({"vitals_data": {"hemoglobin": {"value": 13.9, "unit": "g/dL"}}})),
    );
    let fetcher = Rc::new(MockFetcher::new());
    let decoder = Rc::new(MockDecoder::letter(2));
    let mut viewer = viewer(&api, &fetcher, &decoder);

    let record = DocumentRecord::from_json(&json!({
        "_id": "665f1c",
        "blob_url": "reports/user-3/cbc.pdf",
        "original_filename": "CBC March.pdf",
        "vitals_extracted": true
    }));
    let outcome = viewer.open(record).await;

    assert_eq!(outcome, OpenOutcome::Shown(ContentKind::Pdf));
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::SignedUrl("reports/user-3/cbc.pdf".into()),
            ApiCall::PdfBytes("665f1c".into()),
            ApiCall::Vitals("665f1c".into()),
        ]
    );
    let entries = viewer.vitals().entries();
    assert_eq!(entries[0].display_name, "Hemoglobin");
    assert_eq!(entries[0].formatted_value(), "13.9 g/dL");
}

#[tokio::test]
async fn page_walk_and_zoom_scenario() {
    let api = Rc::new(MockApi::new().with_signed_url(SIGNED));
    let fetcher = Rc::new(MockFetcher::new().with_response(SIGNED, fake_pdf_bytes()));
    let decoder = Rc::new(MockDecoder::letter(5));
    let mut viewer = viewer(&api, &fetcher, &decoder);
    viewer
        .open(DocumentRecord::new(Some("doc-3"), Some(STORED)))
        .await;

    assert!(!viewer.prev_page().await);
    for _ in 0..6 {
        viewer.next_page().await;
    }
    assert_eq!(viewer.page_label(), "5 / 5");

    viewer.zoom_out().await;
    assert_eq!(viewer.state().zoom.percent(), 125);
    assert_eq!(viewer.surface().dimensions(), (765, 990));
    assert_eq!(decoder.render_log().borrow().last(), Some(&(5, 1.25)));
}

#[tokio::test]
async fn close_during_acquisition_leaves_surface_untouched() {
    let gate = Rc::new(Notify::new());
    let api = Rc::new(
        MockApi::new()
            .with_signed_url(SIGNED)
            .gate_signed_url(Rc::clone(&gate)),
    );
    let fetcher = Rc::new(MockFetcher::new().with_response(SIGNED, fake_pdf_bytes()));
    let decoder = Rc::new(MockDecoder::letter(3));
    let mut viewer = viewer(&api, &fetcher, &decoder);
    let handle = viewer.close_handle();

    let (outcome, ()) = tokio::join!(
        viewer.open(DocumentRecord::new(Some("doc-3"), Some(STORED)).with_vitals(true)),
        async {
            tokio::task::yield_now().await;
            handle.close();
            gate.notify_one();
        }
    );

    assert_eq!(outcome, OpenOutcome::Cancelled);
    assert!(viewer.surface().ops().is_empty());
    assert!(decoder.render_log().borrow().is_empty());
    assert!(!viewer.has_document());
    assert_eq!(viewer.state().total_pages, 0);
    assert!(viewer.state().loading);
    assert!(
        !api.calls()
            .iter()
            .any(|c| matches!(c, ApiCall::Vitals(_)))
    );
}

#[tokio::test]
async fn close_during_page_render_discards_the_page() {
    let api = Rc::new(MockApi::new().with_signed_url(SIGNED));
    let fetcher = Rc::new(MockFetcher::new().with_response(SIGNED, fake_pdf_bytes()));
    let decoder = Rc::new(MockDecoder::letter(3));
    let mut viewer = viewer(&api, &fetcher, &decoder);
    viewer
        .open(DocumentRecord::new(Some("doc-3"), Some(STORED)))
        .await;
    let ops_before = viewer.surface().ops().len();
    let handle = viewer.close_handle();

    let (changed, ()) = tokio::join!(viewer.next_page(), async {
        handle.close();
    });

    assert!(changed);
    assert_eq!(viewer.surface().ops().len(), ops_before);
    assert_eq!(viewer.surface().paint_count(), 1);
    assert_eq!(decoder.render_log().borrow().len(), 2);
}

#[tokio::test]
async fn reopening_replaces_the_previous_document() {
    let png_url = "https://cdn.example.org/ecg.png";
    let api = Rc::new(MockApi::new().with_signed_url(SIGNED));
    let fetcher = Rc::new(
        MockFetcher::new()
            .with_response(SIGNED, fake_pdf_bytes())
            .with_response(png_url, png_bytes(300, 600)),
    );
    let decoder = Rc::new(MockDecoder::letter(4));
    let mut viewer = viewer(&api, &fetcher, &decoder);

    viewer
        .open(DocumentRecord::new(Some("doc-3"), Some(STORED)))
        .await;
    viewer.next_page().await;
    assert!(viewer.has_document());

    let outcome = viewer.open(DocumentRecord::new(None, Some(png_url))).await;

    assert_eq!(outcome, OpenOutcome::Shown(ContentKind::Image));
    assert!(!viewer.has_document());
    assert_eq!(viewer.state().total_pages, 0);
    assert_eq!(viewer.state().current_page, 1);
    assert_eq!(viewer.surface().dimensions(), (300, 600));
}

#[tokio::test]
async fn vitals_failure_is_isolated_from_the_document() {
    let api = Rc::new(MockApi::new().with_signed_url(SIGNED));
    let fetcher = Rc::new(MockFetcher::new().with_response(SIGNED, fake_pdf_bytes()));
    let decoder = Rc::new(MockDecoder::letter(1));
    let mut viewer = viewer(&api, &fetcher, &decoder);

    let outcome = viewer
        .open(DocumentRecord::new(Some("doc-3"), Some(STORED)).with_vitals(true))
        .await;

    assert_eq!(outcome, OpenOutcome::Shown(ContentKind::Pdf));
    assert_eq!(viewer.vitals(), &VitalsOutcome::Failed);
    assert_eq!(viewer.vitals().empty_message(), Some(NO_PARAMETERS_MESSAGE));
    assert!(viewer.state().error.is_none());
}

#[tokio::test]
async fn unflagged_document_skips_vitals_request() {
    let api = Rc::new(MockApi::new().with_vitals(json!({"glucose": {"value": "95"}})));
    let fetcher = Rc::new(MockFetcher::new());
    let decoder = Rc::new(MockDecoder::default());
    let mut viewer = viewer(&api, &fetcher, &decoder);

    viewer
        .open(DocumentRecord::new(Some("doc-3"), Some("scan.tiff")))
        .await;

    assert!(api.calls().is_empty());
    assert_eq!(viewer.vitals().empty_message(), Some(NOT_AVAILABLE_MESSAGE));
}

#[tokio::test]
async fn closing_returns_the_surface() {
    let api = Rc::new(MockApi::new());
    let fetcher = Rc::new(MockFetcher::new());
    let decoder = Rc::new(MockDecoder::default());
    let mut viewer = viewer(&api, &fetcher, &decoder);
    viewer.open(DocumentRecord::new(None, Some("notes.txt"))).await;

    let surface = viewer.close();

    assert_eq!(surface.dimensions(), (800, 600));
    assert_eq!(
        surface.placeholder_message(),
        Some("Document preview not available")
    );
}
