pub mod test_helpers {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::io::Cursor;
    use std::rc::Rc;
    use std::time::Duration;

    use async_trait::async_trait;
    use image::{ImageFormat, Rgba, RgbaImage};
    use serde_json::Value;
    use tokio::sync::Notify;

    use crate::api::{ContentFetcher, FetchMode, ReportsApi, SignedUrl};
    use crate::error::{DecodeError, FetchError};
    use crate::pdf::{PdfDecoder, PdfDocument, check_signature};
    use crate::surface::{Canvas, Placeholder, RasterSurface};
    use crate::viewer::ViewerServices;

    /// US Letter in points
    pub const LETTER: (f32, f32) = (612.0, 792.0);

    /// Cloneable description of a fetch failure
    #[derive(Clone, Debug)]
    pub enum MockFailure {
        Status(&'static str, u16),
        Invalid(String),
        MissingToken,
        Timeout,
    }

    impl MockFailure {
        pub fn to_error(&self, url: &str) -> FetchError {
            match self {
                MockFailure::Status(context, status) => FetchError::Status {
                    context: *context,
                    status: *status,
                },
                MockFailure::Invalid(msg) => FetchError::invalid(msg.clone()),
                MockFailure::MissingToken => FetchError::MissingToken,
                MockFailure::Timeout => FetchError::timeout(url),
            }
        }
    }

    pub type Reply<T> = Result<T, MockFailure>;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ApiCall {
        SignedUrl(String),
        PdfBytes(String),
        Vitals(String),
        Document(String),
    }

    /// Scripted reports API that records every call
    pub struct MockApi {
        signed_url: Reply<String>,
        pdf_bytes: Reply<Vec<u8>>,
        vitals: Reply<Value>,
        document: Reply<Value>,
        signed_url_gate: Option<Rc<Notify>>,
        calls: RefCell<Vec<ApiCall>>,
    }

    impl Default for MockApi {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockApi {
        /// Every endpoint fails until scripted otherwise
        pub fn new() -> Self {
            Self {
                signed_url: Err(MockFailure::Invalid("No signed URL in response".into())),
                pdf_bytes: Err(MockFailure::Status("Failed to get PDF data", 404)),
                vitals: Err(MockFailure::Status("Failed to get document vitals", 404)),
                document: Err(MockFailure::Status("Failed to get document content", 404)),
                signed_url_gate: None,
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn with_signed_url(mut self, url: &str) -> Self {
            self.signed_url = Ok(url.to_string());
            self
        }

        pub fn failing_signed_url(mut self, failure: MockFailure) -> Self {
            self.signed_url = Err(failure);
            self
        }

        pub fn with_pdf_bytes(mut self, bytes: Vec<u8>) -> Self {
            self.pdf_bytes = Ok(bytes);
            self
        }

        pub fn failing_pdf_bytes(mut self, failure: MockFailure) -> Self {
            self.pdf_bytes = Err(failure);
            self
        }

        pub fn with_vitals(mut self, body: Value) -> Self {
            self.vitals = Ok(body);
            self
        }

        pub fn with_document(mut self, body: Value) -> Self {
            self.document = Ok(body);
            self
        }

        /// Hold signed-URL requests until `gate` is notified
        pub fn gate_signed_url(mut self, gate: Rc<Notify>) -> Self {
            self.signed_url_gate = Some(gate);
            self
        }

        pub fn calls(&self) -> Vec<ApiCall> {
            self.calls.borrow().clone()
        }

        fn record(&self, call: ApiCall) {
            self.calls.borrow_mut().push(call);
        }
    }

    #[async_trait(?Send)]
    impl ReportsApi for MockApi {
        async fn signed_url(&self, storage_path: &str) -> Result<SignedUrl, FetchError> {
            self.record(ApiCall::SignedUrl(storage_path.to_string()));
            if let Some(gate) = &self.signed_url_gate {
                gate.notified().await;
            }
            match &self.signed_url {
                Ok(url) => Ok(SignedUrl {
                    url: url.clone(),
                    expires_in: Duration::from_secs(3600),
                }),
                Err(failure) => Err(failure.to_error(storage_path)),
            }
        }

        async fn pdf_bytes(&self, document_id: &str) -> Result<Vec<u8>, FetchError> {
            self.record(ApiCall::PdfBytes(document_id.to_string()));
            tokio::task::yield_now().await;
            self.pdf_bytes.clone().map_err(|f| f.to_error(document_id))
        }

        async fn vitals(&self, document_id: &str) -> Result<Value, FetchError> {
            self.record(ApiCall::Vitals(document_id.to_string()));
            self.vitals.clone().map_err(|f| f.to_error(document_id))
        }

        async fn document(&self, document_id: &str) -> Result<Value, FetchError> {
            self.record(ApiCall::Document(document_id.to_string()));
            self.document.clone().map_err(|f| f.to_error(document_id))
        }
    }

    struct FetchRule {
        url: String,
        mode: Option<FetchMode>,
        reply: Reply<Vec<u8>>,
    }

    /// Content fetcher answering from a rule table; unknown URLs get a 404
    #[derive(Default)]
    pub struct MockFetcher {
        rules: Vec<FetchRule>,
        calls: RefCell<Vec<(String, FetchMode)>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer `url` with `bytes` in every mode
        pub fn with_response(mut self, url: &str, bytes: Vec<u8>) -> Self {
            self.rules.push(FetchRule {
                url: url.to_string(),
                mode: None,
                reply: Ok(bytes),
            });
            self
        }

        /// Answer `url` in one mode only; takes precedence over any-mode rules
        pub fn with_mode_reply(mut self, url: &str, mode: FetchMode, reply: Reply<Vec<u8>>) -> Self {
            self.rules.push(FetchRule {
                url: url.to_string(),
                mode: Some(mode),
                reply,
            });
            self
        }

        pub fn calls(&self) -> Vec<(String, FetchMode)> {
            self.calls.borrow().clone()
        }

        pub fn modes(&self) -> Vec<FetchMode> {
            self.calls.borrow().iter().map(|(_, mode)| *mode).collect()
        }

        fn lookup(&self, url: &str, mode: FetchMode) -> Reply<Vec<u8>> {
            let exact = self
                .rules
                .iter()
                .find(|r| r.url == url && r.mode == Some(mode));
            let any = || self.rules.iter().find(|r| r.url == url && r.mode.is_none());
            match exact.or_else(any) {
                Some(rule) => rule.reply.clone(),
                None => Err(MockFailure::Status(
                    match mode {
                        FetchMode::Image => "Failed to load image",
                        _ => "Failed to fetch PDF data",
                    },
                    404,
                )),
            }
        }
    }

    #[async_trait(?Send)]
    impl ContentFetcher for MockFetcher {
        async fn fetch(&self, url: &str, mode: FetchMode) -> Result<Vec<u8>, FetchError> {
            self.calls.borrow_mut().push((url.to_string(), mode));
            tokio::task::yield_now().await;
            self.lookup(url, mode).map_err(|f| f.to_error(url))
        }
    }

    /// Shared log of `(page, scale)` render calls
    pub type RenderLog = Rc<RefCell<Vec<(usize, f32)>>>;

    /// Decoder producing [`MockDocument`]s for any bytes with a PDF signature
    #[derive(Default)]
    pub struct MockDecoder {
        pages: Vec<(f32, f32)>,
        failing_pages: HashSet<usize>,
        renders: RenderLog,
        opened: RefCell<usize>,
        released: Rc<RefCell<usize>>,
    }

    impl MockDecoder {
        pub fn new(pages: Vec<(f32, f32)>) -> Self {
            Self {
                pages,
                ..Self::default()
            }
        }

        /// `count` letter-sized pages
        pub fn letter(count: usize) -> Self {
            Self::new(vec![LETTER; count])
        }

        pub fn failing_page(mut self, page: usize) -> Self {
            self.failing_pages.insert(page);
            self
        }

        pub fn render_log(&self) -> RenderLog {
            Rc::clone(&self.renders)
        }

        pub fn opened(&self) -> usize {
            *self.opened.borrow()
        }

        /// How many opened documents have been dropped
        pub fn released(&self) -> usize {
            *self.released.borrow()
        }
    }

    #[async_trait(?Send)]
    impl PdfDecoder for MockDecoder {
        async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, DecodeError> {
            check_signature(&bytes)?;
            *self.opened.borrow_mut() += 1;
            Ok(Box::new(MockDocument {
                pages: self.pages.clone(),
                failing_pages: self.failing_pages.clone(),
                renders: Rc::clone(&self.renders),
                released: Rc::clone(&self.released),
            }))
        }
    }

    pub struct MockDocument {
        pages: Vec<(f32, f32)>,
        failing_pages: HashSet<usize>,
        renders: RenderLog,
        released: Rc<RefCell<usize>>,
    }

    impl Drop for MockDocument {
        fn drop(&mut self) {
            *self.released.borrow_mut() += 1;
        }
    }

    impl MockDocument {
        fn size(&self, page: usize) -> Result<(f32, f32), DecodeError> {
            page.checked_sub(1)
                .and_then(|i| self.pages.get(i))
                .copied()
                .ok_or_else(|| DecodeError::generic(format!("no page {page}")))
        }
    }

    #[async_trait(?Send)]
    impl PdfDocument for MockDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        async fn page_size(&self, page: usize) -> Result<(f32, f32), DecodeError> {
            self.size(page)
        }

        async fn render_page(&self, page: usize, scale: f32) -> Result<RgbaImage, DecodeError> {
            self.renders.borrow_mut().push((page, scale));
            tokio::task::yield_now().await;
            if self.failing_pages.contains(&page) {
                return Err(DecodeError::generic(format!("page {page} is damaged")));
            }
            let (w, h) = self.size(page)?;
            let dim = |v: f32| (v * scale).floor().max(1.0) as u32;
            Ok(RgbaImage::from_pixel(dim(w), dim(h), page_color(page)))
        }
    }

    /// Fill colour [`MockDocument`] uses for a page
    pub fn page_color(page: usize) -> Rgba<u8> {
        Rgba([(page * 40 % 256) as u8, 0x20, 0x40, 0xff])
    }

    /// Bytes that pass the PDF signature check
    pub fn fake_pdf_bytes() -> Vec<u8> {
        b"%PDF-1.7\n%mock document\n%%EOF\n".to_vec()
    }

    /// A solid PNG of the given size
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([30, 120, 200, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .expect("encode test png");
        out.into_inner()
    }

    pub fn services(
        api: Rc<MockApi>,
        fetcher: Rc<MockFetcher>,
        decoder: Rc<MockDecoder>,
    ) -> ViewerServices {
        ViewerServices {
            api,
            fetcher,
            decoder,
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum SurfaceOp {
        Resize(u32, u32),
        Clear,
        Paint(u32, u32),
        Placeholder(String),
    }

    /// Canvas that also records every operation applied to it
    #[derive(Default)]
    pub struct RecordingSurface {
        canvas: Canvas,
        ops: Vec<SurfaceOp>,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn ops(&self) -> &[SurfaceOp] {
            &self.ops
        }

        pub fn canvas(&self) -> &Canvas {
            &self.canvas
        }

        pub fn placeholder(&self) -> Option<&Placeholder> {
            self.canvas.placeholder()
        }

        pub fn placeholder_message(&self) -> Option<&str> {
            self.canvas.placeholder().map(|p| p.message.as_str())
        }

        pub fn paint_count(&self) -> usize {
            self.ops
                .iter()
                .filter(|op| matches!(op, SurfaceOp::Paint(..)))
                .count()
        }
    }

    impl RasterSurface for RecordingSurface {
        fn resize(&mut self, width: u32, height: u32) {
            self.ops.push(SurfaceOp::Resize(width, height));
            self.canvas.resize(width, height);
        }

        fn clear(&mut self) {
            self.ops.push(SurfaceOp::Clear);
            self.canvas.clear();
        }

        fn paint(&mut self, content: &RgbaImage) {
            let (w, h) = content.dimensions();
            self.ops.push(SurfaceOp::Paint(w, h));
            self.canvas.paint(content);
        }

        fn paint_placeholder(&mut self, placeholder: &Placeholder) {
            self.ops
                .push(SurfaceOp::Placeholder(placeholder.message.clone()));
            self.canvas.paint_placeholder(placeholder);
        }

        fn dimensions(&self) -> (u32, u32) {
            self.canvas.dimensions()
        }
    }
}
