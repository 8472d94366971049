//! Viewer session controller
//!
//! Owns the [`ViewerState`], the raster surface and the acquired document.
//! Every operation takes `&mut self`, so a session never runs two opens or
//! renders at once; a [`CloseHandle`] can still end the session while an
//! operation is suspended, and nothing is mutated after that.

use std::rc::Rc;

use log::{debug, error, info, warn};

use crate::api::{ContentFetcher, FetchMode, ReportsApi};
use crate::error::AcquireError;
use crate::pdf::{
    AcquireContext, AcquisitionChain, Command, Controls, Effect, NO_PAGES_MESSAGE, PdfDecoder,
    PdfDocument, RequestTracker, ViewerState, Zoom,
};
use crate::record::DocumentRecord;
use crate::renderer::{RenderOutcome, fit_image, render_page};
use crate::session::{CloseHandle, Generation, SessionClock};
use crate::settings::Settings;
use crate::source::{ContentKind, classify, strip_query};
use crate::surface::{PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH, Placeholder, RasterSurface};
use crate::vitals::{VitalsOutcome, load_vitals};

pub const IMAGE_FAILED_MESSAGE: &str = "Image failed to load";

/// External collaborators of a viewer session
#[derive(Clone)]
pub struct ViewerServices {
    pub api: Rc<dyn ReportsApi>,
    pub fetcher: Rc<dyn ContentFetcher>,
    pub decoder: Rc<dyn PdfDecoder>,
}

/// Tunables taken from settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerOptions {
    pub initial_scale: f32,
    pub image_max: (u32, u32),
    pub placeholder_size: (u32, u32),
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            initial_scale: Zoom::DEFAULT_SCALE,
            image_max: (800, 600),
            placeholder_size: (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT),
        }
    }
}

impl From<&Settings> for ViewerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            initial_scale: Zoom::clamp_factor(settings.initial_scale),
            image_max: (settings.image_max_width, settings.image_max_height),
            placeholder_size: (settings.placeholder_width, settings.placeholder_height),
        }
    }
}

/// How an open settled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Content is on the surface
    Shown(ContentKind),
    /// Nothing to preview; a placeholder with this message is shown
    Placeholder(String),
    /// Loading failed; the error surface carries this message
    Failed(String),
    /// The session was closed or reopened while loading
    Cancelled,
    /// The session was already closed
    Closed,
}

/// One document viewer session
pub struct Viewer<S: RasterSurface> {
    services: ViewerServices,
    chain: AcquisitionChain,
    options: ViewerOptions,
    state: ViewerState,
    surface: S,
    document: Option<Box<dyn PdfDocument>>,
    record: Option<DocumentRecord>,
    vitals: VitalsOutcome,
    render_error: Option<String>,
    clock: SessionClock,
    requests: RequestTracker,
}

impl<S: RasterSurface> Viewer<S> {
    #[must_use]
    pub fn new(services: ViewerServices, surface: S) -> Self {
        Self::with_options(services, surface, ViewerOptions::default())
    }

    #[must_use]
    pub fn with_options(services: ViewerServices, surface: S, options: ViewerOptions) -> Self {
        Self {
            services,
            chain: AcquisitionChain::standard(),
            state: ViewerState::new(options.initial_scale),
            options,
            surface,
            document: None,
            record: None,
            vitals: VitalsOutcome::default(),
            render_error: None,
            clock: SessionClock::new(),
            requests: RequestTracker::new(),
        }
    }

    /// Replace the acquisition chain
    #[must_use]
    pub fn with_chain(mut self, chain: AcquisitionChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn vitals(&self) -> &VitalsOutcome {
        &self.vitals
    }

    pub fn record(&self) -> Option<&DocumentRecord> {
        self.record.as_ref()
    }

    /// Error from the most recent page render, if it failed
    pub fn render_error(&self) -> Option<&str> {
        self.render_error.as_deref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn controls(&self) -> Controls {
        if self.clock.is_closed() {
            return Controls::default();
        }
        self.state.controls()
    }

    /// "current / total" as shown between the page buttons
    pub fn page_label(&self) -> String {
        format!("{} / {}", self.state.current_page, self.state.total_pages)
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.clock.close_handle()
    }

    pub fn is_closed(&self) -> bool {
        self.clock.is_closed()
    }

    /// Open a document, replacing whatever the session showed before
    pub async fn open(&mut self, record: DocumentRecord) -> OpenOutcome {
        if self.release_if_closed() {
            return OpenOutcome::Closed;
        }

        let generation = self.clock.begin();
        self.requests.reset();
        self.render_error = None;
        self.vitals = VitalsOutcome::NotAvailable;
        let effects = self.state.apply(Command::Reset);
        self.execute(effects, generation).await;
        self.record = Some(record.clone());

        let kind = classify(record.content_url.as_deref());
        info!("Opening {} as {}", record.title(), kind.as_str());
        let effects = self.state.apply(Command::Classified(kind));
        self.execute(effects, generation).await;

        let outcome = match kind {
            ContentKind::Image => self.open_image(&record, generation).await,
            ContentKind::Pdf => self.open_pdf(&record, generation).await,
            ContentKind::Unsupported | ContentKind::Unknown => OpenOutcome::Placeholder(
                kind.placeholder_message().unwrap_or_default().to_string(),
            ),
        };
        if outcome == OpenOutcome::Cancelled {
            return outcome;
        }

        let api = Rc::clone(&self.services.api);
        let vitals = load_vitals(api.as_ref(), &record).await;
        if !self.clock.is_current(generation) {
            debug!("Dropping vitals for a closed session");
            return OpenOutcome::Cancelled;
        }
        self.vitals = vitals;

        outcome
    }

    /// Re-run the last open from scratch
    pub async fn retry(&mut self) -> Option<OpenOutcome> {
        let record = self.record.clone()?;
        info!("Retrying {}", record.title());
        Some(self.open(record).await)
    }

    pub async fn next_page(&mut self) -> bool {
        self.dispatch(Command::NextPage).await
    }

    pub async fn prev_page(&mut self) -> bool {
        self.dispatch(Command::PrevPage).await
    }

    pub async fn zoom_in(&mut self) -> bool {
        self.dispatch(Command::ZoomIn).await
    }

    pub async fn zoom_out(&mut self) -> bool {
        self.dispatch(Command::ZoomOut).await
    }

    /// End the session and release the document
    pub fn close(mut self) -> S {
        for effect in self.state.apply(Command::Close) {
            self.apply_effect(effect);
        }
        self.clock.close();
        info!("Viewer closed");
        self.surface
    }

    /// Apply a navigation or zoom command; returns whether it did anything
    async fn dispatch(&mut self, cmd: Command) -> bool {
        if self.release_if_closed() {
            return false;
        }
        let generation = self.clock.current();
        let effects = self.state.apply(cmd);
        let changed = !effects.is_empty();
        self.execute(effects, generation).await;
        changed
    }

    async fn execute(&mut self, effects: Vec<Effect>, generation: Generation) {
        for effect in effects {
            if !self.clock.is_current(generation) {
                return;
            }
            match effect {
                Effect::RenderCurrentPage => self.render_current(generation).await,
                other => self.apply_effect(other),
            }
        }
    }

    /// Carry out an effect that needs no awaiting
    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::PaintPlaceholder(message) => self.paint_placeholder(message),
            Effect::ReleaseDocument => self.document = None,
            Effect::RenderCurrentPage => debug!("Render skipped outside an async operation"),
        }
    }

    async fn open_image(&mut self, record: &DocumentRecord, generation: Generation) -> OpenOutcome {
        let url = record.content_url.as_deref().unwrap_or_default();
        let fetcher = Rc::clone(&self.services.fetcher);
        let fetched = fetcher.fetch(url, FetchMode::Image).await;
        if !self.clock.is_current(generation) {
            return OpenOutcome::Cancelled;
        }

        let (max_width, max_height) = self.options.image_max;
        let fitted = fetched
            .map_err(|e| e.to_string())
            .and_then(|bytes| fit_image(&bytes, max_width, max_height).map_err(|e| e.to_string()));

        match fitted {
            Ok(img) => {
                let (width, height) = img.dimensions();
                self.surface.resize(width, height);
                self.surface.clear();
                self.surface.paint(&img);
                let _ = self.state.apply(Command::ImageShown);
                info!("Image loaded: {width}x{height}");
                OpenOutcome::Shown(ContentKind::Image)
            }
            Err(message) => {
                warn!("Failed to load image {}: {message}", strip_query(url));
                let effects = self
                    .state
                    .apply(Command::ImageFailed(IMAGE_FAILED_MESSAGE.to_string()));
                self.execute(effects, generation).await;
                OpenOutcome::Placeholder(IMAGE_FAILED_MESSAGE.to_string())
            }
        }
    }

    async fn open_pdf(&mut self, record: &DocumentRecord, generation: Generation) -> OpenOutcome {
        let services = self.services.clone();
        let clock = self.clock.clone();
        let cancelled = move || !clock.is_current(generation);
        let ctx = AcquireContext {
            document_id: record.id.as_deref(),
            content_url: record.content_url.as_deref().unwrap_or_default(),
            api: services.api.as_ref(),
            fetcher: services.fetcher.as_ref(),
            decoder: services.decoder.as_ref(),
            cancelled: &cancelled,
        };

        let result = self.chain.acquire(&ctx).await;
        if !self.clock.is_current(generation) {
            debug!("Discarding acquisition for a closed session");
            return OpenOutcome::Cancelled;
        }

        match result {
            Ok(acquired) => {
                let page_count = acquired.document.page_count();
                info!(
                    "PDF acquired via {}: {page_count} pages",
                    acquired.strategy
                );
                self.document = Some(acquired.document);
                let effects = self.state.apply(Command::DocumentLoaded { page_count });
                self.execute(effects, generation).await;
                if page_count == 0 {
                    warn!("PDF has no pages");
                    OpenOutcome::Placeholder(NO_PAGES_MESSAGE.to_string())
                } else {
                    OpenOutcome::Shown(ContentKind::Pdf)
                }
            }
            Err(AcquireError::Cancelled) => OpenOutcome::Cancelled,
            Err(e) => {
                let message = e.to_string();
                error!("PDF load failed: {message}");
                let effects = self.state.apply(Command::LoadFailed(message.clone()));
                self.execute(effects, generation).await;
                OpenOutcome::Failed(message)
            }
        }
    }

    async fn render_current(&mut self, generation: Generation) {
        let Some(doc) = self.document.as_deref() else {
            return;
        };
        let id = self.requests.issue();
        let page = self.state.current_page;
        let scale = self.state.scale();

        let clock = &self.clock;
        let requests = &self.requests;
        let result = render_page(doc, page, scale, &mut self.surface, || {
            clock.is_current(generation) && requests.is_latest(id)
        })
        .await;

        match result {
            Ok(RenderOutcome::Painted(_)) => self.render_error = None,
            Ok(RenderOutcome::Superseded) => {}
            Err(e) => {
                if !self.clock.is_current(generation) || !self.requests.is_latest(id) {
                    return;
                }
                let message = format!("Failed to render page {page}: {e}");
                error!("{message}");
                self.paint_placeholder(message.clone());
                self.render_error = Some(message);
            }
        }
    }

    fn paint_placeholder(&mut self, message: String) {
        let title = self
            .record
            .as_ref()
            .map(|r| r.title().to_string())
            .unwrap_or_else(|| "Document Preview".to_string());
        let (width, height) = self.options.placeholder_size;
        debug!("Painting placeholder: {message}");
        self.surface
            .paint_placeholder(&Placeholder::new(title, message).with_size(width, height));
    }

    fn release_if_closed(&mut self) -> bool {
        if self.clock.is_closed() {
            self.document = None;
            true
        } else {
            false
        }
    }
}
