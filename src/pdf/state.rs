//! Viewer state management

use super::zoom::Zoom;
use crate::source::ContentKind;

/// Shown when a decoded PDF turns out to have no pages
pub const NO_PAGES_MESSAGE: &str = "Document has no pages";

/// Current state of one viewer session
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerState {
    /// Current page (1-indexed)
    pub current_page: usize,

    /// Total page count, 0 until a PDF is loaded
    pub total_pages: usize,

    /// Zoom factor, always within [0.5, 3.0]
    pub zoom: Zoom,

    /// True until the open transition settles
    pub loading: bool,

    /// User-visible failure message
    pub error: Option<String>,

    pub content_kind: ContentKind,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new(Zoom::DEFAULT_SCALE)
    }
}

impl ViewerState {
    #[must_use]
    pub fn new(initial_scale: f32) -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
            zoom: Zoom::new(initial_scale),
            loading: true,
            error: None,
            content_kind: ContentKind::Unknown,
        }
    }

    pub fn scale(&self) -> f32 {
        self.zoom.factor()
    }

    pub fn is_pdf(&self) -> bool {
        self.content_kind == ContentKind::Pdf
    }

    pub fn can_go_next(&self) -> bool {
        self.is_pdf() && self.current_page < self.total_pages
    }

    pub fn can_go_prev(&self) -> bool {
        self.is_pdf() && self.current_page > 1
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Reset => {
                let scale = self.scale();
                *self = Self::new(scale);
                vec![Effect::ReleaseDocument]
            }

            Command::Classified(kind) => {
                self.content_kind = kind;
                match kind.placeholder_message() {
                    Some(message) => {
                        self.loading = false;
                        vec![Effect::PaintPlaceholder(message.to_string())]
                    }
                    None => vec![],
                }
            }

            Command::ImageShown => {
                self.loading = false;
                vec![]
            }

            Command::ImageFailed(message) => {
                self.loading = false;
                vec![Effect::PaintPlaceholder(message)]
            }

            Command::DocumentLoaded { page_count } => {
                self.total_pages = page_count;
                self.current_page = 1;
                self.loading = false;
                self.error = None;
                if page_count > 0 {
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![Effect::PaintPlaceholder(NO_PAGES_MESSAGE.to_string())]
                }
            }

            Command::LoadFailed(message) => {
                self.loading = false;
                let effects = vec![Effect::PaintPlaceholder(format!(
                    "PDF Load Failed: {message}"
                ))];
                self.error = Some(message);
                effects
            }

            Command::NextPage => {
                if self.can_go_next() {
                    self.current_page += 1;
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::PrevPage => {
                if self.can_go_prev() {
                    self.current_page -= 1;
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::ZoomIn => {
                if self.is_pdf() && self.zoom.step_in() {
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::ZoomOut => {
                if self.is_pdf() && self.zoom.step_out() {
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::Close => vec![Effect::ReleaseDocument],
        }
    }

    /// Which navigation and zoom controls are currently usable
    #[must_use]
    pub fn controls(&self) -> Controls {
        let pdf_ready = self.is_pdf() && !self.loading && self.total_pages > 0;
        Controls {
            prev_page: pdf_ready && self.can_go_prev(),
            next_page: pdf_ready && self.can_go_next(),
            zoom_in: pdf_ready && self.zoom.can_zoom_in(),
            zoom_out: pdf_ready && self.zoom.can_zoom_out(),
        }
    }
}

/// Commands that modify viewer state
#[derive(Clone, Debug)]
pub enum Command {
    /// Start a fresh open, keeping the zoom factor
    Reset,
    /// Record the classification of the opened document
    Classified(ContentKind),
    /// The image was painted
    ImageShown,
    /// The image could not be loaded
    ImageFailed(String),
    /// A PDF handle was acquired
    DocumentLoaded { page_count: usize },
    /// Every acquisition strategy failed
    LoadFailed(String),
    NextPage,
    PrevPage,
    ZoomIn,
    ZoomOut,
    Close,
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Render the current page at the current scale
    RenderCurrentPage,
    /// Paint a placeholder carrying this message
    PaintPlaceholder(String),
    /// Drop the acquired document handle
    ReleaseDocument,
}

/// Enabled state of the viewer's buttons
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Controls {
    pub prev_page: bool,
    pub next_page: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_pdf(pages: usize) -> ViewerState {
        let mut state = ViewerState::default();
        let _ = state.apply(Command::Classified(ContentKind::Pdf));
        let _ = state.apply(Command::DocumentLoaded { page_count: pages });
        state
    }

    #[test]
    fn initial_state() {
        let state = ViewerState::default();
        assert!(state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.content_kind, ContentKind::Unknown);
        assert_eq!(state.scale(), 1.5);
        assert_eq!(state.controls(), Controls::default());
    }

    #[test]
    fn prev_on_first_page_is_noop() {
        let mut state = loaded_pdf(5);
        let before = state.clone();

        let effects = state.apply(Command::PrevPage);
        assert!(effects.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn next_page_stops_at_last() {
        let mut state = loaded_pdf(5);
        for _ in 0..5 {
            let _ = state.apply(Command::NextPage);
        }
        assert_eq!(state.current_page, 5);

        let effects = state.apply(Command::NextPage);
        assert!(effects.is_empty());
        assert_eq!(state.current_page, 5);
    }

    #[test]
    fn navigation_renders_current_page() {
        let mut state = loaded_pdf(3);
        assert_eq!(
            state.apply(Command::NextPage),
            vec![Effect::RenderCurrentPage]
        );
        assert_eq!(
            state.apply(Command::PrevPage),
            vec![Effect::RenderCurrentPage]
        );
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn zoom_at_bound_does_not_render() {
        let mut state = loaded_pdf(1);
        for _ in 0..6 {
            let _ = state.apply(Command::ZoomIn);
        }
        assert_eq!(state.scale(), 3.0);
        assert!(state.apply(Command::ZoomIn).is_empty());
        assert!(!state.controls().zoom_in);
        assert!(state.controls().zoom_out);
    }

    #[test]
    fn navigation_ignored_for_images() {
        let mut state = ViewerState::default();
        let _ = state.apply(Command::Classified(ContentKind::Image));
        let _ = state.apply(Command::ImageShown);

        assert!(state.apply(Command::NextPage).is_empty());
        assert!(state.apply(Command::ZoomIn).is_empty());
        assert_eq!(state.scale(), 1.5);
    }

    #[test]
    fn unsupported_paints_placeholder_and_settles() {
        let mut state = ViewerState::default();
        let effects = state.apply(Command::Classified(ContentKind::Unsupported));

        assert!(!state.loading);
        assert_eq!(
            effects,
            vec![Effect::PaintPlaceholder(
                "Document preview not available".to_string()
            )]
        );
    }

    #[test]
    fn empty_document_paints_placeholder() {
        let mut state = ViewerState::default();
        let _ = state.apply(Command::Classified(ContentKind::Pdf));
        let effects = state.apply(Command::DocumentLoaded { page_count: 0 });

        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(
            effects,
            vec![Effect::PaintPlaceholder(NO_PAGES_MESSAGE.to_string())]
        );
        assert_eq!(state.controls(), Controls::default());
    }

    #[test]
    fn load_failure_sets_error_and_placeholder() {
        let mut state = ViewerState::default();
        let _ = state.apply(Command::Classified(ContentKind::Pdf));
        let effects = state.apply(Command::LoadFailed("Failed to fetch PDF data: 403".into()));

        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("Failed to fetch PDF data: 403"));
        assert_eq!(
            effects,
            vec![Effect::PaintPlaceholder(
                "PDF Load Failed: Failed to fetch PDF data: 403".to_string()
            )]
        );
    }

    #[test]
    fn reset_keeps_zoom() {
        let mut state = loaded_pdf(4);
        let _ = state.apply(Command::ZoomOut);
        let _ = state.apply(Command::NextPage);

        let effects = state.apply(Command::Reset);
        assert_eq!(effects, vec![Effect::ReleaseDocument]);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 0);
        assert!(state.loading);
        assert_eq!(state.scale(), 1.25);
    }
}
