//! Content classification by URL suffix

/// Extensions rendered as images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

pub const NO_URL_MESSAGE: &str = "No file URL available";
pub const UNSUPPORTED_MESSAGE: &str = "Document preview not available";

/// What kind of content a session is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentKind {
    Image,
    Pdf,
    Unsupported,
    #[default]
    Unknown,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Pdf => "pdf",
            ContentKind::Unsupported => "unsupported",
            ContentKind::Unknown => "unknown",
        }
    }

    /// Placeholder message for kinds that cannot be previewed
    pub fn placeholder_message(&self) -> Option<&'static str> {
        match self {
            ContentKind::Unknown => Some(NO_URL_MESSAGE),
            ContentKind::Unsupported => Some(UNSUPPORTED_MESSAGE),
            ContentKind::Image | ContentKind::Pdf => None,
        }
    }
}

/// Classify a content URL or storage path
#[must_use]
pub fn classify(content_url: Option<&str>) -> ContentKind {
    let Some(url) = content_url.map(str::trim).filter(|u| !u.is_empty()) else {
        return ContentKind::Unknown;
    };

    let path = strip_query(url);
    let Some(extension) = extension_of(path) else {
        return ContentKind::Unsupported;
    };

    if extension.eq_ignore_ascii_case("pdf") {
        ContentKind::Pdf
    } else if IMAGE_EXTENSIONS
        .iter()
        .any(|ext| extension.eq_ignore_ascii_case(ext))
    {
        ContentKind::Image
    } else {
        ContentKind::Unsupported
    }
}

/// Drop any query string or fragment
pub(crate) fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn extension_of(path: &str) -> Option<&str> {
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}
