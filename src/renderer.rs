//! Page and image rendering into a raster surface

use image::RgbaImage;
use image::imageops::{self, FilterType};
use log::debug;

use crate::error::{DecodeError, RenderError};
use crate::pdf::PdfDocument;
use crate::surface::RasterSurface;

/// Pixel-space rectangle a page is rendered into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Scale a native page size; 1.0 is the document's own size
    #[must_use]
    pub fn at_scale(native: (f32, f32), scale: f32) -> Self {
        let dim = |v: f32| (v * scale).floor().max(1.0) as u32;
        Self {
            width: dim(native.0),
            height: dim(native.1),
        }
    }
}

/// What happened to a render request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Painted(Viewport),
    /// A later request or a close made this one obsolete; nothing was drawn
    Superseded,
}

/// Render one page of `doc` into `surface`.
///
/// The surface is touched only after the page has been decoded and only if
/// `is_current` still holds at that point.
pub async fn render_page<S>(
    doc: &dyn PdfDocument,
    page: usize,
    scale: f32,
    surface: &mut S,
    is_current: impl Fn() -> bool,
) -> Result<RenderOutcome, RenderError>
where
    S: RasterSurface + ?Sized,
{
    let total = doc.page_count();
    if page == 0 || page > total {
        return Err(RenderError::PageOutOfRange { page, total });
    }

    let native = doc.page_size(page).await?;
    let viewport = Viewport::at_scale(native, scale);
    let content = doc.render_page(page, scale).await?;

    if !is_current() {
        debug!("Discarding superseded render of page {page}");
        return Ok(RenderOutcome::Superseded);
    }

    surface.resize(viewport.width, viewport.height);
    surface.clear();
    surface.paint(&content);
    debug!(
        "Page {page} rendered at {scale}: {}x{}",
        viewport.width, viewport.height
    );
    Ok(RenderOutcome::Painted(viewport))
}

/// Decode image bytes and scale them to fit within the bounds, keeping the
/// aspect ratio
pub fn fit_image(bytes: &[u8], max_width: u32, max_height: u32) -> Result<RgbaImage, DecodeError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = fit_dimensions(img.dimensions(), max_width, max_height);
    Ok(imageops::resize(&img, width, height, FilterType::Triangle))
}

/// Width-first fit: use the full width unless that overflows the height
fn fit_dimensions((w, h): (u32, u32), max_width: u32, max_height: u32) -> (u32, u32) {
    if w == 0 || h == 0 {
        return (max_width.max(1), max_height.max(1));
    }
    let aspect = w as f64 / h as f64;
    let mut width = max_width as f64;
    let mut height = width / aspect;
    if height > max_height as f64 {
        height = max_height as f64;
        width = height * aspect;
    }
    (width.round().max(1.0) as u32, height.round().max(1.0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn viewport_scales_linearly() {
        let native = (612.0, 792.0);
        assert_eq!(
            Viewport::at_scale(native, 1.0),
            Viewport {
                width: 612,
                height: 792
            }
        );
        assert_eq!(
            Viewport::at_scale(native, 1.5),
            Viewport {
                width: 918,
                height: 1188
            }
        );
        assert_eq!(
            Viewport::at_scale(native, 0.5),
            Viewport {
                width: 306,
                height: 396
            }
        );
    }

    #[test]
    fn fit_wide_and_tall_images() {
        assert_eq!(fit_dimensions((1600, 800), 800, 600), (800, 400));
        assert_eq!(fit_dimensions((600, 1200), 800, 600), (300, 600));
        assert_eq!(fit_dimensions((100, 75), 800, 600), (800, 600));
    }

    #[test]
    fn fit_image_decodes_png() {
        let src = RgbaImage::from_pixel(40, 20, Rgba([200, 10, 10, 255]));
        let mut bytes = Cursor::new(Vec::new());
        src.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let fitted = fit_image(bytes.get_ref(), 800, 600).unwrap();
        assert_eq!(fitted.dimensions(), (800, 400));
    }

    #[test]
    fn fit_image_rejects_garbage() {
        assert!(fit_image(b"not an image", 800, 600).is_err());
    }
}
