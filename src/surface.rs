//! Raster surface the viewer paints into

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageResult, Rgba, RgbaImage};

/// Default placeholder dimensions
pub const PLACEHOLDER_WIDTH: u32 = 800;
pub const PLACEHOLDER_HEIGHT: u32 = 600;

const BACKGROUND: Rgba<u8> = Rgba([0xf7, 0xfa, 0xfc, 0xff]);
const BORDER: Rgba<u8> = Rgba([0xe2, 0xe8, 0xf0, 0xff]);
const ICON: Rgba<u8> = Rgba([0xa0, 0xae, 0xc0, 0xff]);
const BORDER_INSET: u32 = 10;
const BORDER_WIDTH: u32 = 2;

/// Static stand-in shown when content cannot be rendered
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// Document name, or a generic title
    pub title: String,
    pub message: String,
    pub width: u32,
    pub height: u32,
}

impl Placeholder {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            width: PLACEHOLDER_WIDTH,
            height: PLACEHOLDER_HEIGHT,
        }
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }
}

/// Operations the viewer needs from a drawable surface
pub trait RasterSurface {
    /// Resize to exactly `width` x `height` pixels
    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    /// Paint `content` so it fills the whole surface
    fn paint(&mut self, content: &RgbaImage);

    /// Replace the surface contents with a placeholder
    fn paint_placeholder(&mut self, placeholder: &Placeholder);

    fn dimensions(&self) -> (u32, u32);
}

/// In-memory RGBA surface
#[derive(Clone, Debug)]
pub struct Canvas {
    pixels: RgbaImage,
    placeholder: Option<Placeholder>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT)
    }
}

impl Canvas {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width.max(1), height.max(1)),
            placeholder: None,
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// The placeholder currently shown, if the surface holds one
    pub fn placeholder(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    pub fn save_png(&self, path: &Path) -> ImageResult<()> {
        self.pixels.save_with_format(path, image::ImageFormat::Png)
    }
}

impl RasterSurface for Canvas {
    fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.pixels.dimensions() != (width, height) {
            self.pixels = RgbaImage::new(width, height);
        }
    }

    fn clear(&mut self) {
        self.placeholder = None;
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    fn paint(&mut self, content: &RgbaImage) {
        self.placeholder = None;
        if content.dimensions() == self.pixels.dimensions() {
            self.pixels.copy_from_slice(content.as_raw());
        } else {
            let (width, height) = self.pixels.dimensions();
            self.pixels = imageops::resize(content, width, height, FilterType::Triangle);
        }
    }

    fn paint_placeholder(&mut self, placeholder: &Placeholder) {
        self.pixels = draw_placeholder(placeholder.width, placeholder.height);
        self.placeholder = Some(placeholder.clone());
    }

    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Background, inset border and a document glyph in the centre
fn draw_placeholder(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

    if width > 2 * BORDER_INSET && height > 2 * BORDER_INSET {
        let (x0, y0) = (BORDER_INSET, BORDER_INSET);
        let (x1, y1) = (width - BORDER_INSET, height - BORDER_INSET);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let inside = x >= x0 && x < x1 && y >= y0 && y < y1;
            let near_edge = x < x0 + BORDER_WIDTH
                || x >= x1 - BORDER_WIDTH
                || y < y0 + BORDER_WIDTH
                || y >= y1 - BORDER_WIDTH;
            if inside && near_edge {
                *px = BORDER;
            }
        }
    }

    let icon_w = (width / 12).max(1);
    let icon_h = (icon_w * 4 / 3).max(1);
    let cx = width / 2;
    let top = (height / 2).saturating_sub(icon_h + height / 12);
    let left = cx.saturating_sub(icon_w / 2);
    for y in top..(top + icon_h).min(height) {
        for x in left..(left + icon_w).min(width) {
            img.put_pixel(x, y, ICON);
        }
    }

    img
}
