//! PDF decoding seam
//!
//! The viewer never talks to a PDF engine directly: acquisition strategies
//! hand raw bytes to a [`PdfDecoder`], and the page renderer draws through
//! the resulting [`PdfDocument`]. Both traits are `?Send` because engines
//! such as MuPDF keep thread-affine state.

use async_trait::async_trait;
use image::RgbaImage;

use crate::error::DecodeError;

/// A decoded document, owned by one viewer session
#[async_trait(?Send)]
pub trait PdfDocument {
    /// Number of pages
    fn page_count(&self) -> usize;

    /// Native page size in points (scale 1.0), 1-based page index
    async fn page_size(&self, page: usize) -> Result<(f32, f32), DecodeError>;

    /// Rasterize a page at the given scale, 1-based page index
    async fn render_page(&self, page: usize, scale: f32) -> Result<RgbaImage, DecodeError>;
}

/// Opens documents from in-memory bytes
#[async_trait(?Send)]
pub trait PdfDecoder {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, DecodeError>;
}

/// Decoder used when the crate is built without a PDF engine
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPdfEngine;

#[async_trait(?Send)]
impl PdfDecoder for NoPdfEngine {
    async fn open(&self, _bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, DecodeError> {
        Err(DecodeError::generic(
            "PDF support not compiled in (enable the `pdf` feature)",
        ))
    }
}

/// Check the `%PDF-` signature before handing bytes to an engine
pub fn check_signature(bytes: &[u8]) -> Result<(), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::generic("Empty PDF data"));
    }
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        Ok(())
    } else {
        Err(DecodeError::generic("Invalid PDF structure"))
    }
}
