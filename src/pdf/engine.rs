//! MuPDF-backed decoder

use async_trait::async_trait;
use image::RgbaImage;
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::decoder::{PdfDecoder, PdfDocument, check_signature};
use crate::error::DecodeError;

/// Opens documents with MuPDF
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfDecoder;

#[async_trait(?Send)]
impl PdfDecoder for MupdfDecoder {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, DecodeError> {
        check_signature(&bytes)?;
        let doc = Document::from_bytes(&bytes, "application/pdf")?;
        let page_count = doc.page_count()?.max(0) as usize;
        log::debug!("MuPDF opened document: {page_count} pages, {} bytes", bytes.len());
        Ok(Box::new(MupdfDocument { doc, page_count }))
    }
}

struct MupdfDocument {
    doc: Document,
    page_count: usize,
}

impl MupdfDocument {
    fn load(&self, page: usize) -> Result<mupdf::Page, DecodeError> {
        if page == 0 || page > self.page_count {
            return Err(DecodeError::generic(format!(
                "Invalid page request: {page} of {}",
                self.page_count
            )));
        }
        Ok(self.doc.load_page((page - 1) as i32)?)
    }
}

#[async_trait(?Send)]
impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn page_size(&self, page: usize) -> Result<(f32, f32), DecodeError> {
        let bounds = self.load(page)?.bounds()?;
        Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    async fn render_page(&self, page: usize, scale: f32) -> Result<RgbaImage, DecodeError> {
        let page = self.load(page)?;
        let rgb = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&Matrix::new_scale(scale, scale), &rgb, false, false)?;
        pixmap_to_rgba(&pixmap)
    }
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<RgbaImage, DecodeError> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(DecodeError::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(DecodeError::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        for px in row.chunks_exact(n) {
            out.extend_from_slice(&px[..3]);
            out.push(u8::MAX);
        }
    }

    RgbaImage::from_raw(width as u32, height as u32, out)
        .ok_or_else(|| DecodeError::generic("Pixmap buffer size mismatch"))
}
