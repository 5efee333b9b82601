//! Collaborator seams: the raster engine and the document converter.
//!
//! The pipeline only ever talks to these traits. The defaults,
//! [`DefaultRaster`] and [`crate::pipeline::office::LibreOfficeConverter`],
//! are built from a [`PreviewConfig`]; tests and hosts swap in their own.

use crate::config::PreviewConfig;
use crate::error::BackendError;
use crate::pipeline::{encode, render};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Decodes files into images and re-encodes them.
pub trait RasterEngine: Send + Sync {
    /// Load `path`. With a page index the file is treated as a paged
    /// document (PDF) and only that page is rendered; without one the whole
    /// file is decoded as an image.
    fn load(&self, path: &Path, page_index: Option<usize>) -> Result<DynamicImage, BackendError>;

    fn reencode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, BackendError>;
}

/// Converts a word-processing document into a PDF.
pub trait DocumentConverter: Send + Sync {
    /// Write a PDF rendition of `source` to `dest`, replacing it.
    fn convert(&self, source: &Path, dest: &Path) -> Result<(), BackendError>;
}

/// `image` for raster files, pdfium for PDF pages.
#[derive(Debug, Clone)]
pub struct DefaultRaster {
    pdfium_lib_path: Option<PathBuf>,
    max_rendered_pixels: u32,
    jpeg_quality: u8,
}

impl DefaultRaster {
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            pdfium_lib_path: config.pdfium_lib_path.clone(),
            max_rendered_pixels: config.max_rendered_pixels,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

impl Default for DefaultRaster {
    fn default() -> Self {
        Self::from_config(&PreviewConfig::default())
    }
}

impl RasterEngine for DefaultRaster {
    fn load(&self, path: &Path, page_index: Option<usize>) -> Result<DynamicImage, BackendError> {
        match page_index {
            Some(index) => {
                let pdfium = render::bind_pdfium(self.pdfium_lib_path.as_deref())?;
                render::render_pdf_page(&pdfium, path, index, self.max_rendered_pixels)
            }
            None => render::decode_image(path),
        }
    }

    fn reencode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, BackendError> {
        if format == ImageFormat::Jpeg {
            return encode::encode_jpeg(image, self.jpeg_quality);
        }

        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), format)
            .map_err(|e| BackendError::Encode {
                format: format!("{:?}", format),
                detail: e.to_string(),
            })?;
        Ok(buf)
    }
}
