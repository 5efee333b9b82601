//! Rasterisation: decode an image file, or render one PDF page via pdfium.
//!
//! ## Why bind per call?
//!
//! Image previews must work on hosts without libpdfium, so the library is
//! only bound when a PDF page is actually requested. Binding is a `dlopen`
//! of an already-mapped library after the first time, which is cheap next to
//! rendering a page.
//!
//! ## Why cap pixels?
//!
//! Page sizes vary wildly. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded.

use crate::error::BackendError;
use image::{DynamicImage, ImageReader};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Bind libpdfium without touching the network.
///
/// Order: `lib_path`, then `PDFIUM_LIB_PATH`, then the pdfium-auto cache,
/// then the system library. An explicit path that fails is not retried
/// elsewhere.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, BackendError> {
    pdfium_auto::bind_pdfium_offline(lib_path).map_err(|e| BackendError::Unavailable {
        backend: "PDFium".into(),
        hint: e.to_string(),
    })
}

/// Decode an image file. Multi-frame formats yield their first frame.
pub fn decode_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let decode_err = |detail: String| BackendError::Decode {
        path: path.to_path_buf(),
        detail,
    };

    let image = ImageReader::open(path)
        .map_err(|e| decode_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    debug!(
        "Decoded {} → {}x{} px",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Render a single PDF page (0-based) to an image.
pub fn render_pdf_page(
    pdfium: &Pdfium,
    pdf_path: &Path,
    page_index: usize,
    max_pixels: u32,
) -> Result<DynamicImage, BackendError> {
    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| BackendError::Decode {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    if page_index >= total_pages {
        return Err(BackendError::Decode {
            path: pdf_path.to_path_buf(),
            detail: format!(
                "page {} is out of range (document has {} pages)",
                page_index + 1,
                total_pages
            ),
        });
    }

    let page = pages
        .get(page_index as u16)
        .map_err(|e| BackendError::Decode {
            path: pdf_path.to_path_buf(),
            detail: format!("page {}: {:?}", page_index + 1, e),
        })?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| BackendError::Decode {
            path: pdf_path.to_path_buf(),
            detail: format!("rasterisation of page {} failed: {:?}", page_index + 1, e),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_index + 1,
        image.width(),
        image.height()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn decode_png_by_content_not_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mislabelled.jpg");
        RgbImage::from_pixel(3, 2, Rgb([0, 128, 255]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let img = decode_image(&path).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
    }

    #[test]
    fn decode_garbage_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();

        let err = decode_image(&path).unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }), "{err}");
    }

    #[test]
    fn decode_missing_file_is_a_decode_error() {
        let err = decode_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }));
    }

    #[test]
    fn missing_explicit_library_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let lib = dir.path().join("libpdfium.so");

        let err = match bind_pdfium(Some(&lib)) {
            Ok(_) => panic!("bound a library that does not exist"),
            Err(e) => e,
        };
        match err {
            BackendError::Unavailable { backend, hint } => {
                assert_eq!(backend, "PDFium");
                assert!(hint.contains("libpdfium.so"), "{hint}");
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
