//! Image encoding: `DynamicImage` → JPEG bytes.
//!
//! Every built-in route ends here. JPEG has no alpha channel, so the image is
//! flattened to RGB8 first; the JPEG encoder rejects RGBA input outright.

use crate::error::BackendError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use tracing::debug;

/// Encode an image as baseline JPEG at the given quality (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, BackendError> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode {
            format: "JPEG".into(),
            detail: e.to_string(),
        })?;

    debug!("Encoded {}x{} image → {} bytes JPEG", width, height, buf.len());
    Ok(buf)
}
