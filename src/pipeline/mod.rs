//! Pipeline stages for preview generation.
//!
//! Each submodule implements one concern, so a backend can be swapped
//! without touching route selection.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌──────────── custom handler ─────────────┐
//! dispatch ──┼── render (image / pdfium) ──▶ encode ────┼──▶ PreviewOutput
//!            └── office (soffice) ──▶ temp PDF ──▶ dispatch
//! ```
//!
//! 1. [`dispatch`]: MIME sniff, eligibility gate, route selection, recursion
//! 2. [`backend`]:  the `RasterEngine` / `DocumentConverter` seams
//! 3. [`render`]:   decode image files, rasterise one PDF page
//! 4. [`encode`]:   JPEG-encode the rendered image
//! 5. [`office`]:   word-processing document → PDF via LibreOffice

pub mod backend;
pub mod dispatch;
pub mod encode;
pub mod office;
pub mod render;
