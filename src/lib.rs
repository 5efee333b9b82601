//! # file-preview
//!
//! Generate a small JPEG preview of an arbitrary file: the first page of a
//! PDF, the first frame of an image, or the first page of a word-processing
//! document after converting it to PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Sniff     magic bytes (infer), then extension (mime_guess)
//!  ├─ 2. Gate      MIME must match an eligibility pattern
//!  ├─ 3. Route     custom handler → PDF → image → office doc
//!  ├─ 4. Render    image decode, or pdfium page 0
//!  ├─ 5. Encode    JPEG, content type image/jpg
//!  └─ 6. Stream    content type + payload, repeatable
//! ```
//!
//! Office documents go through LibreOffice to a temporary PDF, which is then
//! previewed like any other PDF.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use file_preview::{PreviewConfig, PreviewSession};
//! use std::io::Read;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = PreviewSession::with_config(&PreviewConfig::default());
//!     session.bind_path("report.pdf").preview()?;
//!
//!     let mut stream = session.stream()?;
//!     let mut jpeg = Vec::new();
//!     stream.read_to_end(&mut jpeg)?;
//!     println!("{}: {} bytes", stream.content_type(), jpeg.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Handlers
//!
//! A handler registered for an exact MIME type takes precedence over every
//! built-in route, and its output is returned untouched:
//!
//! ```rust,no_run
//! use file_preview::{
//!     ConversionPipeline, HandlerRegistry, InputFile, PreviewConfig, PreviewError,
//!     PreviewOutput, PreviewSession,
//! };
//! use std::sync::Arc;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("text/plain", |file: &InputFile| -> Result<PreviewOutput, PreviewError> {
//!     Ok(PreviewOutput::new("text/plain", file.read()?))
//! });
//! let pipeline = ConversionPipeline::with_registry(Arc::new(registry), &PreviewConfig::default());
//! let mut session = PreviewSession::new(pipeline);
//! session.bind_path("notes.txt").preview().unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `file-preview` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off   | Embeds libpdfium in the binary via `pdfium-auto`; needs `PDFIUM_BUNDLE_LIB` at build time |
//!
//! ## Runtime Requirements
//!
//! - PDF previews need the pdfium shared library. It is looked up in
//!   `PDFIUM_LIB_PATH`, then the `pdfium-auto` cache, then the system loader
//!   path. The CLI downloads it into the cache on first use.
//! - Office previews need LibreOffice (`soffice`) on `PATH`, or an explicit
//!   `office_command`.
//!
//! Image previews need neither.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod file;
pub mod mime;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PreviewConfig, PreviewConfigBuilder};
pub use convert::{
    inspect, inspect_with, preview, preview_async, preview_from_bytes, preview_to_file,
    preview_with, preview_with_async, write_preview, FileInfo,
};
pub use error::{BackendError, ErrorKind, PreviewError};
pub use file::{FileAccessor, FileMetadata, InputFile, LocalFs};
pub use mime::{MimeClassifier, MimePattern, OfficeFamily};
pub use output::PreviewOutput;
pub use pipeline::backend::{DefaultRaster, DocumentConverter, RasterEngine};
pub use pipeline::dispatch::{ConversionPipeline, Route};
pub use pipeline::office::LibreOfficeConverter;
pub use registry::{HandlerRegistry, PreviewHandler};
pub use session::{PreviewSession, PreviewStream, SessionState};
