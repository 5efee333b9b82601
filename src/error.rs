//! Error types for the file-preview library.
//!
//! Two layers reflect two distinct failure sources:
//!
//! * [`PreviewError`]: everything a caller of the preview API can see:
//!   no file bound, MIME type not previewable, route not implemented,
//!   stream requested too early, I/O around the input file.
//!
//! * [`BackendError`]: a collaborator (raster engine, document converter)
//!   failed. Wrapped as [`PreviewError::Backend`] so callers can tell a
//!   corrupt input or missing renderer apart from an unsupported format.
//!
//! [`PreviewError::kind`] flattens both into a copyable [`ErrorKind`] for
//! callers that only need to branch on the category.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the file-preview library.
#[derive(Debug, Error)]
pub enum PreviewError {
    // ── Session errors ────────────────────────────────────────────────────
    /// `preview()` was called before any file was bound.
    #[error("No file has been set.\nBind one with `bind_path` or `bind_file` first.")]
    NoFile,

    /// `stream()` was called before a preview completed.
    #[error("Preview is not ready to stream")]
    NotReady,

    // ── Dispatch errors ───────────────────────────────────────────────────
    /// The file's MIME type does not match any eligibility pattern.
    #[error("Unable to generate preview for file of MIME [{mime}]")]
    UnsupportedMime { mime: String },

    /// The MIME type is eligible, but no handler or built-in route exists.
    #[error(
        "Although it is possible to create a preview of the mime type [{mime}], \
no method for handling this has been implemented yet"
    )]
    UnimplementedRoute { mime: String },

    /// A raster engine or document converter failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Reading, writing or stat-ing the input file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the preview output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the payload to a caller-supplied sink failed.
    #[error("Failed to stream preview: {source}")]
    StreamWriteFailed {
        #[source]
        source: std::io::Error,
    },

    // ── Host errors ───────────────────────────────────────────────────────
    /// The async wrapper gave up waiting on the blocking pipeline.
    #[error("Preview generation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures reported by the conversion collaborators.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The raster engine could not decode the file (or the requested page).
    #[error("Could not decode '{path}': {detail}")]
    Decode { path: PathBuf, detail: String },

    /// Re-encoding the decoded image to the target format failed.
    #[error("Could not encode preview as {format}: {detail}")]
    Encode { format: String, detail: String },

    /// The document converter failed to produce a PDF.
    #[error("Document conversion of '{path}' failed: {detail}")]
    Document { path: PathBuf, detail: String },

    /// A backend library or executable could not be located.
    #[error("{backend} is not available: {hint}")]
    Unavailable { backend: String, hint: String },
}

/// Category of a [`PreviewError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoFile,
    UnsupportedMime,
    UnimplementedRoute,
    ConversionBackend,
    NotReady,
    Io,
    Timeout,
    InvalidConfig,
    Internal,
}

impl PreviewError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreviewError::NoFile => ErrorKind::NoFile,
            PreviewError::NotReady => ErrorKind::NotReady,
            PreviewError::UnsupportedMime { .. } => ErrorKind::UnsupportedMime,
            PreviewError::UnimplementedRoute { .. } => ErrorKind::UnimplementedRoute,
            PreviewError::Backend(_) => ErrorKind::ConversionBackend,
            PreviewError::FileNotFound { .. }
            | PreviewError::Io { .. }
            | PreviewError::OutputWriteFailed { .. }
            | PreviewError::StreamWriteFailed { .. } => ErrorKind::Io,
            PreviewError::Timeout { .. } => ErrorKind::Timeout,
            PreviewError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            PreviewError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Build an [`PreviewError::Io`], mapping `NotFound` to [`PreviewError::FileNotFound`].
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            PreviewError::FileNotFound { path }
        } else {
            PreviewError::Io { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_mime_display() {
        let e = PreviewError::UnsupportedMime {
            mime: "application/zip".into(),
        };
        assert!(e.to_string().contains("[application/zip]"), "got: {e}");
        assert_eq!(e.kind(), ErrorKind::UnsupportedMime);
    }

    #[test]
    fn backend_error_is_transparent() {
        let e: PreviewError = BackendError::Unavailable {
            backend: "LibreOffice".into(),
            hint: "install it".into(),
        }
        .into();
        assert_eq!(e.to_string(), "LibreOffice is not available: install it");
        assert_eq!(e.kind(), ErrorKind::ConversionBackend);
    }

    #[test]
    fn io_not_found_maps_to_file_not_found() {
        let e = PreviewError::io(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(e, PreviewError::FileNotFound { .. }));

        let e = PreviewError::io(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(e, PreviewError::Io { .. }));
        assert_eq!(e.kind(), ErrorKind::Io);
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::UnimplementedRoute).unwrap();
        assert_eq!(json, "\"unimplemented_route\"");
    }
}
