//! The preview unit of work: one file in, one preview out.
//!
//! ```text
//! Unbound ──bind──▶ Bound ──preview()──▶ Previewed ──stream()──▶ Previewed
//!    ▲                │  ▲    (error)       │
//!    └────────────────┴──┴──── bind ────────┘
//! ```
//!
//! Binding a new file from any state discards the previous output. A failed
//! `preview()` leaves the session bound with no output; `stream()` never
//! consumes the payload, so it can be called any number of times.

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::file::InputFile;
use crate::output::PreviewOutput;
use crate::pipeline::dispatch::ConversionPipeline;
use crate::registry::HandlerRegistry;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unbound,
    Bound,
    Previewed,
}

/// Holds the current input file and the preview produced for it.
#[derive(Debug, Clone)]
pub struct PreviewSession {
    pipeline: ConversionPipeline,
    file: Option<InputFile>,
    output: Option<PreviewOutput>,
}

impl Default for PreviewSession {
    fn default() -> Self {
        Self::new(ConversionPipeline::default())
    }
}

impl PreviewSession {
    /// An unbound session running `pipeline`.
    pub fn new(pipeline: ConversionPipeline) -> Self {
        Self {
            pipeline,
            file: None,
            output: None,
        }
    }

    /// An unbound session with default backends configured by `config`.
    pub fn with_config(config: &PreviewConfig) -> Self {
        Self::new(ConversionPipeline::new(config))
    }

    /// An unbound session sharing `registry`.
    pub fn with_registry(registry: Arc<HandlerRegistry>, config: &PreviewConfig) -> Self {
        Self::new(ConversionPipeline::with_registry(registry, config))
    }

    /// A fresh default session bound to `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let mut session = Self::default();
        session.bind_path(path);
        session
    }

    /// A fresh default session bound to `file`.
    pub fn from_file(file: InputFile) -> Self {
        let mut session = Self::default();
        session.bind_file(file);
        session
    }

    /// Bind a local file, discarding any previous output.
    pub fn bind_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.bind_file(InputFile::new(path))
    }

    /// Bind `file`, discarding any previous output.
    pub fn bind_file(&mut self, file: InputFile) -> &mut Self {
        debug!("Binding {}", file.path().display());
        self.file = Some(file);
        self.output = None;
        self
    }

    /// Generate the preview of the bound file.
    ///
    /// Any previous output is dropped before conversion starts, so a failure
    /// leaves the session with no output at all.
    pub fn preview(&mut self) -> Result<&mut Self, PreviewError> {
        self.output = None;
        let file = self.file.as_ref().ok_or(PreviewError::NoFile)?;
        let output = self.pipeline.generate(file)?;
        if output.is_complete() {
            self.output = Some(output);
        } else {
            debug!("Discarding incomplete preview of {}", file.path().display());
        }
        Ok(self)
    }

    /// Content type and a reader over the payload.
    pub fn stream(&self) -> Result<PreviewStream<'_>, PreviewError> {
        let output = self.output().ok_or(PreviewError::NotReady)?;
        Ok(PreviewStream {
            content_type: output.content_type(),
            reader: Cursor::new(output.payload()),
        })
    }

    /// Write the payload to `writer`, returning the content type to announce.
    pub fn stream_to<W: Write>(&self, writer: &mut W) -> Result<&str, PreviewError> {
        let output = self.output().ok_or(PreviewError::NotReady)?;
        writer
            .write_all(output.payload())
            .and_then(|()| writer.flush())
            .map_err(|source| PreviewError::StreamWriteFailed { source })?;
        Ok(output.content_type())
    }

    pub fn state(&self) -> SessionState {
        match (&self.file, &self.output) {
            (None, _) => SessionState::Unbound,
            (Some(_), None) => SessionState::Bound,
            (Some(_), Some(_)) => SessionState::Previewed,
        }
    }

    pub fn file(&self) -> Option<&InputFile> {
        self.file.as_ref()
    }

    /// The completed preview, if any.
    pub fn output(&self) -> Option<&PreviewOutput> {
        self.output.as_ref().filter(|o| o.is_complete())
    }

    /// Take the completed preview, returning the session to `Bound`.
    pub fn take_output(&mut self) -> Option<PreviewOutput> {
        self.output.take().filter(|o| o.is_complete())
    }

    pub fn pipeline(&self) -> &ConversionPipeline {
        &self.pipeline
    }
}

/// A borrowed view of a completed preview, ready for transmission.
#[derive(Debug)]
pub struct PreviewStream<'a> {
    content_type: &'a str,
    reader: Cursor<&'a [u8]>,
}

impl<'a> PreviewStream<'a> {
    pub fn content_type(&self) -> &'a str {
        self.content_type
    }

    /// Total payload length in bytes.
    pub fn len(&self) -> usize {
        self.reader.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Read for PreviewStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn session_with_text_handler() -> PreviewSession {
        let mut registry = HandlerRegistry::new();
        registry.register(
            "text/plain",
            |file: &InputFile| -> Result<PreviewOutput, PreviewError> {
                Ok(PreviewOutput::new("text/plain", file.read()?))
            },
        );
        PreviewSession::with_registry(Arc::new(registry), &PreviewConfig::default())
    }

    #[test]
    fn preview_without_file_is_no_file() {
        let mut session = PreviewSession::default();
        assert_eq!(session.state(), SessionState::Unbound);
        let err = session.preview().unwrap_err();
        assert!(matches!(err, PreviewError::NoFile));
    }

    #[test]
    fn stream_before_preview_is_not_ready() {
        let session = PreviewSession::from_path("/tmp/whatever.png");
        assert_eq!(session.state(), SessionState::Bound);
        assert!(matches!(session.stream(), Err(PreviewError::NotReady)));
    }

    #[test]
    fn stream_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "hello").unwrap();

        let mut session = session_with_text_handler();
        session.bind_path(&path).preview().unwrap();
        assert_eq!(session.state(), SessionState::Previewed);

        for _ in 0..2 {
            let mut stream = session.stream().unwrap();
            assert_eq!(stream.content_type(), "text/plain");
            let mut body = String::new();
            stream.read_to_string(&mut body).unwrap();
            assert_eq!(body, "hello");
        }
    }

    #[test]
    fn stream_to_writer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "abc").unwrap();

        let mut session = session_with_text_handler();
        session.bind_path(&path).preview().unwrap();

        let mut sink = Vec::new();
        assert_eq!(session.stream_to(&mut sink).unwrap(), "text/plain");
        assert_eq!(sink, b"abc");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_to_failing_writer_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "abc").unwrap();

        let mut session = session_with_text_handler();
        session.bind_path(&path).preview().unwrap();

        let err = session.stream_to(&mut BrokenPipe).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(
            &err,
            PreviewError::StreamWriteFailed { source } if source.kind() == io::ErrorKind::BrokenPipe
        ));
        // The preview survives a failed write.
        assert_eq!(session.state(), SessionState::Previewed);
    }

    #[test]
    fn rebinding_discards_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "abc").unwrap();

        let mut session = session_with_text_handler();
        session.bind_path(&path).preview().unwrap();
        session.bind_path(&path);
        assert_eq!(session.state(), SessionState::Bound);
        assert!(session.output().is_none());
    }

    #[test]
    fn failed_preview_clears_previous_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "abc").unwrap();

        let mut session = session_with_text_handler();
        session.bind_path(&path).preview().unwrap();

        // Rewrite as something that sniffs as a zip archive.
        fs::write(&path, b"PK\x03\x04\x14\x00\x00\x00\x00\x00").unwrap();
        let err = session.preview().unwrap_err();
        assert!(matches!(err, PreviewError::UnsupportedMime { .. }), "{err}");
        assert_eq!(session.state(), SessionState::Bound);
        assert!(matches!(session.stream(), Err(PreviewError::NotReady)));
    }

    #[test]
    fn incomplete_handler_output_is_never_streamed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();

        let mut session = session_with_text_handler();
        session.bind_path(&path).preview().unwrap();
        assert_eq!(session.state(), SessionState::Bound);
        assert!(matches!(session.stream(), Err(PreviewError::NotReady)));
    }
}
