//! One-shot preview entry points.
//!
//! These wrap a fresh [`PreviewSession`] for callers who have a path and want
//! bytes back. Hosts that register custom handlers or previews many files
//! should build a [`ConversionPipeline`] once and reuse it.

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::file::InputFile;
use crate::output::PreviewOutput;
use crate::pipeline::dispatch::{ConversionPipeline, Route};
use crate::session::PreviewSession;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Generate the preview of a local file.
///
/// # Errors
/// - [`PreviewError::FileNotFound`] when `path` does not exist
/// - [`PreviewError::UnsupportedMime`] when the sniffed type is not eligible
/// - [`PreviewError::UnimplementedRoute`] when it is eligible but has no route
/// - [`PreviewError::Backend`] when decoding, rendering or conversion fails
pub fn preview(path: impl AsRef<Path>, config: &PreviewConfig) -> Result<PreviewOutput, PreviewError> {
    preview_with(&ConversionPipeline::new(config), path)
}

/// Generate a preview with an existing pipeline.
pub fn preview_with(
    pipeline: &ConversionPipeline,
    path: impl AsRef<Path>,
) -> Result<PreviewOutput, PreviewError> {
    let start = Instant::now();
    let path = path.as_ref();
    let file = InputFile::new(path);
    if !file.exists() {
        return Err(PreviewError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut session = PreviewSession::new(pipeline.clone());
    session.bind_file(file).preview()?;
    let output = session.take_output().ok_or(PreviewError::NotReady)?;

    info!(
        "Preview of {} complete: {} {} in {}ms",
        path.display(),
        output.content_type(),
        output.len(),
        start.elapsed().as_millis()
    );
    Ok(output)
}

/// Generate a preview and write the payload to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub fn preview_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &PreviewConfig,
) -> Result<PreviewOutput, PreviewError> {
    let output = preview(path, config)?;
    write_preview(&output, output_path)?;
    Ok(output)
}

/// Write a preview payload to `out`, creating parent directories.
///
/// The payload goes to `<out>.tmp` first and is renamed into place, so
/// readers never observe a partial file.
pub fn write_preview(output: &PreviewOutput, out: impl AsRef<Path>) -> Result<(), PreviewError> {
    let out = out.as_ref();
    let write_err = |source| PreviewError::OutputWriteFailed {
        path: out.to_path_buf(),
        source,
    };

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = out.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    std::fs::write(&tmp_path, output.payload()).map_err(write_err)?;
    if let Err(e) = std::fs::rename(&tmp_path, out) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes to {}", output.len(), out.display());
    Ok(())
}

/// Generate a preview of in-memory file contents.
///
/// `bytes` are spilled to a managed [`tempfile`] that is removed on return.
/// Sniffing relies on magic bytes alone since there is no file name to fall
/// back on.
pub fn preview_from_bytes(bytes: &[u8], config: &PreviewConfig) -> Result<PreviewOutput, PreviewError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| PreviewError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| PreviewError::Internal(format!("tempfile write: {e}")))?;
    // `tmp` is dropped (and the file deleted) when `preview` returns
    preview(tmp.path(), config)
}

/// Async wrapper around [`preview`], bounded by `config.timeout_secs`.
///
/// Conversion is CPU-bound and may shell out to LibreOffice, so it runs on
/// the blocking pool.
pub async fn preview_async(
    path: impl AsRef<Path>,
    config: &PreviewConfig,
) -> Result<PreviewOutput, PreviewError> {
    let pipeline = ConversionPipeline::new(config);
    preview_with_async(
        pipeline,
        path.as_ref().to_path_buf(),
        Duration::from_secs(config.timeout_secs),
    )
    .await
}

/// Async wrapper around [`preview_with`] with an explicit deadline.
///
/// On timeout the blocking task is left to finish in the background; its
/// result is discarded.
pub async fn preview_with_async(
    pipeline: ConversionPipeline,
    path: PathBuf,
    timeout: Duration,
) -> Result<PreviewOutput, PreviewError> {
    let task = tokio::task::spawn_blocking(move || preview_with(&pipeline, path));
    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined.map_err(|e| PreviewError::Internal(format!("preview task: {e}")))?,
        Err(_) => Err(PreviewError::Timeout {
            secs: timeout.as_secs(),
        }),
    }
}

/// What the engine knows about a file without converting it.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub mime: String,
    pub eligible: bool,
    /// Route a preview would take; `None` when ineligible or unrouted.
    pub route: Option<Route>,
    pub size: u64,
    pub human_size: String,
    pub accessed: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub changed: DateTime<Utc>,
    pub is_file: bool,
    pub is_link: bool,
}

/// Sniff and stat `path` against the default eligibility rules.
pub fn inspect(path: impl AsRef<Path>) -> Result<FileInfo, PreviewError> {
    inspect_with(&ConversionPipeline::default(), path)
}

/// Sniff and stat `path` against `pipeline`'s registry.
pub fn inspect_with(
    pipeline: &ConversionPipeline,
    path: impl AsRef<Path>,
) -> Result<FileInfo, PreviewError> {
    let file = InputFile::new(path.as_ref());
    let meta = file.metadata()?;
    let mime = file.mime()?;

    Ok(FileInfo {
        path: file.path().to_path_buf(),
        eligible: pipeline.registry().is_eligible(&mime),
        route: pipeline.route_for(&mime).ok(),
        mime,
        size: meta.size,
        human_size: crate::file::human_size(meta.size),
        accessed: meta.accessed,
        modified: meta.modified,
        changed: meta.changed,
        is_file: file.is_file(),
        is_link: file.is_link(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn png_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("swatch.png");
        RgbImage::from_pixel(8, 6, Rgb([200, 40, 40])).save(&path).unwrap();
        path
    }

    #[test]
    fn preview_missing_file() {
        let err = preview("/nonexistent/file.png", &PreviewConfig::default()).unwrap_err();
        assert!(matches!(err, PreviewError::FileNotFound { .. }), "{err}");
    }

    #[test]
    fn preview_png_yields_jpeg() {
        let dir = TempDir::new().unwrap();
        let out = preview(png_fixture(&dir), &PreviewConfig::default()).unwrap();
        assert_eq!(out.content_type(), "image/jpg");
        assert_eq!(&out.payload()[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn preview_to_file_is_atomic() {
        let dir = TempDir::new().unwrap();
        let src = png_fixture(&dir);
        let dest = dir.path().join("nested/out/preview.jpg");

        let out = preview_to_file(&src, &dest, &PreviewConfig::default()).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), out.payload());
        assert!(!dir.path().join("nested/out/preview.jpg.tmp").exists());
    }

    #[test]
    fn write_preview_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("thumb.jpg");
        std::fs::write(&dest, b"stale contents that are longer").unwrap();

        let output = PreviewOutput::jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9]);
        write_preview(&output, &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), output.payload());
        assert!(!dir.path().join("thumb.jpg.tmp").exists());
    }

    #[test]
    fn write_preview_under_a_file_is_output_write_failed() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let dest = blocker.join("thumb.jpg");

        let err = write_preview(&PreviewOutput::jpeg(vec![1, 2, 3]), &dest).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
        assert!(
            matches!(&err, PreviewError::OutputWriteFailed { path, .. } if *path == dest),
            "{err}"
        );
    }

    #[test]
    fn preview_from_png_bytes() {
        let dir = TempDir::new().unwrap();
        let bytes = std::fs::read(png_fixture(&dir)).unwrap();
        let out = preview_from_bytes(&bytes, &PreviewConfig::default()).unwrap();
        assert!(out.is_complete());
    }

    #[test]
    fn preview_from_unknown_bytes_is_unsupported() {
        let err = preview_from_bytes(b"just some bytes", &PreviewConfig::default()).unwrap_err();
        assert!(matches!(err, PreviewError::UnsupportedMime { .. }), "{err}");
    }

    #[test]
    fn inspect_reports_route_and_size() {
        let dir = TempDir::new().unwrap();
        let path = png_fixture(&dir);
        let info = inspect(&path).unwrap();
        assert_eq!(info.mime, "image/png");
        assert!(info.eligible);
        assert_eq!(info.route, Some(Route::Image));
        assert_eq!(info.size, std::fs::metadata(&path).unwrap().len());
        assert!(info.is_file);
        assert!(!info.is_link);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["route"], "image");
    }

    #[test]
    fn inspect_ineligible_has_no_route() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();
        let info = inspect(&path).unwrap();
        assert_eq!(info.mime, "text/plain");
        assert!(!info.eligible);
        assert_eq!(info.route, None);
    }

    #[test]
    fn inspect_missing_file() {
        assert!(matches!(
            inspect("/nonexistent/x.pdf"),
            Err(PreviewError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn preview_async_png() {
        let dir = TempDir::new().unwrap();
        let out = preview_async(png_fixture(&dir), &PreviewConfig::default())
            .await
            .unwrap();
        assert_eq!(out.content_type(), "image/jpg");
    }
}
