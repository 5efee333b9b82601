//! Configuration types for preview generation.
//!
//! All backend behaviour is controlled through [`PreviewConfig`], built via
//! its [`PreviewConfigBuilder`]. Setters clamp out-of-range values; `build()`
//! rejects combinations that can never work.

use crate::error::PreviewError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming an explicit libpdfium to bind.
pub use pdfium_auto::PDFIUM_LIB_PATH_ENV;

/// Configuration for preview generation.
///
/// # Example
/// ```rust
/// use file_preview::PreviewConfig;
///
/// let config = PreviewConfig::builder()
///     .jpeg_quality(70)
///     .keep_intermediate_pdf(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 70);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// JPEG encoder quality, 1–100. Default: 85.
    pub jpeg_quality: u8,

    /// Maximum rendered PDF page dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap, not a thumbnail size: an A0 page rendered at native
    /// resolution would otherwise allocate hundreds of megabytes.
    pub max_rendered_pixels: u32,

    /// Explicit libpdfium to bind. When `None`, `PDFIUM_LIB_PATH` is
    /// consulted, then the pdfium-auto cache, then the system library
    /// search path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// LibreOffice executable used for word-processing documents. Default: `soffice`.
    pub office_command: PathBuf,

    /// Keep the intermediate PDF produced for office documents. Default: false.
    ///
    /// When false the temporary PDF is deleted as soon as the recursive
    /// PDF preview returns, whether it succeeded or not.
    pub keep_intermediate_pdf: bool,

    /// Deadline for [`crate::preview_async`], in seconds. Default: 120.
    ///
    /// The blocking pipeline has no internal abort; past the deadline the
    /// caller gets [`PreviewError::Timeout`] while the worker thread runs on.
    pub timeout_secs: u64,

    /// Extra patterns declared previewable without a handler.
    pub extra_eligible: Vec<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            max_rendered_pixels: 2000,
            pdfium_lib_path: None,
            office_command: PathBuf::from("soffice"),
            keep_intermediate_pdf: false,
            timeout_secs: 120,
            extra_eligible: Vec::new(),
        }
    }
}

impl PreviewConfig {
    /// Create a new builder for `PreviewConfig`.
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder {
            config: Self::default(),
        }
    }

    /// The libpdfium that would be bound: the explicit setting, else an
    /// existing `PDFIUM_LIB_PATH`, else the download cache. `None` means the
    /// system library search path.
    pub fn resolved_pdfium_path(&self) -> Option<PathBuf> {
        self.pdfium_lib_path
            .clone()
            .or_else(pdfium_auto::cached_pdfium_path)
    }
}

/// Builder for [`PreviewConfig`].
#[derive(Debug)]
pub struct PreviewConfigBuilder {
    config: PreviewConfig,
}

impl PreviewConfigBuilder {
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn office_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.config.office_command = command.into();
        self
    }

    pub fn keep_intermediate_pdf(mut self, keep: bool) -> Self {
        self.config.keep_intermediate_pdf = keep;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn allow(mut self, pattern: impl Into<String>) -> Self {
        self.config.extra_eligible.push(pattern.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PreviewConfig, PreviewError> {
        let c = &self.config;
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(PreviewError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.timeout_secs == 0 {
            return Err(PreviewError::InvalidConfig("Timeout must be ≥ 1s".into()));
        }
        if c.office_command.as_os_str().is_empty() {
            return Err(PreviewError::InvalidConfig(
                "Office command must not be empty".into(),
            ));
        }
        if let Some(bad) = c.extra_eligible.iter().find(|p| p.trim().is_empty()) {
            return Err(PreviewError::InvalidConfig(format!(
                "Eligibility pattern must not be blank, got {bad:?}"
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PreviewConfig::default();
        assert_eq!(c.jpeg_quality, 85);
        assert_eq!(c.max_rendered_pixels, 2000);
        assert_eq!(c.office_command, PathBuf::from("soffice"));
        assert!(!c.keep_intermediate_pdf);
    }

    #[test]
    fn setters_clamp() {
        let c = PreviewConfig::builder()
            .jpeg_quality(0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn build_rejects_zero_timeout() {
        let err = PreviewConfig::builder().timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, PreviewError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_blank_pattern() {
        let err = PreviewConfig::builder().allow("  ").build().unwrap_err();
        assert!(err.to_string().contains("blank"), "{err}");
    }

    #[test]
    fn explicit_pdfium_path_wins() {
        let c = PreviewConfig::builder()
            .pdfium_lib_path("/opt/pdfium/libpdfium.so")
            .build()
            .unwrap();
        assert_eq!(
            c.resolved_pdfium_path(),
            Some(PathBuf::from("/opt/pdfium/libpdfium.so"))
        );
    }

    #[test]
    fn env_pdfium_path_used_when_it_exists() {
        let dir = tempfile::TempDir::new().unwrap();
        let lib = dir.path().join("libpdfium.so");
        std::fs::write(&lib, b"stand-in").unwrap();

        std::env::set_var(PDFIUM_LIB_PATH_ENV, &lib);
        let resolved = PreviewConfig::default().resolved_pdfium_path();
        let explicit = PreviewConfig::builder()
            .pdfium_lib_path("/opt/other/libpdfium.so")
            .build()
            .unwrap()
            .resolved_pdfium_path();
        std::env::remove_var(PDFIUM_LIB_PATH_ENV);

        assert_eq!(resolved, Some(lib));
        assert_eq!(explicit, Some(PathBuf::from("/opt/other/libpdfium.so")));
    }
}
