//! Route selection and execution.
//!
//! [`ConversionPipeline::generate`] sniffs the file's MIME type, gates it on
//! eligibility, then takes the first applicable route:
//!
//! ```text
//! custom handler (exact MIME) ─▶ returned verbatim
//! application/pdf             ─▶ page 0 ─▶ JPEG
//! image/*                     ─▶ frame 0 ─▶ JPEG
//! word-processing family      ─▶ temp PDF ─▶ generate() again
//! anything else eligible      ─▶ UnimplementedRoute
//! ```
//!
//! The office route recurses exactly once: the converter's output must
//! classify as something other than an office document, otherwise the
//! pipeline refuses to go round again.

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::file::InputFile;
use crate::mime::{OfficeFamily, IMAGE_PREFIX, PDF};
use crate::output::PreviewOutput;
use crate::pipeline::backend::{DefaultRaster, DocumentConverter, RasterEngine};
use crate::pipeline::office::LibreOfficeConverter;
use crate::registry::{HandlerRegistry, PreviewHandler};
use image::ImageFormat;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Prefix of the temporary PDF written for office documents.
const INTERMEDIATE_PREFIX: &str = "FilePreview";

/// The conversion strategy chosen for a MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// A registered [`PreviewHandler`].
    Custom,
    /// First page of a PDF.
    Pdf,
    /// Whole raster image, first frame.
    Image,
    /// Word-processing document, converted to PDF first.
    OfficeWord,
}

impl Route {
    /// Built-in route for a MIME type, ignoring custom handlers.
    pub fn builtin(mime: &str) -> Option<Route> {
        Dispatch::builtin(mime).map(|d| d.route())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Custom => "custom handler",
            Route::Pdf => "pdf",
            Route::Image => "image",
            Route::OfficeWord => "office word-processing",
        };
        f.write_str(name)
    }
}

/// A resolved route, carrying what it needs to run.
enum Dispatch {
    Custom(Arc<dyn PreviewHandler>),
    Pdf,
    Image,
    OfficeWord,
}

impl Dispatch {
    fn builtin(mime: &str) -> Option<Dispatch> {
        if mime == PDF {
            Some(Dispatch::Pdf)
        } else if mime.starts_with(IMAGE_PREFIX) {
            Some(Dispatch::Image)
        } else if OfficeFamily::of(mime) == Some(OfficeFamily::WordProcessing) {
            Some(Dispatch::OfficeWord)
        } else {
            None
        }
    }

    fn route(&self) -> Route {
        match self {
            Dispatch::Custom(_) => Route::Custom,
            Dispatch::Pdf => Route::Pdf,
            Dispatch::Image => Route::Image,
            Dispatch::OfficeWord => Route::OfficeWord,
        }
    }
}

/// Turns an [`InputFile`] into a [`PreviewOutput`].
#[derive(Clone)]
pub struct ConversionPipeline {
    registry: Arc<HandlerRegistry>,
    raster: Arc<dyn RasterEngine>,
    converter: Arc<dyn DocumentConverter>,
    keep_intermediate_pdf: bool,
}

impl fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("registry", &self.registry)
            .field("raster", &"<dyn RasterEngine>")
            .field("converter", &"<dyn DocumentConverter>")
            .field("keep_intermediate_pdf", &self.keep_intermediate_pdf)
            .finish()
    }
}

impl Default for ConversionPipeline {
    fn default() -> Self {
        Self::new(&PreviewConfig::default())
    }
}

impl ConversionPipeline {
    /// Default backends and a fresh registry seeded from `config.extra_eligible`.
    pub fn new(config: &PreviewConfig) -> Self {
        Self::with_registry(Arc::new(HandlerRegistry::from_config(config)), config)
    }

    /// Default backends around a caller-built registry, used as given.
    pub fn with_registry(registry: Arc<HandlerRegistry>, config: &PreviewConfig) -> Self {
        Self {
            registry,
            raster: Arc::new(DefaultRaster::from_config(config)),
            converter: Arc::new(LibreOfficeConverter::from_config(config)),
            keep_intermediate_pdf: config.keep_intermediate_pdf,
        }
    }

    pub fn with_raster(mut self, raster: Arc<dyn RasterEngine>) -> Self {
        self.raster = raster;
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// The route `generate` would take for `mime`.
    pub fn route_for(&self, mime: &str) -> Result<Route, PreviewError> {
        Ok(self.dispatch(mime)?.route())
    }

    /// Produce a preview of `file`.
    pub fn generate(&self, file: &InputFile) -> Result<PreviewOutput, PreviewError> {
        self.generate_hop(file, 0)
    }

    fn dispatch(&self, mime: &str) -> Result<Dispatch, PreviewError> {
        if !self.registry.is_eligible(mime) {
            return Err(PreviewError::UnsupportedMime {
                mime: mime.to_string(),
            });
        }
        if let Some(handler) = self.registry.resolve(mime) {
            return Ok(Dispatch::Custom(handler));
        }
        Dispatch::builtin(mime).ok_or_else(|| PreviewError::UnimplementedRoute {
            mime: mime.to_string(),
        })
    }

    fn generate_hop(&self, file: &InputFile, hop: u8) -> Result<PreviewOutput, PreviewError> {
        let start = Instant::now();
        let mime = file.mime()?;
        let dispatch = self.dispatch(&mime)?;

        let route = dispatch.route();
        info!("Previewing {} ({}) via {} route", file.path().display(), mime, route);

        let output = match dispatch {
            Dispatch::Custom(handler) => handler.convert(file)?,
            Dispatch::Pdf => self.rasterise(file, Some(0))?,
            Dispatch::Image => self.rasterise(file, None)?,
            Dispatch::OfficeWord if hop > 0 => {
                return Err(PreviewError::Internal(format!(
                    "document conversion of '{}' produced another office document ({mime})",
                    file.path().display()
                )));
            }
            Dispatch::OfficeWord => self.via_pdf(file, hop)?,
        };

        debug!(
            "Preview of {} ready: {} bytes {} in {}ms",
            file.path().display(),
            output.len(),
            output.content_type(),
            start.elapsed().as_millis()
        );
        Ok(output)
    }

    fn rasterise(&self, file: &InputFile, page: Option<usize>) -> Result<PreviewOutput, PreviewError> {
        let image = self.raster.load(file.path(), page)?;
        let payload = self.raster.reencode(&image, ImageFormat::Jpeg)?;
        Ok(PreviewOutput::jpeg(payload))
    }

    fn via_pdf(&self, file: &InputFile, hop: u8) -> Result<PreviewOutput, PreviewError> {
        let intermediate = tempfile::Builder::new()
            .prefix(INTERMEDIATE_PREFIX)
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| PreviewError::Internal(format!("tempfile: {e}")))?;

        self.converter.convert(file.path(), intermediate.path())?;

        let result = self.generate_hop(&InputFile::new(intermediate.path()), hop + 1);

        if self.keep_intermediate_pdf {
            match intermediate.keep() {
                Ok((_, path)) => info!("Kept intermediate PDF {}", path.display()),
                Err(e) => warn!("Could not keep intermediate PDF: {}", e),
            }
        }
        // Otherwise dropping `intermediate` deletes the PDF.
        result
    }
}
