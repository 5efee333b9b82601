//! Word-processing documents → PDF via headless LibreOffice.
//!
//! `soffice --convert-to pdf` always names its output after the source file
//! and writes it into `--outdir`, so conversion happens in a scratch
//! directory and the result is copied to the requested destination. Each run
//! also gets its own LibreOffice user profile inside that directory; two
//! instances sharing the default profile block each other.

use crate::config::PreviewConfig;
use crate::error::BackendError;
use crate::pipeline::backend::DocumentConverter;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// [`DocumentConverter`] backed by the LibreOffice command line.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    command: PathBuf,
}

impl LibreOfficeConverter {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(&config.office_command)
    }

    pub fn command(&self) -> &Path {
        &self.command
    }
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self::from_config(&PreviewConfig::default())
    }
}

impl DocumentConverter for LibreOfficeConverter {
    fn convert(&self, source: &Path, dest: &Path) -> Result<(), BackendError> {
        let document_err = |detail: String| BackendError::Document {
            path: source.to_path_buf(),
            detail,
        };

        let stem = source
            .file_stem()
            .ok_or_else(|| document_err("source path has no file name".into()))?;

        let scratch = TempDir::new().map_err(|e| document_err(format!("scratch dir: {e}")))?;
        let profile = scratch.path().join("profile");
        let out_dir = scratch.path().join("out");

        info!("Converting {} to PDF with {}", source.display(), self.command.display());
        let output = Command::new(&self.command)
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .args(["--headless", "--norestore", "--convert-to", "pdf", "--outdir"])
            .arg(&out_dir)
            .arg(source)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BackendError::Unavailable {
                        backend: "LibreOffice".into(),
                        hint: format!(
                            "'{}' was not found; install LibreOffice or point office_command at soffice",
                            self.command.display()
                        ),
                    }
                } else {
                    document_err(format!("could not run '{}': {e}", self.command.display()))
                }
            })?;

        if !output.status.success() {
            return Err(document_err(format!(
                "{} exited with {}: {}",
                self.command.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut produced_name = stem.to_os_string();
        produced_name.push(".pdf");
        let produced = out_dir.join(produced_name);
        if !produced.is_file() {
            return Err(document_err(format!(
                "no PDF was produced: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        fs::copy(&produced, dest)
            .map_err(|e| document_err(format!("copy to '{}': {e}", dest.display())))?;
        debug!("Wrote intermediate PDF {}", dest.display());
        Ok(())
    }
}
