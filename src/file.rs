//! Path-addressed input files.
//!
//! [`InputFile`] pairs a path with a [`FileAccessor`], the seam through which
//! every byte, stat and MIME sniff flows. The default accessor,
//! [`LocalFs`], talks to the local file system; hosts that keep documents
//! elsewhere plug in their own.
//!
//! The MIME type is sniffed from content on every call and never cached, so
//! a file rewritten in place is re-classified on the next preview.

use crate::error::PreviewError;
use crate::mime::{DOCX, IMAGE_PREFIX, PDF, PPTX, XLSX};
use byte_unit::{Byte, UnitType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Fallback when neither content nor extension identify the file.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Bytes read from the head of a file for magic-number sniffing.
const SNIFF_LEN: u64 = 8192;

const ZIP: &str = "application/zip";

/// Generic containers whose magic bytes say nothing about the document type.
const CONTAINERS: [&str; 2] = [ZIP, "application/x-ole-storage"];

/// Size, timestamps and type of a file, as reported by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub size: u64,
    pub accessed: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    /// Last inode (metadata) change. Falls back to `modified` off Unix.
    pub changed: DateTime<Utc>,
    /// A regular file, or a link resolving to one.
    pub is_file: bool,
    /// The path itself is a symbolic link.
    pub is_symlink: bool,
}

/// File system operations the preview engine needs.
pub trait FileAccessor: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace the file contents, returning the number of bytes written.
    fn write_bytes(&self, path: &Path, data: &[u8]) -> io::Result<usize>;

    fn stat(&self, path: &Path) -> io::Result<FileMetadata>;

    /// Detect the MIME type from content, falling back to the extension.
    fn sniff_mime(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read_bytes(path)?;
        Ok(sniff_bytes(&bytes, path))
    }
}

/// Local file system accessor.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileAccessor for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_bytes(&self, path: &Path, data: &[u8]) -> io::Result<usize> {
        fs::write(path, data)?;
        Ok(data.len())
    }

    fn stat(&self, path: &Path) -> io::Result<FileMetadata> {
        let meta = fs::symlink_metadata(path)?;
        let is_symlink = meta.file_type().is_symlink();
        let is_file = if is_symlink {
            fs::metadata(path).is_ok_and(|target| target.is_file())
        } else {
            meta.is_file()
        };
        Ok(FileMetadata {
            is_file,
            is_symlink,
            ..metadata_from_fs(&meta)
        })
    }

    fn sniff_mime(&self, path: &Path) -> io::Result<String> {
        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        fs::File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
        Ok(sniff_bytes(&head, path))
    }
}

#[cfg(unix)]
fn metadata_from_fs(meta: &fs::Metadata) -> FileMetadata {
    use std::os::unix::fs::MetadataExt;

    FileMetadata {
        size: meta.size(),
        accessed: timestamp(meta.atime()),
        modified: timestamp(meta.mtime()),
        changed: timestamp(meta.ctime()),
        is_file: meta.is_file(),
        is_symlink: meta.file_type().is_symlink(),
    }
}

#[cfg(not(unix))]
fn metadata_from_fs(meta: &fs::Metadata) -> FileMetadata {
    let secs = |t: io::Result<std::time::SystemTime>| {
        t.ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    };
    let modified = timestamp(secs(meta.modified()));

    FileMetadata {
        size: meta.len(),
        accessed: timestamp(secs(meta.accessed())),
        modified,
        changed: modified,
        is_file: meta.is_file(),
        is_symlink: meta.file_type().is_symlink(),
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Identify content by magic bytes, then by extension.
///
/// Zip and OLE containers are refined: OpenXML packages are recognised by
/// their part names (`word/`, `xl/`, `ppt/`), anything else by extension,
/// and only then reported as the bare container type.
pub fn sniff_bytes(bytes: &[u8], path: &Path) -> String {
    let mime = match infer::get(bytes).map(|kind| kind.mime_type()) {
        Some(ZIP) => ooxml_type(bytes)
            .or_else(|| by_extension(path))
            .unwrap_or(ZIP),
        Some(container) if CONTAINERS.contains(&container) => {
            by_extension(path).unwrap_or(container)
        }
        Some(mime) => mime,
        None => {
            let guessed = by_extension(path).unwrap_or(OCTET_STREAM);
            debug!("No magic match for {}, guessed {} from extension", path.display(), guessed);
            guessed
        }
    };
    mime.to_string()
}

fn by_extension(path: &Path) -> Option<&'static str> {
    mime_guess::from_path(path)
        .first_raw()
        .filter(|mime| *mime != OCTET_STREAM)
}

/// OpenXML type of a zip package, from the entries in `head`.
///
/// Walks local file headers from the start of the archive, so it works on a
/// truncated prefix and stops at the first entry it cannot step over.
fn ooxml_type(head: &[u8]) -> Option<&'static str> {
    let mut reader = Cursor::new(head);
    while let Ok(Some(entry)) = zip::read::read_zipfile_from_stream(&mut reader) {
        let name = entry.name();
        if name.starts_with("word/") {
            return Some(DOCX);
        }
        if name.starts_with("xl/") {
            return Some(XLSX);
        }
        if name.starts_with("ppt/") {
            return Some(PPTX);
        }
    }
    None
}

/// One source file, addressed by path.
#[derive(Clone)]
pub struct InputFile {
    path: PathBuf,
    accessor: Arc<dyn FileAccessor>,
    metadata: Option<FileMetadata>,
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("path", &self.path)
            .field("accessor", &"<dyn FileAccessor>")
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl InputFile {
    /// A file on the local file system. Metadata is read eagerly when the
    /// file exists; a missing file is not an error until it is used.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_accessor(path, Arc::new(LocalFs))
    }

    pub fn with_accessor(path: impl Into<PathBuf>, accessor: Arc<dyn FileAccessor>) -> Self {
        let path = path.into();
        let metadata = if accessor.exists(&path) {
            accessor.stat(&path).ok()
        } else {
            None
        };
        Self {
            path,
            accessor,
            metadata,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn accessor(&self) -> &Arc<dyn FileAccessor> {
        &self.accessor
    }

    pub fn exists(&self) -> bool {
        self.accessor.exists(&self.path)
    }

    /// A regular file, following links. Asked of the accessor on every call.
    pub fn is_file(&self) -> bool {
        self.accessor
            .stat(&self.path)
            .is_ok_and(|meta| meta.is_file)
    }

    pub fn is_link(&self) -> bool {
        self.accessor
            .stat(&self.path)
            .is_ok_and(|meta| meta.is_symlink)
    }

    pub fn read(&self) -> Result<Vec<u8>, PreviewError> {
        self.accessor
            .read_bytes(&self.path)
            .map_err(|e| PreviewError::io(&self.path, e))
    }

    /// Replace the file contents and refresh the cached metadata.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, PreviewError> {
        let written = self
            .accessor
            .write_bytes(&self.path, data)
            .map_err(|e| PreviewError::io(&self.path, e))?;
        self.metadata = Some(
            self.accessor
                .stat(&self.path)
                .map_err(|e| PreviewError::io(&self.path, e))?,
        );
        Ok(written)
    }

    /// Sniffed MIME type. Not cached.
    pub fn mime(&self) -> Result<String, PreviewError> {
        self.accessor
            .sniff_mime(&self.path)
            .map_err(|e| PreviewError::io(&self.path, e))
    }

    /// Metadata captured at construction or after the last `write`.
    pub fn metadata(&self) -> Result<FileMetadata, PreviewError> {
        self.metadata.ok_or_else(|| PreviewError::FileNotFound {
            path: self.path.clone(),
        })
    }

    pub fn size(&self) -> Result<u64, PreviewError> {
        Ok(self.metadata()?.size)
    }

    /// Size with a binary unit, e.g. `1.46 KiB`.
    pub fn human_size(&self) -> Result<String, PreviewError> {
        Ok(human_size(self.size()?))
    }

    pub fn accessed(&self) -> Result<DateTime<Utc>, PreviewError> {
        Ok(self.metadata()?.accessed)
    }

    pub fn modified(&self) -> Result<DateTime<Utc>, PreviewError> {
        Ok(self.metadata()?.modified)
    }

    pub fn changed(&self) -> Result<DateTime<Utc>, PreviewError> {
        Ok(self.metadata()?.changed)
    }

    pub fn is_pdf(&self) -> Result<bool, PreviewError> {
        self.is(&[PDF])
    }

    pub fn is_image(&self) -> Result<bool, PreviewError> {
        Ok(self.mime()?.starts_with(IMAGE_PREFIX))
    }

    /// Whether the sniffed MIME type equals any of `mimes`.
    pub fn is(&self, mimes: &[&str]) -> Result<bool, PreviewError> {
        let mime = self.mime()?;
        Ok(mimes.iter().any(|m| *m == mime))
    }
}

pub(crate) fn human_size(bytes: u64) -> String {
    format!("{:.2}", Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary))
}
