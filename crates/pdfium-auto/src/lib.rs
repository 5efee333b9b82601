//! # pdfium-auto
//!
//! Finds a libpdfium for [`pdfium_render`] to bind, fetching one when asked.
//!
//! ## Resolution order
//!
//! [`bind_pdfium_offline`] never touches the network:
//!
//! 1. An explicit path passed by the caller.
//! 2. `PDFIUM_LIB_PATH`, when it names an existing file.
//! 3. The per-version cache, `<cache>/file-preview/pdfium-{VERSION}/`.
//! 4. The system library search path.
//!
//! [`ensure_pdfium_library`] runs steps 2 and 3, then downloads the platform
//! archive from [bblanchon/pdfium-binaries] into the cache. With the
//! `bundled` feature, [`ensure_pdfium_bundled`] unpacks the library embedded
//! at build time instead.
//!
//! ```rust,no_run
//! use pdfium_auto::{bind_pdfium_from_path, ensure_pdfium_library};
//!
//! let path = ensure_pdfium_library(Some(&|done, total| {
//!     if let Some(total) = total {
//!         eprint!("\r{done}/{total} bytes");
//!     }
//! }))
//! .expect("download failed");
//! let pdfium = bind_pdfium_from_path(&path).expect("bind failed");
//! # drop(pdfium);
//! ```
//!
//! ## Environment
//!
//! - `PDFIUM_LIB_PATH`: an existing libpdfium; skips the cache and download.
//! - `PDFIUM_AUTO_CACHE_DIR`: replaces the platform cache directory.
//!
//! [bblanchon/pdfium-binaries]: https://github.com/bblanchon/pdfium-binaries

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

/// pdfium-binaries release tag (`chromium/{VERSION}`).
pub const PDFIUM_VERSION: &str = "7690";

/// Names an existing libpdfium to use as-is.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Replaces the platform cache directory.
pub const CACHE_DIR_ENV: &str = "PDFIUM_AUTO_CACHE_DIR";

const BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Progress callback: `(bytes_so_far, total_if_known)`.
pub type Progress<'a> = &'a dyn Fn(u64, Option<u64>);

#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    #[error("No prebuilt PDFium for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Archive extraction failed: {0}")]
    Extract(String),

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },

    /// Nothing explicit, nothing cached and no system library.
    #[error("PDFium not found ({reason}); set PDFIUM_LIB_PATH=/path/to/libpdfium or let the CLI download it")]
    NotInstalled { reason: String },
}

/// Where the platform library lives in a release archive, and on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub archive_name: &'static str,
    pub lib_path_in_archive: &'static str,
    pub lib_name: &'static str,
}

const fn mac_lib(archive_name: &'static str) -> PlatformInfo {
    PlatformInfo {
        archive_name,
        lib_path_in_archive: "lib/libpdfium.dylib",
        lib_name: "libpdfium.dylib",
    }
}

const fn linux_lib(archive_name: &'static str) -> PlatformInfo {
    PlatformInfo {
        archive_name,
        lib_path_in_archive: "lib/libpdfium.so",
        lib_name: "libpdfium.so",
    }
}

const fn windows_lib(archive_name: &'static str) -> PlatformInfo {
    PlatformInfo {
        archive_name,
        lib_path_in_archive: "bin/pdfium.dll",
        lib_name: "pdfium.dll",
    }
}

/// Release asset for the running OS and architecture.
pub fn detect_platform() -> Result<PlatformInfo, PdfiumAutoError> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn platform_for(os: &str, arch: &str) -> Result<PlatformInfo, PdfiumAutoError> {
    let info = match (os, arch) {
        ("macos", "aarch64") => mac_lib("pdfium-mac-arm64.tgz"),
        ("macos", "x86_64") => mac_lib("pdfium-mac-x64.tgz"),
        ("linux", "x86_64") => linux_lib("pdfium-linux-x64.tgz"),
        ("linux", "aarch64") => linux_lib("pdfium-linux-arm64.tgz"),
        ("windows", "x86_64") => windows_lib("pdfium-win-x64.tgz"),
        ("windows", "aarch64") => windows_lib("pdfium-win-arm64.tgz"),
        ("windows", "x86") => windows_lib("pdfium-win-x86.tgz"),
        _ => {
            return Err(PdfiumAutoError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };
    Ok(info)
}

/// Per-version cache directory.
///
/// `$PDFIUM_AUTO_CACHE_DIR/pdfium-{VERSION}` when set, otherwise
/// `<platform cache>/file-preview/pdfium-{VERSION}`.
pub fn pdfium_cache_dir() -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join(versioned);
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("file-preview")
        .join(versioned)
}

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

fn env_lib_path() -> Option<PathBuf> {
    std::env::var_os(PDFIUM_LIB_PATH_ENV)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// A libpdfium already on disk: `PDFIUM_LIB_PATH`, then the cache.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    if let Some(path) = env_lib_path().filter(|p| p.is_file()) {
        return Some(path);
    }
    let info = detect_platform().ok()?;
    Some(pdfium_cache_dir().join(info.lib_name)).filter(|p| p.is_file())
}

/// Whether [`ensure_pdfium_library`] would return without downloading.
pub fn is_pdfium_cached() -> bool {
    RESOLVED_PATH.get().is_some() || cached_pdfium_path().is_some()
}

/// Path to a usable libpdfium, downloading it into the cache if needed.
///
/// Resolved once per process; later calls return the same path.
pub fn ensure_pdfium_library(
    on_progress: Option<Progress<'_>>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }
    let path = match cached_pdfium_path() {
        Some(path) => path,
        None => {
            if let Some(missing) = env_lib_path() {
                warn!(
                    "{} '{}' does not exist, downloading PDFium instead",
                    PDFIUM_LIB_PATH_ENV,
                    missing.display()
                );
            }
            download_to_cache(on_progress)?
        }
    };
    Ok(RESOLVED_PATH.get_or_init(|| path).clone())
}

/// Write the embedded library to the cache and return its path.
#[cfg(feature = "bundled")]
pub fn ensure_pdfium_bundled() -> Result<PathBuf, PdfiumAutoError> {
    mod embedded {
        include!(concat!(env!("OUT_DIR"), "/bundled.rs"));
    }

    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }
    let info = detect_platform()?;
    let dir = pdfium_cache_dir();
    let lib_path = dir.join(info.lib_name);

    let stale = fs::metadata(&lib_path)
        .map(|m| m.len() != embedded::PDFIUM_BYTES.len() as u64)
        .unwrap_or(true);
    if stale {
        create_cache_dir(&dir)?;
        write_atomically(&lib_path, embedded::PDFIUM_BYTES)
            .map_err(|e| PdfiumAutoError::Extract(format!("{}: {e}", lib_path.display())))?;
        info!("Unpacked embedded PDFium to {}", lib_path.display());
    }
    Ok(RESOLVED_PATH.get_or_init(|| lib_path).clone())
}

/// Download if needed, then bind.
pub fn bind_pdfium(on_progress: Option<Progress<'_>>) -> Result<Pdfium, PdfiumAutoError> {
    let path = ensure_pdfium_library(on_progress)?;
    bind_pdfium_from_path(&path)
}

/// Bind the library at `path`, bypassing the cache.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Bind without network access: `explicit`, then what [`cached_pdfium_path`]
/// finds, then the system library.
///
/// An explicit path that fails to bind is an error; it never falls through
/// to a different library.
pub fn bind_pdfium_offline(explicit: Option<&Path>) -> Result<Pdfium, PdfiumAutoError> {
    if let Some(path) = explicit {
        return bind_pdfium_from_path(path);
    }
    if let Some(path) = RESOLVED_PATH.get().cloned().or_else(cached_pdfium_path) {
        debug!("Binding PDFium from {}", path.display());
        return bind_pdfium_from_path(&path);
    }
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::NotInstalled {
            reason: e.to_string(),
        })
}

// ── Download ─────────────────────────────────────────────────────────────────

fn create_cache_dir(dir: &Path) -> Result<(), PdfiumAutoError> {
    fs::create_dir_all(dir).map_err(|source| PdfiumAutoError::CacheDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn download_to_cache(on_progress: Option<Progress<'_>>) -> Result<PathBuf, PdfiumAutoError> {
    let info = detect_platform()?;
    let dir = pdfium_cache_dir();
    let lib_path = dir.join(info.lib_name);
    create_cache_dir(&dir)?;

    let url = format!("{BASE_URL}/chromium%2F{PDFIUM_VERSION}/{}", info.archive_name);
    info!("Downloading PDFium {} from {}", PDFIUM_VERSION, url);
    let archive = download_bytes(&url, on_progress)?;
    extract_library(&archive, info.lib_path_in_archive, &lib_path)?;
    info!("PDFium cached at {}", lib_path.display());
    Ok(lib_path)
}

/// Counts bytes on their way into the buffer.
struct ProgressWriter<'a> {
    buf: Vec<u8>,
    total: Option<u64>,
    on_progress: Option<Progress<'a>>,
}

impl Write for ProgressWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if let Some(cb) = self.on_progress {
            cb(self.buf.len() as u64, self.total);
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn download_bytes(
    url: &str,
    on_progress: Option<Progress<'_>>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut sink = ProgressWriter {
        buf: Vec::with_capacity(total.unwrap_or(0) as usize),
        total,
        on_progress,
    };
    io::copy(&mut response, &mut sink)
        .map_err(|e| PdfiumAutoError::Download(format!("reading {url}: {e}")))?;
    Ok(sink.buf)
}

/// Pull one file out of a `.tgz` into `dest`.
fn extract_library(archive: &[u8], wanted: &str, dest: &Path) -> Result<(), PdfiumAutoError> {
    let extract_err = |e: io::Error| PdfiumAutoError::Extract(e.to_string());
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));

    for entry in tar.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        let name = entry.path().map_err(extract_err)?;
        let name: &Path = &name;
        if name.strip_prefix("./").unwrap_or(name) != Path::new(wanted) {
            continue;
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        io::copy(&mut entry, &mut bytes).map_err(extract_err)?;
        return write_atomically(dest, &bytes)
            .map_err(|e| PdfiumAutoError::Extract(format!("{}: {e}", dest.display())));
    }

    Err(PdfiumAutoError::Extract(format!(
        "'{wanted}' not found in archive"
    )))
}

/// Readers never see a half-written library.
fn write_atomically(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut part = dest.as_os_str().to_os_string();
    part.push(".part");
    let part = PathBuf::from(part);
    fs::write(&part, bytes)?;
    fs::rename(&part, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests below mutate process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn tgz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        let mut builder = tar::Builder::new(gz);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn known_platforms_have_consistent_names() {
        let linux = platform_for("linux", "x86_64").unwrap();
        assert_eq!(linux.lib_name, "libpdfium.so");
        assert!(linux.lib_path_in_archive.ends_with(linux.lib_name));

        let mac = platform_for("macos", "aarch64").unwrap();
        assert_eq!(mac.lib_name, "libpdfium.dylib");
        assert_eq!(mac.archive_name, "pdfium-mac-arm64.tgz");

        let win = platform_for("windows", "x86").unwrap();
        assert_eq!(win.lib_path_in_archive, "bin/pdfium.dll");
    }

    #[test]
    fn unknown_platform_is_an_error() {
        let err = platform_for("plan9", "mips").unwrap_err();
        assert!(err.to_string().contains("plan9/mips"), "{err}");
    }

    #[test]
    fn cache_dir_honours_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        std::env::set_var(CACHE_DIR_ENV, dir.path());
        let cache = pdfium_cache_dir();
        std::env::remove_var(CACHE_DIR_ENV);

        assert_eq!(cache, dir.path().join(format!("pdfium-{PDFIUM_VERSION}")));
        let default = pdfium_cache_dir();
        assert!(default.ends_with(format!("file-preview/pdfium-{PDFIUM_VERSION}")));
    }

    #[test]
    fn env_path_is_used_only_when_it_exists() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let lib = dir.path().join("libpdfium.so");
        fs::write(&lib, b"not really a library").unwrap();

        std::env::set_var(PDFIUM_LIB_PATH_ENV, &lib);
        let found = cached_pdfium_path();
        std::env::set_var(PDFIUM_LIB_PATH_ENV, dir.path().join("missing.so"));
        let missing = env_lib_path();
        std::env::remove_var(PDFIUM_LIB_PATH_ENV);

        assert_eq!(found, Some(lib));
        assert!(missing.is_some_and(|p| !p.is_file()));
    }

    #[test]
    fn explicit_path_never_falls_through() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope").join("libpdfium.so");
        let err = bind_pdfium_offline(Some(&missing)).unwrap_err();
        match err {
            PdfiumAutoError::Bind { path, .. } => assert_eq!(path, missing),
            other => panic!("expected Bind, got {other:?}"),
        }
    }

    #[test]
    fn extracts_the_named_entry() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("libpdfium.so");
        let archive = tgz(&[
            ("include/fpdfview.h", b"header"),
            ("./lib/libpdfium.so", b"\x7fELF library bytes"),
        ]);

        extract_library(&archive, "lib/libpdfium.so", &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"\x7fELF library bytes");
        assert!(!dir.path().join("libpdfium.so.part").exists());
    }

    #[test]
    fn missing_entry_is_an_extract_error() {
        let dir = TempDir::new().unwrap();
        let archive = tgz(&[("LICENSE", b"text")]);
        let err = extract_library(&archive, "lib/libpdfium.so", &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::Extract(_)), "{err}");
    }

    #[test]
    fn progress_writer_reports_running_total() {
        let seen = Mutex::new(Vec::new());
        let cb = |done: u64, total: Option<u64>| seen.lock().unwrap().push((done, total));
        let mut sink = ProgressWriter {
            buf: Vec::new(),
            total: Some(6),
            on_progress: Some(&cb),
        };
        sink.write_all(b"abc").unwrap();
        sink.write_all(b"def").unwrap();

        assert_eq!(sink.buf, b"abcdef");
        assert_eq!(*seen.lock().unwrap(), vec![(3, Some(6)), (6, Some(6))]);
    }
}
