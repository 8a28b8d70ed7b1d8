//! # pdfium-auto
//!
//! Find a usable PDFium shared library for `pdfium-render`, downloading and
//! caching the platform build from
//! [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//! when none is available.
//!
//! Lookup order used by [`ensure_library`]:
//!
//! 1. `PDFIUM_LIB_PATH`, when it names an existing file.
//! 2. The per-version cache directory ([`cache_dir`]).
//! 3. Download the release archive and extract the library into the cache.
//!
//! ```rust,no_run
//! let pdfium = pdfium_auto::bind_silent().expect("PDFium unavailable");
//! ```
//!
//! Environment overrides:
//!
//! - `PDFIUM_LIB_PATH` — path to an existing pdfium library; skips download.
//! - `PDFIUM_AUTO_CACHE_DIR` — base directory for the cache.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// pdfium-binaries release tag (`chromium/<PDFIUM_VERSION>`).
pub const PDFIUM_VERSION: &str = "7690";

const RELEASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Application directory name under the user cache dir.
const CACHE_APP_DIR: &str = "pdf2video";

/// Errors returned while locating or loading PDFium.
#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    #[error("No prebuilt PDFium for {os}/{arch}; set PDFIUM_LIB_PATH to a local build")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cannot create cache directory '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDFium download failed: {0}")]
    Download(String),

    #[error("PDFium archive extraction failed: {0}")]
    Extract(String),

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Where to find the library for one OS/arch pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Platform {
    archive: &'static str,
    member: &'static str,
    file_name: &'static str,
}

const UNIX_SO: (&str, &str) = ("lib/libpdfium.so", "libpdfium.so");
const MAC_DYLIB: (&str, &str) = ("lib/libpdfium.dylib", "libpdfium.dylib");
const WIN_DLL: (&str, &str) = ("bin/pdfium.dll", "pdfium.dll");

const PLATFORMS: &[(&str, &str, &str, (&str, &str))] = &[
    ("macos", "aarch64", "pdfium-mac-arm64.tgz", MAC_DYLIB),
    ("macos", "x86_64", "pdfium-mac-x64.tgz", MAC_DYLIB),
    ("linux", "x86_64", "pdfium-linux-x64.tgz", UNIX_SO),
    ("linux", "aarch64", "pdfium-linux-arm64.tgz", UNIX_SO),
    ("windows", "x86_64", "pdfium-win-x64.tgz", WIN_DLL),
    ("windows", "aarch64", "pdfium-win-arm64.tgz", WIN_DLL),
    ("windows", "x86", "pdfium-win-x86.tgz", WIN_DLL),
];

impl Platform {
    fn lookup(os: &str, arch: &str) -> Result<Self, PdfiumAutoError> {
        PLATFORMS
            .iter()
            .find(|(o, a, _, _)| *o == os && *a == arch)
            .map(|&(_, _, archive, (member, file_name))| Platform {
                archive,
                member,
                file_name,
            })
            .ok_or_else(|| PdfiumAutoError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
    }

    fn current() -> Result<Self, PdfiumAutoError> {
        Self::lookup(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn download_url(&self) -> String {
        format!("{RELEASE_URL}/chromium%2F{PDFIUM_VERSION}/{}", self.archive)
    }
}

/// Per-version cache directory, e.g. `~/.cache/pdf2video/pdfium-7690/`.
pub fn cache_dir() -> PathBuf {
    let base = match std::env::var_os("PDFIUM_AUTO_CACHE_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join(CACHE_APP_DIR),
    };
    base.join(format!("pdfium-{PDFIUM_VERSION}"))
}

fn env_override() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH")
        .map(PathBuf::from)
        .filter(|p| p.exists())
}

/// Path of an already available library, without touching the network.
pub fn cached_library_path() -> Option<PathBuf> {
    env_override().or_else(|| {
        let platform = Platform::current().ok()?;
        let path = cache_dir().join(platform.file_name);
        path.exists().then_some(path)
    })
}

/// `true` when [`ensure_library`] would not need to download anything.
pub fn is_cached() -> bool {
    cached_library_path().is_some()
}

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Return the library path, downloading it on first use.
///
/// `on_progress` receives `(bytes_downloaded, content_length)`.
/// The result is memoised for the rest of the process.
pub fn ensure_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = RESOLVED.get() {
        return Ok(path.clone());
    }
    let path = match cached_library_path() {
        Some(p) => p,
        None => download_into_cache(on_progress)?,
    };
    Ok(RESOLVED.get_or_init(|| path).clone())
}

/// Bind to PDFium, downloading it first if necessary.
pub fn bind(on_progress: Option<&dyn Fn(u64, Option<u64>)>) -> Result<Pdfium, PdfiumAutoError> {
    let path = ensure_library(on_progress)?;
    bind_from(&path)
}

/// [`bind`] without progress reporting.
pub fn bind_silent() -> Result<Pdfium, PdfiumAutoError> {
    bind(None)
}

/// Bind to the library at `path`; never downloads.
pub fn bind_from(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn download_into_cache(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    let platform = Platform::current()?;
    let dir = cache_dir();
    std::fs::create_dir_all(&dir).map_err(|source| PdfiumAutoError::CacheDir {
        path: dir.clone(),
        source,
    })?;

    let archive = fetch(&platform.download_url(), on_progress)?;
    let dest = dir.join(platform.file_name);
    unpack_member(&archive, platform.member, &dest)?;
    Ok(dest)
}

fn fetch(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
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
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = [0u8; 64 * 1024];
    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                body.extend_from_slice(&chunk[..n]);
                if let Some(cb) = on_progress {
                    cb(body.len() as u64, total);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(PdfiumAutoError::Download(format!("read: {e}"))),
        }
    }
    Ok(body)
}

/// Extract the single archive entry `member` of a `.tgz` to `dest`.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), PdfiumAutoError> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;
        let is_member = entry
            .path()
            .map(|p| p.to_string_lossy() == member)
            .unwrap_or(false);
        if is_member {
            entry
                .unpack(dest)
                .map_err(|e| PdfiumAutoError::Extract(format!("unpack {member}: {e}")))?;
            return Ok(());
        }
    }

    Err(PdfiumAutoError::Extract(format!(
        "'{member}' not present in archive"
    )))
}
