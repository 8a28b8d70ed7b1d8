//! Input loading: turn a user-supplied path or URL into PDF bytes.
//!
//! The text extractor works from an in-memory buffer, so URL inputs are
//! downloaded straight into memory and local files are read whole. Both
//! paths check the `%PDF` magic before handing the bytes on, so a mistyped
//! path to a PNG fails here with a clear message instead of as "no text".

use crate::error::LectureError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the PDF named by `input` (local path or HTTP/HTTPS URL).
pub async fn load_pdf(input: &str, download_timeout_secs: u64) -> Result<Vec<u8>, LectureError> {
    if input.trim().is_empty() {
        return Err(LectureError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download(input, download_timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Verify `bytes` start with the PDF magic; `origin` names the source in errors.
pub fn check_magic(bytes: &[u8], origin: &Path) -> Result<(), LectureError> {
    if !bytes.starts_with(PDF_MAGIC) {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(LectureError::NotAPdf {
            path: origin.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

async fn read_local(path: &Path) -> Result<Vec<u8>, LectureError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => LectureError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => LectureError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;
    check_magic(&bytes, path)?;
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

async fn download(url: &str, timeout_secs: u64) -> Result<Vec<u8>, LectureError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| LectureError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            LectureError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(classify)?.to_vec();
    check_magic(&bytes, &PathBuf::from(url))?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn magic_check_rejects_png() {
        let err = check_magic(b"\x89PNG\r\n", Path::new("slide.png")).unwrap_err();
        match err {
            LectureError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(check_magic(b"%PDF-1.7\n", Path::new("ok.pdf")).is_ok());
    }

    #[test]
    fn magic_check_rejects_short_input() {
        for short in [&b""[..], b"%", b"%PD"] {
            let err = check_magic(short, Path::new("<memory>")).unwrap_err();
            assert!(matches!(err, LectureError::NotAPdf { .. }), "accepted {short:?}");
        }
    }

    #[tokio::test]
    async fn missing_local_file_is_reported() {
        let err = load_pdf("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, LectureError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = load_pdf("  ", 5).await.unwrap_err();
        assert!(matches!(err, LectureError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn local_pdf_is_read_whole() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.4\n%%EOF\n").unwrap();
        let bytes = load_pdf(tmp.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4\n%%EOF\n");
    }
}
