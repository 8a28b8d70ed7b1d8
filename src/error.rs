//! Error types for the edgequake-pdf2video library.
//!
//! Two error types mirror the two ways a run can go wrong:
//!
//! * [`LectureError`] — **Fatal**: the run stops. Every variant belongs to
//!   one pipeline [`Stage`], and its message names that stage so the user
//!   can tell extraction problems from encoder problems at a glance.
//!
//! * [`SpeechError`] — **Non-fatal**: one speech backend failed for one
//!   slide. The narrator logs it, reports it through the progress callback
//!   and falls back to the free backend. It only becomes fatal (wrapped in
//!   [`LectureError::NarrationFailed`]) when the fallback fails as well.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Input,
    Extract,
    Plan,
    Narrate,
    Render,
    Encode,
    Assemble,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Extract => "text extraction",
            Stage::Plan => "slide planning",
            Stage::Narrate => "narration",
            Stage::Render => "slide rendering",
            Stage::Encode => "segment encoding",
            Stage::Assemble => "video assembly",
        };
        f.write_str(name)
    }
}

/// All fatal errors returned by the library.
#[derive(Debug, Error)]
pub enum LectureError {
    // ── Input errors ──────────────────────────────────────────────────────
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
  • Check your internet connection and try again.\n\
  • Or set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    #[error("Text extraction failed: no text found in PDF.\nScanned documents need OCR before conversion.")]
    NoTextExtracted,

    // ── Planning errors ───────────────────────────────────────────────────
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    #[error("Slide planning failed: LLM API error: {message}")]
    LlmApiError { message: String },

    #[error("Slide planning failed: LLM call timed out after {secs}s\nIncrease --api-timeout.")]
    LlmTimeout { secs: u64 },

    #[error("Slide planning failed: model output is not a valid slide plan: {detail}")]
    SlidePlanInvalid { detail: String },

    #[error("Slide planning failed: the model returned no slides")]
    NoSlidesGenerated,

    // ── Narration errors ──────────────────────────────────────────────────
    #[error("Narration failed for slide {slide}: {fallback}{}", primary_note(.primary))]
    NarrationFailed {
        slide: usize,
        primary: Option<SpeechError>,
        fallback: SpeechError,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    #[error("Slide rendering failed for slide {slide}: could not write '{path}': {detail}")]
    RenderFailed {
        slide: usize,
        path: PathBuf,
        detail: String,
    },

    // ── Encoding errors ───────────────────────────────────────────────────
    #[error("Video encoding unavailable: ffmpeg not found.\nInstall it from https://ffmpeg.org/download.html or pass --ffmpeg <PATH>.")]
    EncoderNotFound,

    #[error("Segment encoding failed for slide {slide} (exit code {exit_code:?}):\n{stderr}")]
    SegmentEncodingFailed {
        slide: usize,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Video assembly failed: could not concatenate segments (exit code {exit_code:?}):\n{stderr}")]
    ConcatFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error during {stage}: {detail}")]
    Internal { stage: Stage, detail: String },
}

fn primary_note(primary: &Option<SpeechError>) -> String {
    match primary {
        Some(e) => format!(" (premium backend also failed: {e})"),
        None => String::new(),
    }
}

impl LectureError {
    /// The pipeline stage this error aborted.
    pub fn stage(&self) -> Stage {
        use LectureError::*;
        match self {
            FileNotFound { .. }
            | PermissionDenied { .. }
            | InvalidInput { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | NotAPdf { .. }
            | InvalidConfig(_) => Stage::Input,
            PdfiumBindingFailed(_) | NoTextExtracted => Stage::Extract,
            ProviderNotConfigured { .. }
            | LlmApiError { .. }
            | LlmTimeout { .. }
            | SlidePlanInvalid { .. }
            | NoSlidesGenerated => Stage::Plan,
            NarrationFailed { .. } => Stage::Narrate,
            RenderFailed { .. } => Stage::Render,
            EncoderNotFound | SegmentEncodingFailed { .. } => Stage::Encode,
            ConcatFailed { .. } | OutputWriteFailed { .. } => Stage::Assemble,
            Internal { stage, .. } => *stage,
        }
    }

    pub(crate) fn internal(stage: Stage, detail: impl Into<String>) -> Self {
        LectureError::Internal {
            stage,
            detail: detail.into(),
        }
    }
}

/// A non-fatal failure of one speech backend for one slide.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum SpeechError {
    #[error("{backend}: request failed: {detail}")]
    Request { backend: String, detail: String },

    #[error("{backend}: request timed out after {secs}s")]
    Timeout { backend: String, secs: u64 },

    #[error("{backend}: HTTP {status}: {body}")]
    Http {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("{backend}: returned no audio")]
    EmptyAudio { backend: String },

    #[error("{backend}: nothing to synthesize")]
    EmptyText { backend: String },

    #[error("could not store audio at '{path}': {detail}")]
    Io { path: PathBuf, detail: String },
}

impl SpeechError {
    pub(crate) fn from_reqwest(backend: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            SpeechError::Timeout {
                backend: backend.to_string(),
                secs: timeout_secs,
            }
        } else {
            SpeechError::Request {
                backend: backend.to_string(),
                detail: err.to_string(),
            }
        }
    }
}
