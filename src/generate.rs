//! Top-level entry points.
//!
//! Each call runs in a fresh [`LectureSession`]; use the session directly when
//! the partial state of a failed run matters (e.g. a UI showing the slides
//! that were planned before narration failed).

use crate::config::LectureConfig;
use crate::error::{LectureError, Stage};
use crate::output::{LectureOutput, Slide};
use crate::pipeline::encode::Encoder;
use crate::pipeline::font::SlideFont;
use crate::session::{LectureSession, PdfSource};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Turn a PDF (local path or HTTP/HTTPS URL) into a narrated lecture.
///
/// # Returns
/// `Ok(LectureOutput)` with `video_path` set when ffmpeg produced a video, or
/// `None` with the clips exported to `config.output_dir` when it did not.
///
/// # Errors
/// Any fatal [`LectureError`]; [`LectureError::stage`] names the stage.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2video::{generate_lecture, LectureConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
/// let config = LectureConfig::builder().output_dir("out").build()?;
/// let output = generate_lecture("notes.pdf", &config).await?;
/// println!("{} slides → {:?}", output.slides.len(), output.video_path);
/// # Ok(())
/// # }
/// ```
pub async fn generate_lecture(
    input: impl AsRef<str>,
    config: &LectureConfig,
) -> Result<LectureOutput, LectureError> {
    LectureSession::new().run(input.as_ref(), config).await
}

/// [`generate_lecture`] for PDF bytes already in memory.
pub async fn generate_lecture_from_bytes(
    bytes: &[u8],
    config: &LectureConfig,
) -> Result<LectureOutput, LectureError> {
    LectureSession::new()
        .execute(PdfSource::Bytes(bytes.to_vec()), config)
        .await
}

/// Synchronous wrapper around [`generate_lecture`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_lecture_sync(
    input: impl AsRef<str>,
    config: &LectureConfig,
) -> Result<LectureOutput, LectureError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| {
            LectureError::internal(Stage::Input, format!("Failed to create tokio runtime: {}", e))
        })?
        .block_on(generate_lecture(input, config))
}

/// Extract and plan without narrating or encoding anything.
pub async fn plan_lecture(
    input: impl AsRef<str>,
    config: &LectureConfig,
) -> Result<Vec<Slide>, LectureError> {
    LectureSession::new().plan_only(input.as_ref(), config).await
}

/// What the host offers the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    /// libpdfium already on disk (no download needed).
    pub pdfium: Option<PathBuf>,
    /// Where libpdfium will be downloaded to otherwise.
    pub pdfium_cache_dir: PathBuf,
    /// LLM API-key variables that are set.
    pub llm_keys: Vec<String>,
    pub elevenlabs_key: bool,
    pub font: String,
}

impl EnvironmentReport {
    /// A full lecture video can be produced.
    pub fn video_ready(&self) -> bool {
        self.ffmpeg.is_some() && !self.llm_keys.is_empty()
    }
}

/// API-key variables understood by the provider factory.
pub const LLM_KEY_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "MISTRAL_API_KEY",
    "XAI_API_KEY",
    "OPENROUTER_API_KEY",
    "AZURE_OPENAI_API_KEY",
];

/// Inspect tools, libraries and credentials without running anything.
pub fn check_environment(config: &LectureConfig) -> EnvironmentReport {
    let encoder = Encoder::locate(config).ok().flatten();
    let font = SlideFont::load(config.font_path.as_deref());
    let report = EnvironmentReport {
        ffmpeg: encoder.as_ref().map(|e| e.ffmpeg().to_path_buf()),
        ffprobe: encoder.as_ref().and_then(|e| e.ffprobe().map(PathBuf::from)),
        pdfium: pdfium_auto::cached_library_path(),
        pdfium_cache_dir: pdfium_auto::cache_dir(),
        llm_keys: LLM_KEY_VARS
            .iter()
            .filter(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()))
            .map(|var| var.to_string())
            .collect(),
        elevenlabs_key: config.elevenlabs_api_key.is_some(),
        font: font.describe(),
    };
    debug!("Environment: {:?}", report);
    report
}
