//! # edgequake-pdf2video
//!
//! Turn a PDF into a narrated slide-deck video.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     local file or URL → bytes (magic-checked)
//!  ├─ 2. Extract   page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Plan      one LLM call → slides with title, bullets, teaching script
//!  ├─ 4. Narrate   ElevenLabs, falling back to the free Google voice
//!  ├─ 5. Render    1920×1080 PNG per slide, palette by slide index
//!  ├─ 6. Encode    ffmpeg: image + audio → segment as long as the narration
//!  └─ 7. Assemble  ffmpeg concat → one MP4 (or per-slide MP3s without ffmpeg)
//! ```
//!
//! Everything runs strictly in order. The only recovery is the speech
//! fallback; every other failure stops the run with a [`LectureError`] naming
//! its stage.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2video::{generate_lecture, LectureConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // LLM provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = LectureConfig::builder()
//!         .elevenlabs_api_key(std::env::var("ELEVENLABS_API_KEY").unwrap_or_default())
//!         .build()?;
//!     let output = generate_lecture("physics.pdf", &config).await?;
//!     match output.video_path {
//!         Some(path) => println!("video: {}", path.display()),
//!         None => println!("{} audio clips exported", output.audio_clips.len()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2video` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External tools
//!
//! * **libpdfium**: located or downloaded on first use by `pdfium-auto`.
//! * **ffmpeg**: searched on `PATH`. Without it the run stops after narration
//!   and exports `slide_{n}_audio.mp3` files instead of a video.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LectureConfig, LectureConfigBuilder, VideoMode};
pub use error::{LectureError, SpeechError, Stage};
pub use generate::{
    check_environment, generate_lecture, generate_lecture_from_bytes, generate_lecture_sync,
    plan_lecture, EnvironmentReport,
};
pub use output::{
    AudioClip, DurationSource, LectureOutput, RunStats, Slide, SpeechBackendKind, VideoSegment,
};
pub use pipeline::palette::{Palette, PALETTES};
pub use progress::{LectureProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::LectureSession;
