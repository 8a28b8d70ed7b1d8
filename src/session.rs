//! Request-scoped pipeline state and the end-to-end run.
//!
//! A [`LectureSession`] holds what one run has produced so far: slides, audio
//! clips, the video path and the last error message. Every run starts by
//! resetting it, so nothing leaks from one document into the next, and a
//! failed run still leaves the partial state behind for inspection.
//!
//! ## Flow
//!
//! ```text
//! input ─▶ extract ─▶ plan ─▶ narrate ─┬─▶ render ─▶ encode ─▶ assemble ─▶ video
//!                                      └─▶ export audio (no ffmpeg / audio-only)
//! ```
//!
//! Every step, and every slide within a step, is awaited before the next
//! starts. Intermediate files live in one per-run [`tempfile::TempDir`].

use crate::config::{LectureConfig, VideoMode};
use crate::error::{LectureError, Stage};
use crate::output::{
    AudioClip, DurationSource, LectureOutput, RunStats, Slide, SpeechBackendKind, VideoSegment,
};
use crate::pipeline::encode::{cleanup_files, Encoder};
use crate::pipeline::extract::extract_text;
use crate::pipeline::font::SlideFont;
use crate::pipeline::input::{check_magic, load_pdf};
use crate::pipeline::narrate::Narrator;
use crate::pipeline::planner::{plan_slides, resolve_provider};
use crate::pipeline::render::render_slide_to_file;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use edgequake_llm::LLMProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Concat output inside the scratch dir, moved to `output_dir` afterwards.
const STAGED_VIDEO_NAME: &str = "assembled_lecture.mp4";

/// Where the PDF comes from.
pub(crate) enum PdfSource<'a> {
    /// Local path or HTTP/HTTPS URL.
    Input(&'a str),
    /// Bytes already in memory.
    Bytes(Vec<u8>),
    /// Text already extracted; input and extraction are skipped.
    Text(String),
}

/// State of one lecture generation run.
#[derive(Debug, Clone, Default)]
pub struct LectureSession {
    pub slides: Vec<Slide>,
    pub audio_clips: Vec<AudioClip>,
    pub video_path: Option<PathBuf>,
    pub error_message: Option<String>,
    pub stats: RunStats,
}

impl LectureSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything from the previous run.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Snapshot of the current state.
    pub fn output(&self) -> LectureOutput {
        LectureOutput {
            slides: self.slides.clone(),
            audio_clips: self.audio_clips.clone(),
            video_path: self.video_path.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Run the whole pipeline on a path or URL.
    pub async fn run(
        &mut self,
        input: &str,
        config: &LectureConfig,
    ) -> Result<LectureOutput, LectureError> {
        self.execute(PdfSource::Input(input), config).await
    }

    /// Run the whole pipeline on PDF bytes already in memory.
    pub async fn run_bytes(
        &mut self,
        pdf: Vec<u8>,
        config: &LectureConfig,
    ) -> Result<LectureOutput, LectureError> {
        self.execute(PdfSource::Bytes(pdf), config).await
    }

    /// Run the pipeline on text that was already extracted from a PDF.
    pub async fn run_text(
        &mut self,
        text: impl Into<String>,
        config: &LectureConfig,
    ) -> Result<LectureOutput, LectureError> {
        self.execute(PdfSource::Text(text.into()), config).await
    }

    /// Extract and plan only; no audio or video is produced.
    pub async fn plan_only(
        &mut self,
        input: &str,
        config: &LectureConfig,
    ) -> Result<Vec<Slide>, LectureError> {
        self.reset();
        let total_start = Instant::now();
        let cb = progress(config);
        let result = self.extract_and_plan(PdfSource::Input(input), config, &cb).await;
        self.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        self.record(result)?;
        Ok(self.slides.clone())
    }

    pub(crate) async fn execute(
        &mut self,
        source: PdfSource<'_>,
        config: &LectureConfig,
    ) -> Result<LectureOutput, LectureError> {
        self.reset();
        let total_start = Instant::now();
        let cb = progress(config);

        let result = self.pipeline(source, config, &cb).await;
        self.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        self.record(result)?;

        info!(
            "Lecture complete: {} slides, {:.1}s narration, {}ms total",
            self.stats.slide_count, self.stats.narration_secs, self.stats.total_duration_ms
        );
        cb.on_run_complete(&self.stats);
        Ok(self.output())
    }

    fn record(&mut self, result: Result<(), LectureError>) -> Result<(), LectureError> {
        result.inspect_err(|e| {
            error!("Stage '{}' failed: {}", e.stage(), e);
            self.error_message = Some(e.to_string());
        })
    }

    async fn pipeline(
        &mut self,
        source: PdfSource<'_>,
        config: &LectureConfig,
        cb: &ProgressCallback,
    ) -> Result<(), LectureError> {
        // Located before any LLM or speech request is made.
        let encoder = match config.video_mode {
            VideoMode::AudioOnly => None,
            VideoMode::Auto => Encoder::locate(config)?,
        };

        self.extract_and_plan(source, config, cb).await?;

        let scratch = tempfile::Builder::new()
            .prefix("pdf2video-")
            .tempdir()
            .map_err(|e| LectureError::internal(Stage::Narrate, format!("scratch dir: {e}")))?;
        debug!("Scratch directory: {}", scratch.path().display());

        // ── Narration ────────────────────────────────────────────────────
        cb.on_stage_start(Stage::Narrate);
        let narrate_start = Instant::now();
        self.narrate(config, scratch.path(), cb).await?;
        self.stats.narrate_duration_ms = narrate_start.elapsed().as_millis() as u64;

        // ── Video or audio export ────────────────────────────────────────
        let Some(encoder) = encoder else {
            if config.video_mode == VideoMode::Auto {
                warn!("FFmpeg not found. Exporting per-slide audio instead of a video.");
            }
            return self.export_audio(config).await;
        };

        let video_start = Instant::now();
        match self.assemble_video(&encoder, &scratch, config, cb).await {
            Ok(path) => {
                match encoder.probe_duration(&path).await {
                    Ok(secs) => self.stats.video_secs = Some(secs),
                    Err(e) => debug!("Video duration unavailable: {}", e),
                }
                self.video_path = Some(path);
                self.stats.video_duration_ms = video_start.elapsed().as_millis() as u64;
                Ok(())
            }
            Err(e) => {
                warn!("Video creation failed; exporting narration audio");
                if let Err(export_err) = self.export_audio(config).await {
                    warn!("Audio export also failed: {}", export_err);
                }
                Err(e)
            }
        }
    }

    async fn extract_and_plan(
        &mut self,
        source: PdfSource<'_>,
        config: &LectureConfig,
        cb: &ProgressCallback,
    ) -> Result<(), LectureError> {
        // ── Input ────────────────────────────────────────────────────────
        cb.on_stage_start(Stage::Input);
        let pdf = match source {
            PdfSource::Input(input) => {
                info!("Starting lecture generation: {}", input);
                load_pdf(input, config.download_timeout_secs).await?
            }
            PdfSource::Bytes(bytes) => {
                check_magic(&bytes, Path::new("<memory>"))?;
                bytes
            }
            PdfSource::Text(text) => {
                let provider = resolve_provider(config)?;
                return self.plan(&provider, &text, config, cb).await;
            }
        };

        let provider = resolve_provider(config)?;

        // ── Extraction ───────────────────────────────────────────────────
        cb.on_stage_start(Stage::Extract);
        let extract_start = Instant::now();
        let text = extract_text(pdf).await?;
        self.stats.extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} chars in {}ms",
            text.chars().count(),
            self.stats.extract_duration_ms
        );

        self.plan(&provider, &text, config, cb).await
    }

    async fn plan(
        &mut self,
        provider: &Arc<dyn LLMProvider>,
        text: &str,
        config: &LectureConfig,
        cb: &ProgressCallback,
    ) -> Result<(), LectureError> {
        if text.trim().is_empty() {
            return Err(LectureError::NoTextExtracted);
        }
        self.stats.source_chars = text.chars().count();

        // ── Planning ─────────────────────────────────────────────────────
        cb.on_stage_start(Stage::Plan);
        let plan_start = Instant::now();
        let plan = plan_slides(provider, text, config).await?;
        self.stats.plan_duration_ms = plan_start.elapsed().as_millis() as u64;
        self.stats.input_tokens = plan.input_tokens;
        self.stats.output_tokens = plan.output_tokens;
        self.stats.slide_count = plan.slides.len();
        self.slides = plan.slides;
        cb.on_slides_planned(self.slides.len());
        Ok(())
    }

    async fn narrate(
        &mut self,
        config: &LectureConfig,
        scratch: &Path,
        cb: &ProgressCallback,
    ) -> Result<(), LectureError> {
        let narrator = Narrator::from_config(config)?;
        let total = self.slides.len();

        for (i, slide) in self.slides.iter().enumerate() {
            let clip = narrator.narrate(i, slide, scratch).await?;
            info!(
                "Slide {}/{}: {:.1}s of audio via {}",
                i + 1,
                total,
                clip.duration_secs,
                clip.backend
            );
            if narrator.has_primary() && clip.backend != SpeechBackendKind::ElevenLabs {
                self.stats.fallback_count += 1;
            }
            if clip.duration_source == DurationSource::Estimated {
                self.stats.estimated_durations += 1;
            }
            self.stats.narration_secs += clip.duration_secs;
            cb.on_slide_narrated(i, total, &clip);
            self.audio_clips.push(clip);
        }
        Ok(())
    }

    async fn assemble_video(
        &self,
        encoder: &Encoder,
        scratch: &TempDir,
        config: &LectureConfig,
        cb: &ProgressCallback,
    ) -> Result<PathBuf, LectureError> {
        let dir = scratch.path();
        if self.slides.len() != self.audio_clips.len() {
            return Err(LectureError::internal(
                Stage::Render,
                format!(
                    "{} slides but {} audio clips",
                    self.slides.len(),
                    self.audio_clips.len()
                ),
            ));
        }
        let total = self.slides.len();

        // ── Rendering ────────────────────────────────────────────────────
        cb.on_stage_start(Stage::Render);
        let font_path = config.font_path.clone();
        let font = tokio::task::spawn_blocking(move || SlideFont::load(font_path.as_deref()))
            .await
            .map_err(|e| LectureError::internal(Stage::Render, format!("Font task panicked: {}", e)))?;
        info!("Slide font: {}", font.describe());
        let font = Arc::new(font);

        let mut images = Vec::with_capacity(total);
        for (i, slide) in self.slides.iter().enumerate() {
            images.push(render_slide_to_file(slide, i, Arc::clone(&font), dir).await?);
        }

        // ── Segment encoding ─────────────────────────────────────────────
        cb.on_stage_start(Stage::Encode);
        let mut segments = Vec::with_capacity(total);
        for (i, (image, clip)) in images.iter().zip(&self.audio_clips).enumerate() {
            let segment = VideoSegment {
                path: dir.join(format!("segment_{}.mp4", i + 1)),
                slide_index: i,
            };
            encoder
                .encode_segment(image, &clip.path, &segment.path)
                .await
                .map_err(|e| e.into_segment_error(i + 1))?;
            segments.push(segment);
            cb.on_segment_encoded(i, total);
        }

        // ── Assembly ─────────────────────────────────────────────────────
        cb.on_stage_start(Stage::Assemble);
        let staged = dir.join(STAGED_VIDEO_NAME);
        let segment_paths: Vec<PathBuf> = segments.into_iter().map(|s| s.path).collect();
        let manifest = encoder
            .concat_segments(&segment_paths, dir, &staged)
            .await
            .map_err(|e| e.into_concat_error())?;

        let final_path = config.video_output_path();
        create_output_dir(&config.output_dir).await?;
        move_file(&staged, &final_path).await?;

        let mut intermediates = images;
        intermediates.extend(self.audio_clips.iter().map(|c| c.path.clone()));
        intermediates.extend(segment_paths);
        intermediates.push(manifest);
        cleanup_files(&intermediates).await;

        info!("Video saved: {}", final_path.display());
        Ok(final_path)
    }

    /// Copy every clip to `output_dir` as `slide_{n}_audio.mp3`.
    async fn export_audio(&mut self, config: &LectureConfig) -> Result<(), LectureError> {
        create_output_dir(&config.output_dir).await?;
        for clip in &mut self.audio_clips {
            let dest = config.audio_export_path(clip.slide_index);
            tokio::fs::copy(&clip.path, &dest)
                .await
                .map_err(|source| LectureError::OutputWriteFailed {
                    path: dest.clone(),
                    source,
                })?;
            debug!("Exported {}", dest.display());
            clip.path = dest;
        }
        info!(
            "Exported {} audio clips to {}",
            self.audio_clips.len(),
            config.output_dir.display()
        );
        Ok(())
    }
}

fn progress(config: &LectureConfig) -> ProgressCallback {
    config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback))
}

async fn create_output_dir(dir: &Path) -> Result<(), LectureError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| LectureError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source,
        })
}

/// Rename, falling back to copy + delete across file systems.
async fn move_file(from: &Path, to: &Path) -> Result<(), LectureError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to)
        .await
        .map_err(|source| LectureError::OutputWriteFailed {
            path: to.to_path_buf(),
            source,
        })?;
    cleanup_files(&[from.to_path_buf()]).await;
    Ok(())
}
