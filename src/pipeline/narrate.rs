//! Narration: one slide → one [`AudioClip`].
//!
//! The premium backend is tried first when configured; any failure is logged,
//! reported through the progress callback and answered by one attempt on the
//! free backend. Only when that fails too does the slide fail, and with it
//! the run, so slides and clips always stay aligned.

use crate::config::LectureConfig;
use crate::error::LectureError;
use crate::output::{AudioClip, DurationSource, Slide};
use crate::pipeline::audio::probe_mp3_duration;
use crate::pipeline::speech::{ElevenLabsBackend, GoogleTranslateBackend, SpeechBackend};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Primary/fallback pair of speech backends.
pub struct Narrator {
    primary: Option<Box<dyn SpeechBackend>>,
    fallback: Box<dyn SpeechBackend>,
    progress: ProgressCallback,
}

impl Narrator {
    pub fn new(
        primary: Option<Box<dyn SpeechBackend>>,
        fallback: Box<dyn SpeechBackend>,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            primary,
            fallback,
            progress: progress.unwrap_or_else(|| Arc::new(NoopProgressCallback)),
        }
    }

    /// ElevenLabs (when a key is set) backed by Google Translate.
    pub fn from_config(config: &LectureConfig) -> Result<Self, LectureError> {
        let primary = ElevenLabsBackend::from_config(config)?
            .map(|b| Box::new(b) as Box<dyn SpeechBackend>);
        if primary.is_none() {
            debug!("No ElevenLabs key; narrating with the free backend only");
        }
        let fallback = Box::new(GoogleTranslateBackend::from_config(config)?);
        Ok(Self::new(primary, fallback, config.progress_callback.clone()))
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Narrate slide `index` (0-based) into `scratch_dir`.
    pub async fn narrate(
        &self,
        index: usize,
        slide: &Slide,
        scratch_dir: &Path,
    ) -> Result<AudioClip, LectureError> {
        let text = slide.narration_text();
        let dest = clip_path(scratch_dir, index);

        let mut primary_error = None;
        if let Some(primary) = &self.primary {
            match primary.synthesize(&text, &dest).await {
                Ok(()) => return Ok(self.finish(primary.as_ref(), &text, dest, index).await),
                Err(e) => {
                    warn!("Slide {}: {}; falling back to {}", index + 1, e, self.fallback.kind());
                    self.progress.on_narration_fallback(index, &e);
                    primary_error = Some(e);
                }
            }
        }

        match self.fallback.synthesize(&text, &dest).await {
            Ok(()) => Ok(self.finish(self.fallback.as_ref(), &text, dest, index).await),
            Err(fallback) => Err(LectureError::NarrationFailed {
                slide: index + 1,
                primary: primary_error,
                fallback,
            }),
        }
    }

    async fn finish(
        &self,
        backend: &dyn SpeechBackend,
        text: &str,
        path: PathBuf,
        index: usize,
    ) -> AudioClip {
        let (duration_secs, duration_source) = match probe_mp3_duration(&path).await {
            Some(secs) => (secs, DurationSource::Measured),
            None => {
                let secs = backend.fallback_duration(text);
                warn!(
                    "Slide {}: could not measure {} audio, assuming {:.1}s",
                    index + 1,
                    backend.kind(),
                    secs
                );
                (secs, DurationSource::Estimated)
            }
        };
        AudioClip {
            path,
            duration_secs,
            slide_index: index,
            backend: backend.kind(),
            duration_source,
        }
    }
}

/// `slide_{n}_audio.mp3`, 1-based like the exported files.
pub fn clip_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("slide_{}_audio.mp3", index + 1))
}
