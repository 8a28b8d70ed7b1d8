//! Configuration types for PDF-to-video generation.
//!
//! Every knob lives in [`LectureConfig`], built through
//! [`LectureConfigBuilder`]. Defaults reproduce the classic lecture look:
//! Gemini 2.5 Flash for planning, ElevenLabs "Rachel" when a key is present,
//! Google Translate speech otherwise, 1920×1080 slides.

use crate::error::LectureError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default provider when nothing else is configured and `GEMINI_API_KEY` is set.
pub const DEFAULT_PROVIDER: &str = "gemini";
/// Default planning model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// ElevenLabs "Rachel".
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";
pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const GOOGLE_TTS_BASE_URL: &str = "https://translate.google.com";
pub const DEFAULT_VIDEO_FILE_NAME: &str = "synced_lecture_video.mp4";

/// Configuration for one lecture generation run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2video::{LectureConfig, VideoMode};
///
/// let config = LectureConfig::builder()
///     .model("gemini-2.5-flash")
///     .max_source_chars(6000)
///     .video_mode(VideoMode::AudioOnly)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_source_chars, 6000);
/// ```
#[derive(Clone)]
pub struct LectureConfig {
    /// LLM model identifier. `None` uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name ("gemini", "openai", "anthropic", …).
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for slide planning. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the whole plan. Default: 8192.
    ///
    /// Thinking models spend part of this budget before emitting JSON; a low
    /// value truncates the plan mid-object and the run fails at planning.
    pub max_tokens: usize,

    /// Characters of extracted text sent to the model. Default: 4000.
    pub max_source_chars: usize,

    /// Timeout for the planning call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// ElevenLabs API key. When `None` every slide uses the free backend.
    pub elevenlabs_api_key: Option<String>,

    /// ElevenLabs voice. Default: [`DEFAULT_VOICE_ID`].
    pub voice_id: String,

    /// ElevenLabs synthesis model. Default: [`DEFAULT_TTS_MODEL`].
    pub tts_model: String,

    /// ElevenLabs `voice_settings.stability`. Default: 0.6.
    pub voice_stability: f32,

    /// ElevenLabs `voice_settings.similarity_boost`. Default: 0.8.
    pub voice_similarity_boost: f32,

    /// Language code for the free backend. Default: "en".
    pub language: String,

    /// Timeout for each speech request in seconds. Default: 120.
    pub tts_timeout_secs: u64,

    pub elevenlabs_base_url: String,
    pub google_tts_base_url: String,

    /// TrueType font for slide text. `None` searches well-known system fonts.
    pub font_path: Option<PathBuf>,

    /// Whether to encode a video or stop at per-slide audio.
    pub video_mode: VideoMode,

    /// Explicit ffmpeg binary. `None` searches `PATH`.
    pub ffmpeg_path: Option<PathBuf>,

    /// Directory receiving the final video or exported audio. Default: ".".
    pub output_dir: PathBuf,

    /// File name of the assembled video. Default: [`DEFAULT_VIDEO_FILE_NAME`].
    pub video_file_name: String,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for LectureConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 8192,
            max_source_chars: 4000,
            api_timeout_secs: 120,
            elevenlabs_api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            voice_stability: 0.6,
            voice_similarity_boost: 0.8,
            language: "en".to_string(),
            tts_timeout_secs: 120,
            elevenlabs_base_url: ELEVENLABS_BASE_URL.to_string(),
            google_tts_base_url: GOOGLE_TTS_BASE_URL.to_string(),
            font_path: None,
            video_mode: VideoMode::default(),
            ffmpeg_path: None,
            output_dir: PathBuf::from("."),
            video_file_name: DEFAULT_VIDEO_FILE_NAME.to_string(),
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for LectureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LectureConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_source_chars", &self.max_source_chars)
            .field(
                "elevenlabs_api_key",
                &self.elevenlabs_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("voice_id", &self.voice_id)
            .field("language", &self.language)
            .field("font_path", &self.font_path)
            .field("video_mode", &self.video_mode)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("output_dir", &self.output_dir)
            .field("video_file_name", &self.video_file_name)
            .finish()
    }
}

impl LectureConfig {
    pub fn builder() -> LectureConfigBuilder {
        LectureConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model name used for planning.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Path of the assembled video inside `output_dir`.
    pub fn video_output_path(&self) -> PathBuf {
        self.output_dir.join(&self.video_file_name)
    }

    /// Path an exported narration clip gets inside `output_dir` (1-based name).
    pub fn audio_export_path(&self, slide_index: usize) -> PathBuf {
        self.output_dir
            .join(format!("slide_{}_audio.mp3", slide_index + 1))
    }
}

/// Builder for [`LectureConfig`].
#[derive(Debug)]
pub struct LectureConfigBuilder {
    config: LectureConfig,
}

impl LectureConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_source_chars(mut self, n: usize) -> Self {
        self.config.max_source_chars = n.max(100);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Empty keys are treated as absent.
    pub fn elevenlabs_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.elevenlabs_api_key = (!key.trim().is_empty()).then_some(key);
        self
    }

    pub fn voice_id(mut self, id: impl Into<String>) -> Self {
        self.config.voice_id = id.into();
        self
    }

    pub fn tts_model(mut self, model: impl Into<String>) -> Self {
        self.config.tts_model = model.into();
        self
    }

    pub fn voice_settings(mut self, stability: f32, similarity_boost: f32) -> Self {
        self.config.voice_stability = stability.clamp(0.0, 1.0);
        self.config.voice_similarity_boost = similarity_boost.clamp(0.0, 1.0);
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn tts_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tts_timeout_secs = secs;
        self
    }

    pub fn elevenlabs_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.elevenlabs_base_url = url.into();
        self
    }

    pub fn google_tts_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.google_tts_base_url = url.into();
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn video_mode(mut self, mode: VideoMode) -> Self {
        self.config.video_mode = mode;
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_path = Some(path.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn video_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.video_file_name = name.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LectureConfig, LectureError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 || c.tts_timeout_secs == 0 {
            return Err(LectureError::InvalidConfig(
                "Network timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.video_file_name.trim().is_empty()
            || c.video_file_name.contains(['/', '\\'])
            || c.video_file_name == "."
            || c.video_file_name == ".."
        {
            return Err(LectureError::InvalidConfig(format!(
                "Video file name must be a bare file name, got '{}'",
                c.video_file_name
            )));
        }
        if c.language.trim().is_empty() {
            return Err(LectureError::InvalidConfig("Language must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// What the pipeline produces after narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoMode {
    /// Encode a video when ffmpeg is available, otherwise export audio. (default)
    #[default]
    Auto,
    /// Never encode; export per-slide audio files.
    AudioOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_lecture() {
        let c = LectureConfig::default();
        assert_eq!(c.model_or_default(), "gemini-2.5-flash");
        assert_eq!(c.max_source_chars, 4000);
        assert_eq!(c.voice_id, "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(c.video_mode, VideoMode::Auto);
        assert_eq!(
            c.video_output_path(),
            PathBuf::from("./synced_lecture_video.mp4")
        );
    }

    #[test]
    fn builder_clamps_and_validates() {
        let c = LectureConfig::builder()
            .temperature(9.0)
            .max_source_chars(3)
            .voice_settings(1.5, -1.0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_source_chars, 100);
        assert_eq!(c.voice_stability, 1.0);
        assert_eq!(c.voice_similarity_boost, 0.0);

        for bad in ["out/video.mp4", ".", "..", "  "] {
            let err = LectureConfig::builder()
                .video_file_name(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, LectureError::InvalidConfig(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn blank_elevenlabs_key_is_absent() {
        let c = LectureConfig::builder()
            .elevenlabs_api_key("   ")
            .build()
            .unwrap();
        assert!(c.elevenlabs_api_key.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = LectureConfig::builder()
            .elevenlabs_api_key("sk-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn audio_export_names_are_one_based() {
        let c = LectureConfig::builder().output_dir("/tmp/out").build().unwrap();
        assert_eq!(
            c.audio_export_path(0),
            PathBuf::from("/tmp/out/slide_1_audio.mp3")
        );
    }
}
