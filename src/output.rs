//! Data model shared by the pipeline stages and returned to callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One unit of presented content.
///
/// All three fields are required when deserialising model output; a slide
/// missing any of them fails the whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    pub bullet_points: Vec<String>,
    pub teaching_script: String,
}

impl Slide {
    /// Text spoken over this slide.
    ///
    /// `"Let's discuss {title}. {script}"`, with the bullet points standing in
    /// for a blank teaching script.
    pub fn narration_text(&self) -> String {
        let body = if self.teaching_script.trim().is_empty() {
            self.bullet_points.join(" ")
        } else {
            self.teaching_script.clone()
        };
        format!("Let's discuss {}. {}", self.title, body)
    }
}

/// Which speech backend produced a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechBackendKind {
    ElevenLabs,
    GoogleTranslate,
}

impl SpeechBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechBackendKind::ElevenLabs => "elevenlabs",
            SpeechBackendKind::GoogleTranslate => "google-translate",
        }
    }
}

impl fmt::Display for SpeechBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a clip duration was read from the audio or guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    Measured,
    Estimated,
}

/// Narration audio for one slide.
///
/// `path` lives in the run's scratch directory until the slide's segment is
/// encoded; in audio-only runs it is rewritten to the exported file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub slide_index: usize,
    pub backend: SpeechBackendKind,
    pub duration_source: DurationSource,
}

/// One encoded slide; removed after final concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSegment {
    pub path: PathBuf,
    pub slide_index: usize,
}

/// Timing and usage figures for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub source_chars: usize,
    pub slide_count: usize,
    /// Sum of clip durations in seconds.
    pub narration_secs: f64,
    /// Slides narrated by the free backend after the premium one failed.
    pub fallback_count: usize,
    /// Clips whose duration had to be estimated.
    pub estimated_durations: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub extract_duration_ms: u64,
    pub plan_duration_ms: u64,
    pub narrate_duration_ms: u64,
    pub video_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Duration of the assembled video as reported by ffprobe.
    pub video_secs: Option<f64>,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LectureOutput {
    pub slides: Vec<Slide>,
    pub audio_clips: Vec<AudioClip>,
    /// Set when a video was assembled.
    pub video_path: Option<PathBuf>,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(script: &str) -> Slide {
        Slide {
            title: "Gravity".into(),
            bullet_points: vec!["Mass attracts mass".into(), "g = 9.81 m/s²".into()],
            teaching_script: script.into(),
        }
    }

    #[test]
    fn narration_uses_teaching_script() {
        assert_eq!(
            slide("Gravity pulls objects together.").narration_text(),
            "Let's discuss Gravity. Gravity pulls objects together."
        );
    }

    #[test]
    fn narration_falls_back_to_bullets() {
        assert_eq!(
            slide("  ").narration_text(),
            "Let's discuss Gravity. Mass attracts mass g = 9.81 m/s²"
        );
    }

    #[test]
    fn slide_requires_every_field() {
        let missing_script = r#"{"title":"A","bullet_points":["x"]}"#;
        assert!(serde_json::from_str::<Slide>(missing_script).is_err());

        let wrong_type = r#"{"title":"A","bullet_points":"x","teaching_script":"s"}"#;
        assert!(serde_json::from_str::<Slide>(wrong_type).is_err());
    }

    #[test]
    fn backend_kind_serialises_kebab_case() {
        let json = serde_json::to_string(&SpeechBackendKind::GoogleTranslate).unwrap();
        assert_eq!(json, "\"google-translate\"");
        assert_eq!(SpeechBackendKind::ElevenLabs.to_string(), "elevenlabs");
    }
}
