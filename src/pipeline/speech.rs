//! Speech backends: narration text → MP3 file.
//!
//! Two HTTP backends implement [`SpeechBackend`]:
//!
//! * [`ElevenLabsBackend`] — premium voice, needs an API key.
//! * [`GoogleTranslateBackend`] — the free Google Translate voice. Requests
//!   are limited to short queries, so text is split into word-bounded chunks
//!   and the MP3 responses are concatenated (MP3 frames are self-delimiting,
//!   so the result plays as one stream).
//!
//! Both backends only write the file; measuring its duration is left to the
//! narrator, which also knows what to assume when measuring fails.

use crate::config::LectureConfig;
use crate::error::{LectureError, SpeechError};
use crate::output::SpeechBackendKind;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Longest query the free endpoint accepts, in characters.
pub const GOOGLE_TTS_MAX_CHARS: usize = 100;

/// Duration assumed for an ElevenLabs clip that cannot be measured.
pub const ELEVENLABS_FALLBACK_SECS: f64 = 5.0;

/// Seconds per character assumed for an unmeasurable free-backend clip.
pub const GOOGLE_SECS_PER_CHAR: f64 = 0.1;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Turns text into an MP3 file.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn kind(&self) -> SpeechBackendKind;

    /// Synthesize `text` and write the MP3 to `dest`.
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<(), SpeechError>;

    /// Duration to assume when the written clip cannot be measured.
    fn fallback_duration(&self, text: &str) -> f64;
}

// ── ElevenLabs ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// `POST /v1/text-to-speech/{voice_id}` on the ElevenLabs API.
pub struct ElevenLabsBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    stability: f32,
    similarity_boost: f32,
    timeout_secs: u64,
}

impl ElevenLabsBackend {
    /// Build from config; `None` when no API key is configured.
    pub fn from_config(config: &LectureConfig) -> Result<Option<Self>, LectureError> {
        let Some(api_key) = config.elevenlabs_api_key.clone() else {
            return Ok(None);
        };
        Ok(Some(Self {
            client: http_client(config.tts_timeout_secs)?,
            base_url: config.elevenlabs_base_url.trim_end_matches('/').to_string(),
            api_key,
            voice_id: config.voice_id.clone(),
            model_id: config.tts_model.clone(),
            stability: config.voice_stability,
            similarity_boost: config.voice_similarity_boost,
            timeout_secs: config.tts_timeout_secs,
        }))
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

#[async_trait]
impl SpeechBackend for ElevenLabsBackend {
    fn kind(&self) -> SpeechBackendKind {
        SpeechBackendKind::ElevenLabs
    }

    async fn synthesize(&self, text: &str, dest: &Path) -> Result<(), SpeechError> {
        let backend = self.kind().as_str();
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText {
                backend: backend.to_string(),
            });
        }

        let body = ElevenLabsRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        };

        debug!("ElevenLabs request: {} chars, voice {}", text.len(), self.voice_id);
        let response = self
            .client
            .post(self.endpoint())
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::from_reqwest(backend, e, self.timeout_secs))?;

        let audio = read_audio_body(backend, response, self.timeout_secs).await?;
        write_clip(dest, &audio).await
    }

    fn fallback_duration(&self, _text: &str) -> f64 {
        ELEVENLABS_FALLBACK_SECS
    }
}

// ── Google Translate ─────────────────────────────────────────────────────

/// `GET /translate_tts` on translate.google.com.
pub struct GoogleTranslateBackend {
    client: reqwest::Client,
    base_url: String,
    language: String,
    timeout_secs: u64,
}

impl GoogleTranslateBackend {
    pub fn from_config(config: &LectureConfig) -> Result<Self, LectureError> {
        Ok(Self {
            client: http_client(config.tts_timeout_secs)?,
            base_url: config.google_tts_base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            timeout_secs: config.tts_timeout_secs,
        })
    }

    async fn fetch_chunk(&self, chunk: &str) -> Result<Vec<u8>, SpeechError> {
        let backend = self.kind().as_str();
        let response = self
            .client
            .get(format!("{}/translate_tts", self.base_url))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", chunk),
            ])
            .send()
            .await
            .map_err(|e| SpeechError::from_reqwest(backend, e, self.timeout_secs))?;
        read_audio_body(backend, response, self.timeout_secs).await
    }
}

#[async_trait]
impl SpeechBackend for GoogleTranslateBackend {
    fn kind(&self) -> SpeechBackendKind {
        SpeechBackendKind::GoogleTranslate
    }

    async fn synthesize(&self, text: &str, dest: &Path) -> Result<(), SpeechError> {
        let chunks = chunk_text(text, GOOGLE_TTS_MAX_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyText {
                backend: self.kind().as_str().to_string(),
            });
        }

        debug!("Google TTS request: {} chunks", chunks.len());
        let mut audio = Vec::new();
        for chunk in &chunks {
            audio.extend(self.fetch_chunk(chunk).await?);
        }
        write_clip(dest, &audio).await
    }

    fn fallback_duration(&self, text: &str) -> f64 {
        text.chars().count() as f64 * GOOGLE_SECS_PER_CHAR
    }
}

/// Split `text` into chunks of at most `max_chars` characters, breaking on
/// whitespace. A single word longer than `max_chars` is split mid-word.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word_chars: Vec<char> = word.chars().collect();

        // Words that can never fit are cut into max-sized pieces first.
        while word_chars.len() > max_chars {
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word_chars.split_off(max_chars);
            chunks.push(word_chars.into_iter().collect());
            word_chars = rest;
        }
        if word_chars.is_empty() {
            continue;
        }

        let sep = usize::from(current_len > 0);
        if current_len + sep + word_chars.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word_chars.len();
        current.extend(word_chars);
    }
    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}

// ── Shared helpers ───────────────────────────────────────────────────────

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, LectureError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LectureError::InvalidConfig(format!("HTTP client: {e}")))
}

async fn read_audio_body(
    backend: &str,
    response: reqwest::Response,
    timeout_secs: u64,
) -> Result<Vec<u8>, SpeechError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SpeechError::Http {
            backend: backend.to_string(),
            status: status.as_u16(),
            body: body.chars().take(300).collect(),
        });
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| SpeechError::from_reqwest(backend, e, timeout_secs))?;
    if bytes.is_empty() {
        return Err(SpeechError::EmptyAudio {
            backend: backend.to_string(),
        });
    }
    Ok(bytes.to_vec())
}

async fn write_clip(dest: &Path, audio: &[u8]) -> Result<(), SpeechError> {
    tokio::fs::write(dest, audio)
        .await
        .map_err(|e| SpeechError::Io {
            path: dest.to_path_buf(),
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, key: Option<&str>) -> LectureConfig {
        let mut b = LectureConfig::builder()
            .elevenlabs_base_url(server.uri())
            .google_tts_base_url(server.uri())
            .voice_id("voice-1")
            .tts_timeout_secs(5);
        if let Some(k) = key {
            b = b.elevenlabs_api_key(k);
        }
        b.build().unwrap()
    }

    #[test]
    fn chunks_respect_limit_and_words() {
        let text = "Gravity pulls objects toward each other and keeps planets in their orbits around the sun, which is neat.";
        let chunks = chunk_text(text, 40);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 40, "chunk too long: {c:?}");
            assert!(!c.starts_with(' ') && !c.ends_with(' '));
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn chunks_split_overlong_words() {
        let chunks = chunk_text("ab abcdefghij cd", 4);
        assert_eq!(chunks, vec!["ab", "abcd", "efgh", "ij", "cd"]);
    }

    #[test]
    fn chunks_of_blank_text_are_empty() {
        assert!(chunk_text("   \n ", 100).is_empty());
        assert_eq!(chunk_text("hello", 100), vec!["hello"]);
    }

    #[test]
    fn no_key_means_no_premium_backend() {
        let config = LectureConfig::default();
        assert!(ElevenLabsBackend::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn fallback_durations() {
        let config = LectureConfig::builder().elevenlabs_api_key("k").build().unwrap();
        let eleven = ElevenLabsBackend::from_config(&config).unwrap().unwrap();
        assert_eq!(eleven.fallback_duration("anything at all"), 5.0);

        let google = GoogleTranslateBackend::from_config(&config).unwrap();
        assert!((google.fallback_duration("0123456789") - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn elevenlabs_writes_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-1"))
            .and(header("xi-api-key", "secret"))
            .and(header("accept", "audio/mpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3fake-mp3".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server, Some("secret"));
        let backend = ElevenLabsBackend::from_config(&config).unwrap().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp3");
        backend.synthesize("Let's discuss Gravity.", &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"ID3fake-mp3");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["text"], "Let's discuss Gravity.");
        assert!((body["voice_settings"]["stability"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn elevenlabs_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let config = config_for(&server, Some("bad"));
        let backend = ElevenLabsBackend::from_config(&config).unwrap().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = backend
            .synthesize("hello", &dir.path().join("x.mp3"))
            .await
            .unwrap_err();
        match err {
            SpeechError::Http { status, body, .. } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn google_concatenates_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("client", "tw-ob"))
            .and(query_param("tl", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"MP3".to_vec()))
            .mount(&server)
            .await;

        let config = config_for(&server, None);
        let backend = GoogleTranslateBackend::from_config(&config).unwrap();
        let text = "word ".repeat(50);
        let expected_chunks = chunk_text(&text, GOOGLE_TTS_MAX_CHARS).len();
        assert!(expected_chunks >= 3);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp3");
        backend.synthesize(&text, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"MP3".repeat(expected_chunks));
        assert_eq!(server.received_requests().await.unwrap().len(), expected_chunks);
    }

    #[tokio::test]
    async fn google_empty_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = config_for(&server, None);
        let backend = GoogleTranslateBackend::from_config(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = backend
            .synthesize("hello", &dir.path().join("x.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::EmptyAudio { .. }));
    }
}
