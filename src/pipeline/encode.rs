//! Video encoding through the external `ffmpeg` binary.
//!
//! Two invocations do all the work:
//!
//! ```text
//! ffmpeg -y -v error -loop 1 -i slide_N.png -i slide_N_audio.mp3 \
//!        -c:v libx264 -c:a aac -pix_fmt yuv420p -shortest segment_N.mp4
//! ffmpeg -y -v error -f concat -safe 0 -i concat_list.txt -c copy out.mp4
//! ```
//!
//! `-loop 1` repeats the still image forever and `-shortest` cuts the segment
//! when the audio ends, so each segment lasts exactly as long as its
//! narration. The concat demuxer then stream-copies segments without
//! re-encoding; this relies on every segment sharing codec parameters, which
//! holds because they all come from the command above.
//!
//! Processes run to completion with no timeout. stderr is captured and
//! handed back in the error on a non-zero exit.

use crate::config::LectureConfig;
use crate::error::LectureError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Name of the concat demuxer manifest.
pub const CONCAT_MANIFEST: &str = "concat_list.txt";

/// Lines of encoder stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 40;

/// Failure of one encoder invocation.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code:?}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("could not write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable ffprobe output: {0}")]
    Probe(String),
}

impl EncodeError {
    fn exit_code(&self) -> Option<i32> {
        match self {
            EncodeError::Failed { code, .. } => *code,
            _ => None,
        }
    }

    fn stderr(&self) -> String {
        match self {
            EncodeError::Failed { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        }
    }

    /// Fatal error for slide `slide` (1-based).
    pub fn into_segment_error(self, slide: usize) -> LectureError {
        LectureError::SegmentEncodingFailed {
            slide,
            exit_code: self.exit_code(),
            stderr: self.stderr(),
        }
    }

    pub fn into_concat_error(self) -> LectureError {
        LectureError::ConcatFailed {
            exit_code: self.exit_code(),
            stderr: self.stderr(),
        }
    }
}

// ── Command builder ──────────────────────────────────────────────────────

/// One `-i` input with the options that precede it.
#[derive(Debug, Clone)]
struct Input {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for ffmpeg argument lists.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    output_args: Vec<String>,
    output: PathBuf,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input preceded by `args`.
    pub fn input_with<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(Input {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with(Vec::<String>::new(), path)
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn pixel_format(self, fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(fmt)
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Still image + narration → one segment lasting as long as the audio.
pub fn segment_command(image: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input_with(["-loop", "1"], image)
        .input(audio)
        .video_codec("libx264")
        .audio_codec("aac")
        .pixel_format("yuv420p")
        .output_arg("-shortest")
}

/// Concat-demuxer stream copy of the segments listed in `manifest`.
pub fn concat_command(manifest: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input_with(["-f", "concat", "-safe", "0"], manifest)
        .output_arg("-c")
        .output_arg("copy")
}

/// Manifest body: one `file '<path>'` line per segment, quotes escaped.
pub fn concat_manifest(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}

// ── Encoder ──────────────────────────────────────────────────────────────

/// Resolved ffmpeg (and, when present, ffprobe) binaries.
#[derive(Debug, Clone)]
pub struct Encoder {
    ffmpeg: PathBuf,
    ffprobe: Option<PathBuf>,
}

impl Encoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: Option<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe,
        }
    }

    /// Find the encoder.
    ///
    /// An explicitly configured path must resolve, otherwise the run fails
    /// with [`LectureError::EncoderNotFound`]. Without one, `PATH` is
    /// searched and `Ok(None)` means "no encoder; export audio instead".
    pub fn locate(config: &LectureConfig) -> Result<Option<Self>, LectureError> {
        let ffmpeg = match &config.ffmpeg_path {
            Some(path) => Some(which::which(path).map_err(|_| LectureError::EncoderNotFound)?),
            None => which::which("ffmpeg").ok(),
        };
        let Some(ffmpeg) = ffmpeg else {
            return Ok(None);
        };
        let ffprobe = sibling_ffprobe(&ffmpeg).or_else(|| which::which("ffprobe").ok());
        debug!("ffmpeg: {}, ffprobe: {:?}", ffmpeg.display(), ffprobe);
        Ok(Some(Self { ffmpeg, ffprobe }))
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe(&self) -> Option<&Path> {
        self.ffprobe.as_deref()
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> Result<(), EncodeError> {
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.ffmpeg.display(), args.join(" "));
        run_captured(&self.ffmpeg, &args).await.map(|_| ())
    }

    pub async fn encode_segment(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
    ) -> Result<(), EncodeError> {
        self.run(&segment_command(image, audio, output)).await
    }

    /// Write the manifest into `scratch_dir` and concatenate `segments` into `output`.
    pub async fn concat_segments(
        &self,
        segments: &[PathBuf],
        scratch_dir: &Path,
        output: &Path,
    ) -> Result<PathBuf, EncodeError> {
        let manifest = scratch_dir.join(CONCAT_MANIFEST);
        tokio::fs::write(&manifest, concat_manifest(segments))
            .await
            .map_err(|source| EncodeError::Io {
                path: manifest.clone(),
                source,
            })?;
        self.run(&concat_command(&manifest, output)).await?;
        info!("Assembled {} segments into {}", segments.len(), output.display());
        Ok(manifest)
    }

    /// Container duration in seconds, via ffprobe.
    pub async fn probe_duration(&self, path: &Path) -> Result<f64, EncodeError> {
        let ffprobe = self.ffprobe.as_deref().ok_or_else(|| EncodeError::Probe("ffprobe not found".into()))?;
        let args = [
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            path.to_string_lossy().to_string(),
        ];
        let stdout = run_captured(ffprobe, &args).await?;
        parse_probe_duration(&stdout)
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe_duration(stdout: &[u8]) -> Result<f64, EncodeError> {
    let probe: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| EncodeError::Probe(e.to_string()))?;
    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| EncodeError::Probe("no duration in format section".into()))
}

fn sibling_ffprobe(ffmpeg: &Path) -> Option<PathBuf> {
    let name = format!("ffprobe{}", std::env::consts::EXE_SUFFIX);
    let candidate = ffmpeg.parent()?.join(name);
    candidate.is_file().then_some(candidate)
}

async fn run_captured(program: &Path, args: &[String]) -> Result<Vec<u8>, EncodeError> {
    let program_name = program.display().to_string();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| EncodeError::Spawn {
            program: program_name.clone(),
            source,
        })?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(EncodeError::Failed {
            program: program_name,
            code: output.status.code(),
            stderr: stderr_tail(&output.stderr),
        })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Remove intermediate files; failures are logged and ignored.
pub async fn cleanup_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}
