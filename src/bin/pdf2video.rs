//! CLI binary for edgequake-pdf2video.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `LectureConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2video::{
    check_environment, generate_lecture, plan_lecture, AudioClip, EnvironmentReport,
    LectureConfig, LectureOutput, LectureProgressCallback, Palette, ProgressCallback, RunStats,
    SpeechError, Stage, VideoMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while extracting and planning, then a per-slide bar for narration
/// and another for encoding.
struct CliProgressCallback {
    bar: ProgressBar,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            fallbacks: AtomicUsize::new(0),
        })
    }

    /// Switch to the counting style for a stage that walks `total` slides.
    fn activate_bar(&self, prefix: &'static str, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix(prefix);
    }
}

impl LectureProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        match stage {
            Stage::Input => self.bar.set_message("Opening PDF…"),
            Stage::Extract => {
                self.bar.set_prefix("Extracting");
                self.bar.set_message("Reading text…");
            }
            Stage::Plan => {
                self.bar.set_prefix("Planning");
                self.bar.set_message("Generating slides with the LLM…");
            }
            Stage::Encode => {
                let total = self.bar.length().unwrap_or(0) as usize;
                self.activate_bar("Encoding", total);
            }
            Stage::Assemble => {
                self.bar.set_prefix("Assembling");
                self.bar.set_message("Concatenating segments…");
            }
            Stage::Narrate | Stage::Render => {}
        }
    }

    fn on_slides_planned(&self, slide_count: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Planned {slide_count} slides"))
        ));
        self.activate_bar("Narrating", slide_count);
    }

    fn on_narration_fallback(&self, index: usize, error: &SpeechError) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        let msg = error.to_string();
        let msg = if msg.chars().count() > 80 {
            format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
        } else {
            msg
        };
        self.bar.println(format!(
            "  {} Slide {:>3}  {}",
            yellow("⚠"),
            index + 1,
            dim(&format!("premium voice failed ({msg}); using free voice")),
        ));
    }

    fn on_slide_narrated(&self, index: usize, total: usize, clip: &AudioClip) {
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{:>5.1}s", clip.duration_secs)),
            dim(clip.backend.as_str()),
        ));
        self.bar.inc(1);
    }

    fn on_segment_encoded(&self, _index: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_run_complete(&self, stats: &RunStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} slides narrated  ({:.1}s of audio, {} fallbacks)",
            green("✔"),
            bold(&stats.slide_count.to_string()),
            stats.narration_secs,
            self.fallbacks.load(Ordering::SeqCst),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Narrated video in the current directory (synced_lecture_video.mp4)
  pdf2video notes.pdf

  # Premium voice, custom output directory
  ELEVENLABS_API_KEY=... pdf2video notes.pdf -o lectures/

  # From a URL, planning with OpenAI instead of Gemini
  pdf2video --provider openai --model gpt-4.1-mini https://example.com/paper.pdf

  # Only plan the slides (prints JSON, no audio or video)
  pdf2video --plan-only notes.pdf > slides.json

  # Per-slide MP3s, no ffmpeg needed
  pdf2video --audio-only notes.pdf

  # What is installed and configured?
  pdf2video --check-env

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default planner)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  ELEVENLABS_API_KEY      ElevenLabs key; without it the free Google voice is used
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

SETUP:
  1. Set an LLM key:  export GEMINI_API_KEY=...
  2. Install ffmpeg:  https://ffmpeg.org/download.html
  3. Generate:        pdf2video notes.pdf

  PDFium (~30 MB) is downloaded automatically on first run and cached in
  ~/.cache/pdf2video/pdfium-7690/.
"#;

/// Turn PDF documents into narrated slide-deck videos.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2video",
    version,
    about = "Turn PDF documents into narrated slide-deck videos",
    long_about = "Extract the text of a PDF, let an LLM plan slides with teaching scripts, \
narrate each script (ElevenLabs or the free Google voice), render the slides and join \
everything into one MP4 with ffmpeg.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "check_env")]
    input: Option<String>,

    /// Directory for the video (or the per-slide audio files).
    #[arg(short, long, env = "PDF2VIDEO_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// File name of the assembled video.
    #[arg(long, env = "PDF2VIDEO_VIDEO_NAME", default_value = "synced_lecture_video.mp4")]
    video_name: String,

    /// LLM model ID (default: gemini-2.5-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set \
          (GEMINI_API_KEY is preferred)."
    )]
    provider: Option<String>,

    /// ElevenLabs API key for the premium voice.
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    elevenlabs_api_key: Option<String>,

    /// ElevenLabs voice ID.
    #[arg(long, env = "ELEVENLABS_VOICE_ID")]
    voice_id: Option<String>,

    /// Language of the free voice (e.g. en, fr, de).
    #[arg(long, env = "PDF2VIDEO_LANGUAGE", default_value = "en")]
    language: String,

    /// Characters of PDF text sent to the LLM.
    #[arg(long, env = "PDF2VIDEO_MAX_CHARS", default_value_t = 4000)]
    max_chars: usize,

    /// Max LLM output tokens for the slide plan.
    #[arg(long, env = "PDF2VIDEO_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2VIDEO_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// TrueType font for slide text.
    #[arg(long, env = "PDF2VIDEO_FONT")]
    font: Option<PathBuf>,

    /// Path to the ffmpeg binary (default: search PATH).
    #[arg(long, env = "PDF2VIDEO_FFMPEG")]
    ffmpeg: Option<PathBuf>,

    /// Stop after narration and export per-slide MP3 files.
    #[arg(long)]
    audio_only: bool,

    /// Extract and plan only; print the slides as JSON.
    #[arg(long)]
    plan_only: bool,

    /// Report tools, libraries and credentials, then exit.
    #[arg(long)]
    check_env: bool,

    /// Output structured JSON (LectureOutput) instead of a preview.
    #[arg(long, env = "PDF2VIDEO_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2VIDEO_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2VIDEO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2VIDEO_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Per-request speech timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_TTS_TIMEOUT", default_value_t = 120)]
    tts_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are hidden while the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check_env;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Environment report ───────────────────────────────────────────────
    if cli.check_env {
        let config = build_config(&cli, None)?;
        let report = check_environment(&config);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            print_environment(&report);
        }
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input PDF path or URL is required")?;

    // ── Ensure PDFium engine is available ────────────────────────────────
    // On the very first run the library (~30 MB) is downloaded from
    // bblanchon/pdfium-binaries; later runs only check the cached path.
    if !pdfium_auto::is_cached() {
        if !cli.quiet {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_with_message("ready ✓");
        } else {
            tokio::task::block_in_place(|| pdfium_auto::ensure_library(None))
                .context("Failed to download PDFium engine")?;
        }
    }

    // ── Plan-only mode ───────────────────────────────────────────────────
    if cli.plan_only {
        let config = build_config(&cli, None)?;
        let slides = plan_lecture(&input, &config)
            .await
            .context("Slide planning failed")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&slides).context("Failed to serialise slides")?
        );
        return Ok(());
    }

    // ── Full run ─────────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn LectureProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let output = generate_lecture(&input, &config)
        .await
        .context("Lecture generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_preview(&output, config.video_mode);
    }

    Ok(())
}

/// Map CLI args to `LectureConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<LectureConfig> {
    let mut builder = LectureConfig::builder()
        .output_dir(&cli.output_dir)
        .video_file_name(&cli.video_name)
        .language(&cli.language)
        .max_source_chars(cli.max_chars)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .tts_timeout_secs(cli.tts_timeout);

    if cli.audio_only {
        builder = builder.video_mode(VideoMode::AudioOnly);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref key) = cli.elevenlabs_api_key {
        builder = builder.elevenlabs_api_key(key);
    }
    if let Some(ref voice) = cli.voice_id {
        builder = builder.voice_id(voice);
    }
    if let Some(ref font) = cli.font {
        builder = builder.font_path(font);
    }
    if let Some(ref ffmpeg) = cli.ffmpeg {
        builder = builder.ffmpeg_path(ffmpeg);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn status(ok: bool) -> String {
    if ok {
        green("✓")
    } else {
        red("✗")
    }
}

fn print_environment(report: &EnvironmentReport) {
    let path_or = |p: &Option<PathBuf>, missing: &str| match p {
        Some(path) => path.display().to_string(),
        None => dim(missing),
    };

    println!("{}", bold("Environment Status"));
    println!(
        "  {} ffmpeg       {}",
        status(report.ffmpeg.is_some()),
        path_or(&report.ffmpeg, "not found (audio-only output)")
    );
    println!(
        "  {} ffprobe      {}",
        status(report.ffprobe.is_some()),
        path_or(&report.ffprobe, "not found (video duration not reported)")
    );
    println!(
        "  {} pdfium       {}",
        status(report.pdfium.is_some()),
        match &report.pdfium {
            Some(p) => p.display().to_string(),
            None => dim(&format!(
                "downloads on first run to {}",
                report.pdfium_cache_dir.display()
            )),
        }
    );
    println!(
        "  {} LLM key      {}",
        status(!report.llm_keys.is_empty()),
        if report.llm_keys.is_empty() {
            red("none set (GEMINI_API_KEY, OPENAI_API_KEY, …)")
        } else {
            report.llm_keys.join(", ")
        }
    );
    println!(
        "  {} ElevenLabs   {}",
        status(report.elevenlabs_key),
        if report.elevenlabs_key {
            "premium voice".to_string()
        } else {
            dim("not set (free Google voice)")
        }
    );
    println!("  {} font         {}", status(true), report.font);
}

/// Per-slide summary: title, duration, palette, bullets and script.
fn print_preview(output: &LectureOutput, mode: VideoMode) {
    println!("{}", bold("Lecture Content Preview"));
    for (i, slide) in output.slides.iter().enumerate() {
        let palette = Palette::for_slide(i);
        let duration = output
            .audio_clips
            .get(i)
            .map(|c| format!("{:.1}s", c.duration_secs))
            .unwrap_or_else(|| "-".to_string());

        println!();
        println!(
            "{} {}  {}",
            cyan(&format!("Slide {}:", i + 1)),
            bold(&slide.title),
            dim(&format!(
                "{duration}  ·  {} (bg {}, title {})",
                palette.name,
                Palette::hex(palette.background),
                Palette::hex(palette.title)
            )),
        );
        for point in &slide.bullet_points {
            println!("    • {point}");
        }
        println!("    {}", dim(&slide.teaching_script));
    }
    println!();

    let stats = &output.stats;
    match &output.video_path {
        Some(path) => {
            let length = stats
                .video_secs
                .map(|s| format!("{s:.1}s"))
                .unwrap_or_else(|| format!("~{:.1}s", stats.narration_secs));
            println!(
                "{}  {}  ({})",
                green("✔"),
                bold(&path.display().to_string()),
                length
            );
        }
        None => {
            println!(
                "{}  {}; {} audio clips exported:",
                yellow("⚠"),
                no_video_reason(mode),
                output.audio_clips.len()
            );
            for clip in &output.audio_clips {
                println!("    {}", clip.path.display());
            }
        }
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out  —  {}ms total",
        dim(&stats.input_tokens.to_string()),
        dim(&stats.output_tokens.to_string()),
        stats.total_duration_ms,
    );
}

/// Why a finished run produced audio clips instead of a video.
fn no_video_reason(mode: VideoMode) -> &'static str {
    match mode {
        VideoMode::AudioOnly => "Audio-only mode",
        VideoMode::Auto => "No video encoder",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_only_preview_does_not_blame_the_encoder() {
        assert_eq!(no_video_reason(VideoMode::AudioOnly), "Audio-only mode");
        assert_eq!(no_video_reason(VideoMode::Auto), "No video encoder");
    }
}
