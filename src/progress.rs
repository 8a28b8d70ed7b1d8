//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn LectureProgressCallback>`] via
//! [`crate::config::LectureConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages. Stages and slides are
//! processed strictly in order, so events arrive in order too.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2video::{AudioClip, LectureConfig, LectureProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Narrated(AtomicUsize);
//!
//! impl LectureProgressCallback for Narrated {
//!     fn on_slide_narrated(&self, index: usize, total: usize, clip: &AudioClip) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("slide {}/{}: {:.1}s", index + 1, total, clip.duration_secs);
//!     }
//! }
//!
//! let config = LectureConfig::builder()
//!     .progress_callback(Arc::new(Narrated(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::{SpeechError, Stage};
use crate::output::{AudioClip, RunStats};
use std::sync::Arc;

/// Receives pipeline events. All methods default to no-ops.
pub trait LectureProgressCallback: Send + Sync {
    /// A stage is about to begin.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// The planner produced `slide_count` slides.
    fn on_slides_planned(&self, slide_count: usize) {
        let _ = slide_count;
    }

    /// The premium backend failed for slide `index` (0-based); the free
    /// backend is tried next.
    fn on_narration_fallback(&self, index: usize, error: &SpeechError) {
        let _ = (index, error);
    }

    /// Slide `index` (0-based) has its narration clip.
    fn on_slide_narrated(&self, index: usize, total: usize, clip: &AudioClip) {
        let _ = (index, total, clip);
    }

    /// Slide `index` (0-based) has been rendered and encoded into a segment.
    fn on_segment_encoded(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// The run finished successfully.
    fn on_run_complete(&self, stats: &RunStats) {
        let _ = stats;
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl LectureProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::LectureConfig`].
pub type ProgressCallback = Arc<dyn LectureProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{DurationSource, SpeechBackendKind};
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl LectureProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("stage:{stage}"));
        }

        fn on_slide_narrated(&self, index: usize, total: usize, _clip: &AudioClip) {
            self.events
                .lock()
                .unwrap()
                .push(format!("narrated:{}/{}", index + 1, total));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Extract);
        cb.on_slides_planned(4);
        cb.on_segment_encoded(0, 4);
        cb.on_run_complete(&RunStats::default());
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        let clip = AudioClip {
            path: PathBuf::from("slide_0_audio.mp3"),
            duration_secs: 4.2,
            slide_index: 0,
            backend: SpeechBackendKind::GoogleTranslate,
            duration_source: DurationSource::Measured,
        };

        rec.on_stage_start(Stage::Narrate);
        rec.on_slide_narrated(0, 2, &clip);
        rec.on_segment_encoded(0, 2);

        let events = rec.events.lock().unwrap();
        assert_eq!(*events, vec!["stage:narration", "narrated:1/2"]);
    }
}
