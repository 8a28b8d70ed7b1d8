//! Pipeline stages for PDF-to-lecture generation.
//!
//! Each submodule implements one transformation step, so each can be tested
//! alone and a collaborator (speech service, encoder) can be swapped without
//! touching its neighbours.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ planner ──▶ narrate ──▶ render ──▶ encode
//! (URL/path) (pdfium)   (LLM)      (TTS+probe)  (PNG)    (ffmpeg)
//! ```
//!
//! 1. [`input`]   — read a local file or download a URL into memory
//! 2. [`extract`] — concatenate page text; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`planner`] — one LLM call producing strictly-parsed slides
//! 4. [`narrate`] — per-slide speech via [`speech`] backends, duration via
//!    [`audio`]
//! 5. [`render`]  — draw each slide with its [`palette`] and [`font`]
//! 6. [`encode`]  — still image + narration → segment, segments → video

pub mod audio;
pub mod encode;
pub mod extract;
pub mod font;
pub mod input;
pub mod narrate;
pub mod palette;
pub mod planner;
pub mod render;
pub mod speech;
