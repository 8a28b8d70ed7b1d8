//! Slide planning: source text → `Vec<Slide>` via one LLM call.
//!
//! The model is asked for a JSON object; whatever comes back has its
//! Markdown code fences removed and is parsed strictly. There is no repair
//! and no retry. A plan with one bad slide is rejected whole, so callers
//! either get complete slides or an error.

use crate::config::{LectureConfig, DEFAULT_PROVIDER};
use crate::error::LectureError;
use crate::output::Slide;
use crate::pipeline::extract::truncate_chars;
use crate::prompts::slide_plan_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Slides plus token usage of the planning call.
#[derive(Debug, Clone)]
pub struct SlidePlan {
    pub slides: Vec<Slide>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Deserialize)]
struct PlanDocument {
    slides: Vec<Slide>,
}

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json|```").expect("static regex"));

/// Remove every ```` ```json ```` / ```` ``` ```` marker and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    RE_CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Parse a model response into slides.
///
/// Errors when the text is not JSON, lacks `slides`, or any slide lacks a
/// field. An empty `slides` array is [`LectureError::NoSlidesGenerated`].
pub fn parse_slide_plan(raw: &str) -> Result<Vec<Slide>, LectureError> {
    let cleaned = strip_code_fences(raw);
    let doc: PlanDocument =
        serde_json::from_str(&cleaned).map_err(|e| LectureError::SlidePlanInvalid {
            detail: e.to_string(),
        })?;
    if doc.slides.is_empty() {
        return Err(LectureError::NoSlidesGenerated);
    }
    Ok(doc.slides)
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Gemini** when `GEMINI_API_KEY` is set, since the default model is a
///    Gemini model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &LectureConfig) -> Result<Arc<dyn LLMProvider>, LectureError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if std::env::var("GEMINI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider(DEFAULT_PROVIDER, config.model_or_default());
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| LectureError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY (default), OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;
    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, LectureError> {
    info!("Using LLM provider '{}' with model '{}'", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        LectureError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Ask the model for a slide plan covering the start of `text`.
pub async fn plan_slides(
    provider: &Arc<dyn LLMProvider>,
    text: &str,
    config: &LectureConfig,
) -> Result<SlidePlan, LectureError> {
    let excerpt = truncate_chars(text, config.max_source_chars);
    debug!(
        "Planning from {} of {} chars",
        excerpt.chars().count(),
        text.chars().count()
    );

    let messages = vec![ChatMessage::user(slide_plan_prompt(excerpt))];
    let options = build_options(config);

    let call = provider.chat(&messages, Some(&options));
    let response = tokio::time::timeout(Duration::from_secs(config.api_timeout_secs), call)
        .await
        .map_err(|_| LectureError::LlmTimeout {
            secs: config.api_timeout_secs,
        })?
        .map_err(|e| LectureError::LlmApiError {
            message: e.to_string(),
        })?;

    debug!(
        "Plan: {} input tokens, {} output tokens",
        response.prompt_tokens, response.completion_tokens
    );

    let slides = parse_slide_plan(&response.content).inspect_err(|e| {
        warn!("Error generating slides: {}", e);
    })?;
    info!("Planned {} slides", slides.len());

    Ok(SlidePlan {
        slides,
        input_tokens: response.prompt_tokens as u64,
        output_tokens: response.completion_tokens as u64,
    })
}

fn build_options(config: &LectureConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{"slides":[
        {"title":"Gravity","bullet_points":["Mass attracts mass"],"teaching_script":"Gravity pulls objects toward each other."},
        {"title":"Orbits","bullet_points":["Falling around","Balance of speed"],"teaching_script":"An orbit is continuous free fall."}
    ]}"#;

    #[test]
    fn parses_plain_json() {
        let slides = parse_slide_plan(GOOD).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].bullet_points, vec!["Falling around", "Balance of speed"]);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{GOOD}\n```\n");
        assert_eq!(parse_slide_plan(&fenced).unwrap().len(), 2);

        let bare_fence = format!("```\n{GOOD}\n```");
        assert_eq!(parse_slide_plan(&bare_fence).unwrap().len(), 2);
    }

    #[test]
    fn truncated_json_yields_no_slides() {
        let truncated = &GOOD[..GOOD.len() / 2];
        let err = parse_slide_plan(truncated).unwrap_err();
        assert!(matches!(err, LectureError::SlidePlanInvalid { .. }));
    }

    #[test]
    fn one_incomplete_slide_rejects_the_plan() {
        let partial = r#"{"slides":[
            {"title":"Good","bullet_points":["a"],"teaching_script":"s"},
            {"title":"No script","bullet_points":["b"]}
        ]}"#;
        let err = parse_slide_plan(partial).unwrap_err();
        match err {
            LectureError::SlidePlanInvalid { detail } => {
                assert!(detail.contains("teaching_script"), "got: {detail}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_slides_key_is_invalid() {
        let err = parse_slide_plan(r#"{"pages":[]}"#).unwrap_err();
        assert!(matches!(err, LectureError::SlidePlanInvalid { .. }));
    }

    #[test]
    fn empty_plan_is_reported_separately() {
        let err = parse_slide_plan(r#"{"slides":[]}"#).unwrap_err();
        assert!(matches!(err, LectureError::NoSlidesGenerated));
    }

    #[test]
    fn prose_answer_is_invalid() {
        let err = parse_slide_plan("Sure! Here are your slides: ...").unwrap_err();
        assert!(matches!(err, LectureError::SlidePlanInvalid { .. }));
    }

    #[test]
    fn strip_code_fences_trims() {
        assert_eq!(strip_code_fences("  ```json\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&LectureConfig::default());
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(8192));
    }
}
