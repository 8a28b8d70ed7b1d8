//! Prompt text for slide planning.
//!
//! Kept in one place so prompt changes never touch the planner's parsing or
//! timeout logic, and so tests can inspect the exact request wording.

/// Instructions placed before the source text.
pub const SLIDE_PLAN_INSTRUCTIONS: &str = r#"Convert this text into presentation slides with teaching scripts. Return JSON format:
{
    "slides": [
        {
            "title": "Slide Title",
            "bullet_points": ["Point 1", "Point 2", "Point 3"],
            "teaching_script": "Brief explanation of this slide content in 50-80 words."
        }
    ]
}

Make each teaching_script concise (50-80 words) and educational.
Every slide must contain all three fields. Output only the JSON object."#;

/// Build the planning prompt around an already truncated source excerpt.
pub fn slide_plan_prompt(source_excerpt: &str) -> String {
    format!("{SLIDE_PLAN_INSTRUCTIONS}\n\nText: {source_excerpt}")
}
