//! Prompt construction. Pure and infallible: inputs are treated as opaque text.

use tracing::warn;

use crate::evaluation::models::{EvaluationRequest, ScoringWeights};
use crate::evaluation::prompts::EVALUATION_PROMPT_TEMPLATE;
use crate::evaluation::schema::render_schema;
use crate::evaluation::tone::{tone_instruction, RemarkTone};

/// Renders the evaluation prompt for one resume.
pub fn build_prompt(request: &EvaluationRequest) -> String {
    build(
        &request.resume_text,
        &request.job_description_text,
        &request.weights,
        request.tone,
    )
}

pub fn build(
    resume_text: &str,
    jd_text: &str,
    weights: &ScoringWeights,
    tone: Option<RemarkTone>,
) -> String {
    if !weights.is_balanced() {
        // Callers reject these before a batch starts; render anyway.
        warn!("Building prompt with weights totalling {}%", weights.total());
    }

    let experience = weights.experience.to_string();
    let skills = weights.skills.to_string();
    let education = weights.education.to_string();
    let industry = weights.industry.to_string();
    let schema = render_schema();

    render_template(
        EVALUATION_PROMPT_TEMPLATE,
        &[
            ("weight_experience", experience.as_str()),
            ("weight_skills", skills.as_str()),
            ("weight_education", education.as_str()),
            ("weight_industry", industry.as_str()),
            ("response_schema", schema.as_str()),
            ("tone_instruction", tone_instruction(tone)),
            ("resume_text", resume_text),
            ("jd_text", jd_text),
        ],
    )
}

/// Replaces `{key}` placeholders in one left-to-right pass.
/// Substituted values are never re-scanned, so braces inside resume or JD text survive as-is.
/// Unknown `{...}` sequences are copied through unchanged.
fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let substituted = after.find('}').and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, end))
        });

        match substituted {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
