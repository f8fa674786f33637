//! Axum route handlers for the Evaluation API.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::evaluation::batch::{run_batch, BatchInput, RunSummary};
use crate::evaluation::jd_summary::{summarize_jd, JdSummary};
use crate::evaluation::models::{BatchError, ResumeFile, ScoringWeights};
use crate::evaluation::ranking::{classify, RankedCandidate};
use crate::evaluation::tone::RemarkTone;
use crate::state::AppState;
use crate::usage_log::UsageLogRow;

const DEFAULT_USAGE_LIMIT: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub summary: RunSummary,
    pub jd_summary: JdSummary,
    pub accepted: Vec<RankedCandidate>,
    pub rejected: Vec<RankedCandidate>,
    pub errors: Vec<BatchError>,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub rows: Vec<UsageLogRow>,
}

/// Fields collected from the multipart evaluation form.
#[derive(Debug, Default)]
struct EvaluationForm {
    jd_text: String,
    weights: ScoringWeights,
    tone_label: Option<String>,
    files: Vec<ResumeFile>,
}

impl EvaluationForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = EvaluationForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "resumes" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content = field.bytes().await.map_err(|e| {
                        AppError::Validation(format!("Failed to read {file_name}: {e}"))
                    })?;
                    // Browsers send an empty part when no file was chosen.
                    if file_name.is_empty() && content.is_empty() {
                        continue;
                    }
                    form.files.push(ResumeFile::new(file_name, content));
                }
                "jd_text" => form.jd_text = read_text(field, &name).await?,
                "tone" => form.tone_label = Some(read_text(field, &name).await?),
                "weight_experience" => form.weights.experience = read_weight(field, &name).await?,
                "weight_skills" => form.weights.skills = read_weight(field, &name).await?,
                "weight_education" => form.weights.education = read_weight(field, &name).await?,
                "weight_industry" => form.weights.industry = read_weight(field, &name).await?,
                _ => {}
            }
        }

        Ok(form)
    }

    /// Missing tone means the form default (Professional); an unrecognised label
    /// falls back to the default instruction.
    fn tone(&self) -> Option<RemarkTone> {
        match &self.tone_label {
            None => Some(RemarkTone::Professional),
            Some(label) => RemarkTone::from_label(label),
        }
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))
}

async fn read_weight(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<u32, AppError> {
    let raw = read_text(field, name).await?;
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|w| *w <= 100)
        .ok_or_else(|| {
            AppError::Validation(format!("{name} must be a whole number between 0 and 100"))
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/evaluations
///
/// Multipart form: `jd_text`, `weight_experience`, `weight_skills`, `weight_education`,
/// `weight_industry`, `tone`, and one or more `resumes` files (.pdf / .docx).
/// Returns the run summary, the JD digest, ranked accepted/rejected candidates and
/// per-file errors.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EvaluateResponse>, AppError> {
    let form = EvaluationForm::read(&mut multipart).await?;
    let tone = form.tone();
    let jd_summary = summarize_jd(&form.jd_text);

    let input = BatchInput {
        files: form.files,
        jd_text: form.jd_text,
        weights: form.weights,
        tone,
    };

    let outcome = run_batch(input, &state.pipeline).await?;
    let classification = classify(&outcome.results);
    info!(
        "Run {}: {} accepted, {} rejected, {} errors",
        outcome.summary.run_id,
        classification.accepted.len(),
        classification.rejected.len(),
        outcome.errors.len()
    );

    Ok(Json(EvaluateResponse {
        summary: outcome.summary,
        jd_summary,
        accepted: classification.accepted,
        rejected: classification.rejected,
        errors: outcome.errors,
    }))
}

/// GET /api/v1/usage?limit=N
///
/// Returns the last N usage-log rows (default 50).
pub async fn handle_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_USAGE_LIMIT);
    let usage_log = Arc::clone(&state.usage_log);
    let rows = tokio::task::spawn_blocking(move || usage_log.tail(limit))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("usage log read task failed: {e}")))??;
    Ok(Json(UsageResponse { rows }))
}
