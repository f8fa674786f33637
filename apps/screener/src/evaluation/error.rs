//! Error taxonomy for a single resume's trip through the pipeline, plus the
//! batch-level precondition failures that stop a run before it starts.

use thiserror::Error;

/// Number of characters of raw model output kept for diagnostics.
pub const DIAGNOSTIC_PREFIX_CHARS: usize = 500;

/// Everything that can go wrong while evaluating one resume.
/// The orchestrator converts each of these into a `BatchError`; none of them abort a batch.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Unsupported file format: {file_name} (expected .pdf or .docx)")]
    UnsupportedFormat { file_name: String },

    #[error("Could not extract text: {0}")]
    Extraction(String),

    #[error("Evaluation API request failed: {0}")]
    Transport(String),

    #[error("Evaluation API returned an unexpected envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Could not parse JSON from model response: {prefix}...")]
    UnparsableResponse { prefix: String },
}

impl EvaluationError {
    /// Builds an `UnparsableResponse` carrying a bounded prefix of the raw model text.
    pub fn unparsable(raw: &str) -> Self {
        EvaluationError::UnparsableResponse {
            prefix: raw.chars().take(DIAGNOSTIC_PREFIX_CHARS).collect(),
        }
    }
}

/// Preconditions checked before any resume is processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchRejected {
    #[error("Scoring weights total {total}%. Adjust to equal 100.")]
    UnbalancedWeights { total: u32 },

    #[error("Job description cannot be empty")]
    MissingJobDescription,

    #[error("At least one resume file is required")]
    NoResumes,
}
