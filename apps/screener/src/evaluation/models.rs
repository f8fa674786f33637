//! Core data model for a batch evaluation run.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::evaluation::tone::RemarkTone;

/// Percentage weights for the four scoring dimensions. Must sum to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub experience: u32,
    pub skills: u32,
    pub education: u32,
    pub industry: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            experience: 40,
            skills: 20,
            education: 10,
            industry: 30,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> u32 {
        self.experience + self.skills + self.education + self.industry
    }

    pub fn is_balanced(&self) -> bool {
        self.total() == 100
    }
}

/// One resume's worth of input to the prompt builder.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub resume_text: String,
    pub job_description_text: String,
    pub weights: ScoringWeights,
    /// `None` when the caller's label was not recognised; renders the default instruction.
    pub tone: Option<RemarkTone>,
}

/// An uploaded resume as received from the caller.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub name: String,
    pub content: Bytes,
}

impl ResumeFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Per-dimension sub-scores reported by the model. Missing dimensions are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub experience: f64,
    pub skills: f64,
    pub education: f64,
    pub industry: f64,
}

impl fmt::Display for ScoreBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Exp: {}, Skills: {}, Edu: {}, Ind: {}",
            self.experience, self.skills, self.education, self.industry
        )
    }
}

/// A fully-decoded evaluation of one resume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub source_file: String,
    pub candidate_name: String,
    /// 0 – 100
    pub score: u32,
    pub breakdown: ScoreBreakdown,
    pub education: String,
    pub experience: String,
    pub skills_matched: Vec<String>,
    pub remark: String,
}

/// A resume that could not be evaluated, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub source_file: String,
    pub message: String,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_file, self.message)
    }
}
