//! Ranking and threshold classification of evaluated candidates.

use serde::Serialize;

use crate::evaluation::models::EvaluationResult;

/// Candidates scoring at or above this are accepted for the first round.
pub const ACCEPT_THRESHOLD: u32 = 60;

/// Display band for a score: strong (≥ 80), moderate (≥ 60), weak (< 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Moderate,
    Weak,
}

impl ScoreBand {
    pub fn for_score(score: u32) -> Self {
        if score >= 80 {
            ScoreBand::Strong
        } else if score >= ACCEPT_THRESHOLD {
            ScoreBand::Moderate
        } else {
            ScoreBand::Weak
        }
    }
}

/// A result positioned within its partition. `rank` starts at 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub band: ScoreBand,
    #[serde(flatten)]
    pub result: EvaluationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub accepted: Vec<RankedCandidate>,
    pub rejected: Vec<RankedCandidate>,
}

/// Sorts by score descending (stable: ties keep input order) and splits at `ACCEPT_THRESHOLD`.
/// Works on a copy; the caller's slice is untouched.
pub fn classify(results: &[EvaluationResult]) -> Classification {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    let (accepted, rejected): (Vec<_>, Vec<_>) = sorted
        .into_iter()
        .partition(|r| r.score >= ACCEPT_THRESHOLD);

    Classification {
        accepted: reindex(accepted),
        rejected: reindex(rejected),
    }
}

fn reindex(results: Vec<EvaluationResult>) -> Vec<RankedCandidate> {
    results
        .into_iter()
        .enumerate()
        .map(|(rank, result)| RankedCandidate {
            rank,
            band: ScoreBand::for_score(result.score),
            result,
        })
        .collect()
}
