//! Remark tone: maps the caller's tone selection to the instruction line
//! embedded in the evaluation prompt.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Instruction used when the caller's tone label is not recognised.
pub const DEFAULT_TONE_INSTRUCTION: &str = "Use a professional tone.";

/// How the model should phrase the `remark` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemarkTone {
    Professional,
    Critical,
    Blunt,
}

impl RemarkTone {
    pub fn instruction(&self) -> &'static str {
        match self {
            RemarkTone::Professional => "Use a neutral and formal tone.",
            RemarkTone::Critical => "Be sharply evaluative, pointing out weaknesses clearly.",
            RemarkTone::Blunt => "Give a direct, no-nonsense assessment without sugarcoating.",
        }
    }

    /// Parses a caller-supplied label, returning `None` for anything unrecognised.
    pub fn from_label(label: &str) -> Option<Self> {
        label.parse().ok()
    }
}

impl FromStr for RemarkTone {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(RemarkTone::Professional),
            "critical" => Ok(RemarkTone::Critical),
            "blunt" => Ok(RemarkTone::Blunt),
            _ => Err(()),
        }
    }
}

/// Resolves the instruction line for an optional tone.
pub fn tone_instruction(tone: Option<RemarkTone>) -> &'static str {
    tone.map(|t| t.instruction())
        .unwrap_or(DEFAULT_TONE_INSTRUCTION)
}
