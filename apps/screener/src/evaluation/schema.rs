//! The model response schema: one definition shared by the prompt and the decoder.
//!
//! `RESPONSE_SCHEMA` is rendered into the prompt's "Return ONLY JSON" block.
//! `ModelEvaluation` decodes the reply. Both list the same keys; the tests at
//! the bottom of this file fail if either side drifts.
//!
//! Decoding is lenient by policy: missing or mistyped fields are completed with
//! defaults (`0`, `"N/A"`, empty list) instead of rejecting the record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::evaluation::models::{EvaluationResult, ScoreBreakdown};

/// Placeholder used for missing text fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// How a field's example value is shown to the model.
#[derive(Debug, Clone, Copy)]
pub enum Hint {
    /// Rendered inside double quotes.
    Text(&'static str),
    /// Rendered verbatim, e.g. a bare placeholder or a JSON array literal.
    Bare(&'static str),
    /// Rendered as a nested object.
    Object(&'static [SchemaField]),
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaField {
    pub key: &'static str,
    pub hint: Hint,
}

pub const BREAKDOWN_FIELDS: &[SchemaField] = &[
    SchemaField {
        key: "experience",
        hint: Hint::Bare("score_from_experience"),
    },
    SchemaField {
        key: "skills",
        hint: Hint::Bare("score_from_skills"),
    },
    SchemaField {
        key: "education",
        hint: Hint::Bare("score_from_education"),
    },
    SchemaField {
        key: "industry",
        hint: Hint::Bare("score_from_industry"),
    },
];

pub const RESPONSE_SCHEMA: &[SchemaField] = &[
    SchemaField {
        key: "name",
        hint: Hint::Text("Full name"),
    },
    SchemaField {
        key: "score",
        hint: Hint::Bare("Final score out of 100"),
    },
    SchemaField {
        key: "score_breakdown",
        hint: Hint::Object(BREAKDOWN_FIELDS),
    },
    SchemaField {
        key: "education",
        hint: Hint::Text("Degree and college"),
    },
    SchemaField {
        key: "experience",
        hint: Hint::Text(
            "Total relevant years of experience in the given field in JD (e.g. paints/FMCG/chemicals), plus role-wise company breakdown",
        ),
    },
    SchemaField {
        key: "skills_matched",
        hint: Hint::Bare(r#"["skill1", "skill2"]"#),
    },
    SchemaField {
        key: "remark",
        hint: Hint::Text(
            "30-word summary on fitment and verdict about why they are either Accepted OR Rejected",
        ),
    },
];

/// Renders `RESPONSE_SCHEMA` as the JSON-shaped example block embedded in the prompt.
pub fn render_schema() -> String {
    let mut out = String::from("{\n");
    render_fields(RESPONSE_SCHEMA, 2, &mut out);
    out.push('}');
    out
}

fn render_fields(fields: &[SchemaField], indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for (i, field) in fields.iter().enumerate() {
        let sep = if i + 1 < fields.len() { "," } else { "" };
        match field.hint {
            Hint::Text(text) => out.push_str(&format!("{pad}\"{}\": \"{text}\"{sep}\n", field.key)),
            Hint::Bare(text) => out.push_str(&format!("{pad}\"{}\": {text}{sep}\n", field.key)),
            Hint::Object(nested) => {
                out.push_str(&format!("{pad}\"{}\": {{\n", field.key));
                render_fields(nested, indent + 4, out);
                out.push_str(&format!("{pad}}}{sep}\n"));
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Decoder
// ────────────────────────────────────────────────────────────────────────────

/// The model's reply, decoded with per-field defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: u32,
    #[serde(default, deserialize_with = "lenient_breakdown")]
    pub score_breakdown: ScoreBreakdown,
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub education: String,
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub experience: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub skills_matched: Vec<String>,
    #[serde(default = "not_available", deserialize_with = "lenient_text")]
    pub remark: String,
}

impl Default for ModelEvaluation {
    fn default() -> Self {
        Self {
            name: not_available(),
            score: 0,
            score_breakdown: ScoreBreakdown::default(),
            education: not_available(),
            experience: not_available(),
            skills_matched: Vec::new(),
            remark: not_available(),
        }
    }
}

impl ModelEvaluation {
    pub fn into_result(self, source_file: impl Into<String>) -> EvaluationResult {
        EvaluationResult {
            source_file: source_file.into(),
            candidate_name: self.name,
            score: self.score,
            breakdown: self.score_breakdown,
            education: self.education,
            experience: self.experience,
            skills_matched: self.skills_matched,
            remark: self.remark,
        }
    }
}

/// Wire shape of `score_breakdown`; every dimension defaults to 0.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BreakdownWire {
    #[serde(default, deserialize_with = "lenient_number")]
    experience: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    skills: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    education: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    industry: f64,
}

impl From<BreakdownWire> for ScoreBreakdown {
    fn from(w: BreakdownWire) -> Self {
        ScoreBreakdown {
            experience: w.experience,
            skills: w.skills,
            education: w.education,
            industry: w.industry,
        }
    }
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(number_from_value(&value).unwrap_or(0.0))
}

fn lenient_score<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(number_from_value(&value)
        .map(|n| n.trunc().clamp(0.0, 100.0) as u32)
        .unwrap_or(0))
}

fn lenient_breakdown<'de, D: Deserializer<'de>>(d: D) -> Result<ScoreBreakdown, D::Error> {
    let value = Value::deserialize(d)?;
    let wire = match value {
        Value::Object(_) => serde_json::from_value::<BreakdownWire>(value).unwrap_or_default(),
        _ => BreakdownWire::default(),
    };
    Ok(wire.into())
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Null => not_available(),
        Value::String(s) => s,
        Value::Array(items) => items
            .iter()
            .filter_map(text_item)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    })
}

fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(text_item).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    })
}

fn text_item(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
