//! Response validation: pulls the JSON object out of raw model text and decodes it
//! through the shared schema.

use serde::Deserialize;
use serde_json::Value;

use crate::evaluation::error::EvaluationError;
use crate::evaluation::models::EvaluationResult;
use crate::evaluation::schema::ModelEvaluation;

/// Decodes raw model text into a `ModelEvaluation`.
///
/// The span from the first `{` to the last `}` is taken greedily and parsed as a JSON
/// object; anything around it (prose, code fences) is ignored. Missing fields are
/// completed with defaults rather than rejected.
pub fn parse_response(raw: &str) -> Result<ModelEvaluation, EvaluationError> {
    let span = json_span(raw).ok_or_else(|| EvaluationError::unparsable(raw))?;
    // Going through `Value` first keeps the last of any repeated keys.
    let value: Value = serde_json::from_str(span).map_err(|_| EvaluationError::unparsable(raw))?;
    ModelEvaluation::deserialize(value).map_err(|_| EvaluationError::unparsable(raw))
}

/// `parse_response` followed by tagging with the resume's file name.
pub fn parse_evaluation(raw: &str, source_file: &str) -> Result<EvaluationResult, EvaluationError> {
    parse_response(raw).map(|model| model.into_result(source_file))
}

fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
