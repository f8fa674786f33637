//! JD summary: a deterministic, regex-based digest of a job description.
//! Informational only; it never feeds into scoring.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

const NOT_SPECIFIED: &str = "Not specified";

/// Skills looked for in the JD, in reporting order.
const COMMON_SKILLS: &[&str] = &[
    "python",
    "sql",
    "excel",
    "tableau",
    "power bi",
    "machine learning",
    "marketing",
    "branding",
    "data analysis",
    "communication",
    "leadership",
    "sales",
    "negotiation",
    "strategy",
    "presentation",
    "problem-solving",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JdSummary {
    pub experience_range: String,
    pub required_skills: String,
    pub qualification: String,
}

fn experience_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*(?:to|–|-)\s*(\d+)\s*years").expect("valid regex"))
}

fn experience_single_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+\+?\s*years?)").expect("valid regex"))
}

fn qualification_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)qualification\s*[:\-]?\s*([^\n,]+)").expect("valid regex"))
}

pub fn summarize_jd(jd_text: &str) -> JdSummary {
    JdSummary {
        experience_range: experience_range(jd_text),
        required_skills: required_skills(jd_text),
        qualification: qualification(jd_text),
    }
}

fn experience_range(jd_text: &str) -> String {
    if let Some(caps) = experience_range_re().captures(jd_text) {
        return format!("{} to {} years", &caps[1], &caps[2]);
    }
    experience_single_re()
        .captures(jd_text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

fn qualification(jd_text: &str) -> String {
    qualification_re()
        .captures(jd_text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

fn required_skills(jd_text: &str) -> String {
    let lower = jd_text.to_lowercase();
    let found: Vec<&str> = COMMON_SKILLS
        .iter()
        .copied()
        .filter(|skill| lower.contains(skill))
        .collect();
    if found.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        found.join(", ")
    }
}
