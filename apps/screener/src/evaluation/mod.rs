// Resume evaluation pipeline.
// Implements: prompt construction, response validation, batch orchestration,
// ranking/classification and the JD summary.
// All model calls go through llm_client; nothing here talks HTTP directly.

pub mod batch;
pub mod error;
pub mod handlers;
pub mod jd_summary;
pub mod models;
pub mod prompt_builder;
pub mod prompts;
pub mod ranking;
pub mod schema;
pub mod tone;
pub mod validator;
