use std::sync::Arc;

use crate::config::Config;
use crate::evaluation::batch::Pipeline;
use crate::usage_log::CsvUsageLog;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Collaborators for batch runs: extractor, model client, usage sink.
    pub pipeline: Pipeline,
    /// The same sink as `pipeline.usage_log`, kept concrete for reading the tail back.
    pub usage_log: Arc<CsvUsageLog>,
}
