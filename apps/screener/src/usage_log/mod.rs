//! Usage log: append-only CSV record of batch runs, one row per run.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluation::batch::RunSummary;

const USER_ACTION: &str = "Resume Batch Analysis";

/// Sink for run summaries. Each batch run appends exactly one entry.
pub trait UsageLogger: Send + Sync {
    fn append(&self, summary: &RunSummary) -> Result<()>;
}

/// One CSV row. Column order is the field order here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogRow {
    pub run_id: Uuid,
    pub timestamp: String,
    pub user_action: String,
    pub number_of_resumes: usize,
    pub jd_length_words: usize,
    pub errors_occurred: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub duration_sec: f64,
    pub error_message: String,
}

impl From<&RunSummary> for UsageLogRow {
    fn from(summary: &RunSummary) -> Self {
        Self {
            run_id: summary.run_id,
            timestamp: summary.timestamp.to_rfc3339(),
            user_action: USER_ACTION.to_string(),
            number_of_resumes: summary.resume_count,
            jd_length_words: summary.jd_word_count,
            errors_occurred: summary.failure_count > 0,
            success_count: summary.success_count,
            failure_count: summary.failure_count,
            duration_sec: summary.duration_seconds,
            error_message: summary.error_messages.join("; "),
        }
    }
}

/// CSV file sink. Writes the header only when creating the file.
/// Appends are serialized through a mutex so concurrent runs never interleave rows.
pub struct CsvUsageLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvUsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the last `limit` rows in file order. A missing file yields no rows.
    pub fn tail(&self, limit: usize) -> Result<Vec<UsageLogRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open usage log {}", self.path.display()))?;

        // Only the last `limit` rows are held while streaming through the file.
        let mut rows: VecDeque<UsageLogRow> = VecDeque::new();
        for row in reader.deserialize::<UsageLogRow>() {
            let row = row.context("Usage log contains a malformed row")?;
            if limit == 0 {
                continue;
            }
            if rows.len() == limit {
                rows.pop_front();
            }
            rows.push_back(row);
        }
        Ok(rows.into())
    }
}

impl UsageLogger for CsvUsageLog {
    fn append(&self, summary: &RunSummary) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("usage log lock poisoned"))?;

        let exists = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open usage log {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!exists)
            .from_writer(file);
        writer.serialize(UsageLogRow::from(summary))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(failures: Vec<&str>) -> RunSummary {
        let failure_count = failures.len();
        RunSummary {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            resume_count: 3,
            jd_word_count: 120,
            success_count: 3 - failure_count,
            failure_count,
            duration_seconds: 4.25,
            error_messages: failures.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvUsageLog::new(dir.path().join("usage_log.csv"));

        log.append(&summary(vec![])).unwrap();
        log.append(&summary(vec!["b.pdf: timeout"])).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("run_id,timestamp,user_action,"));
        assert_eq!(contents.matches("run_id").count(), 1);
    }

    #[test]
    fn test_zero_failures_row() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvUsageLog::new(dir.path().join("usage_log.csv"));
        log.append(&summary(vec![])).unwrap();

        let rows = log.tail(50).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].failure_count, 0);
        assert!(!rows[0].errors_occurred);
        assert_eq!(rows[0].error_message, "");
        assert_eq!(rows[0].user_action, USER_ACTION);
    }

    #[test]
    fn test_error_messages_joined() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvUsageLog::new(dir.path().join("usage_log.csv"));
        log.append(&summary(vec!["a.pdf: bad", "c.docx: worse, really"]))
            .unwrap();

        let rows = log.tail(10).unwrap();
        assert!(rows[0].errors_occurred);
        assert_eq!(rows[0].error_message, "a.pdf: bad; c.docx: worse, really");
        assert_eq!(rows[0].duration_sec, 4.25);
    }

    #[test]
    fn test_tail_returns_last_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvUsageLog::new(dir.path().join("usage_log.csv"));
        let summaries: Vec<RunSummary> = (0..5).map(|_| summary(vec![])).collect();
        for s in &summaries {
            log.append(s).unwrap();
        }

        let rows = log.tail(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].run_id, summaries[3].run_id);
        assert_eq!(rows[1].run_id, summaries[4].run_id);
    }

    #[test]
    fn test_tail_limit_edges() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvUsageLog::new(dir.path().join("usage_log.csv"));
        let summaries: Vec<RunSummary> = (0..3).map(|_| summary(vec![])).collect();
        for s in &summaries {
            log.append(s).unwrap();
        }

        assert!(log.tail(0).unwrap().is_empty());
        let all = log.tail(usize::MAX).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].run_id, summaries[0].run_id);
        assert_eq!(log.tail(1).unwrap()[0].run_id, summaries[2].run_id);
    }

    #[test]
    fn test_tail_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvUsageLog::new(dir.path().join("absent.csv"));
        assert!(log.tail(50).unwrap().is_empty());
    }
}
