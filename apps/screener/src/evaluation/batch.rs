//! Batch orchestration: evaluates every resume in a run independently and
//! summarizes the outcome.
//!
//! Flow per resume: extract text → build prompt → call model → validate response.
//! A failure at any step becomes a `BatchError` for that file only; the rest of
//! the batch carries on. Results and errors come back in input order no matter
//! which tasks finish first.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::evaluation::error::{BatchRejected, EvaluationError};
use crate::evaluation::models::{
    BatchError, EvaluationRequest, EvaluationResult, ResumeFile, ScoringWeights,
};
use crate::evaluation::prompt_builder::build_prompt;
use crate::evaluation::tone::RemarkTone;
use crate::evaluation::validator::parse_evaluation;
use crate::extract::TextExtractor;
use crate::llm_client::EvaluationClient;
use crate::usage_log::UsageLogger;

/// Default number of resumes evaluated concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Caller inputs for one batch run.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub files: Vec<ResumeFile>,
    pub jd_text: String,
    pub weights: ScoringWeights,
    pub tone: Option<RemarkTone>,
}

/// Collaborator handles used by a run.
#[derive(Clone)]
pub struct Pipeline {
    pub extractor: Arc<dyn TextExtractor>,
    pub client: Arc<dyn EvaluationClient>,
    pub usage_log: Arc<dyn UsageLogger>,
    pub max_concurrency: usize,
}

/// Aggregate record of one batch run, written to the usage log exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub resume_count: usize,
    pub jd_word_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub duration_seconds: f64,
    pub error_messages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub results: Vec<EvaluationResult>,
    pub errors: Vec<BatchError>,
    pub summary: RunSummary,
}

/// Rejects a batch that cannot be run at all. Nothing is evaluated or logged when this fails.
pub fn check_preconditions(input: &BatchInput) -> Result<(), BatchRejected> {
    if !input.weights.is_balanced() {
        return Err(BatchRejected::UnbalancedWeights {
            total: input.weights.total(),
        });
    }
    if input.jd_text.trim().is_empty() {
        return Err(BatchRejected::MissingJobDescription);
    }
    if input.files.is_empty() {
        return Err(BatchRejected::NoResumes);
    }
    Ok(())
}

/// Runs the full pipeline over every file in `input`.
///
/// At most `pipeline.max_concurrency` resumes are in flight at once. Each task is
/// tagged with its input index and outcomes are re-sorted by that index before
/// being split into results and errors.
pub async fn run_batch(
    input: BatchInput,
    pipeline: &Pipeline,
) -> Result<BatchOutcome, BatchRejected> {
    check_preconditions(&input)?;

    let run_id = Uuid::new_v4();
    let started = Instant::now();
    let resume_count = input.files.len();
    let jd_word_count = input.jd_text.split_whitespace().count();
    info!(
        "Batch {run_id}: evaluating {resume_count} resumes (concurrency {})",
        pipeline.max_concurrency
    );

    let jd_text: Arc<str> = Arc::from(input.jd_text);
    let semaphore = Arc::new(Semaphore::new(pipeline.max_concurrency.max(1)));

    let mut handles = Vec::with_capacity(resume_count);
    for (index, file) in input.files.into_iter().enumerate() {
        let name = file.name.clone();
        let semaphore = Arc::clone(&semaphore);
        let jd_text = Arc::clone(&jd_text);
        let extractor = Arc::clone(&pipeline.extractor);
        let client = Arc::clone(&pipeline.client);
        let weights = input.weights;
        let tone = input.tone;

        let handle = tokio::spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    evaluate_one(file, jd_text, weights, tone, extractor, client).await
                }
                Err(e) => Err(EvaluationError::Transport(format!("worker pool closed: {e}"))),
            };
            (index, outcome)
        });
        handles.push((index, name, handle));
    }

    let mut outcomes: Vec<(usize, Result<EvaluationResult, BatchError>)> =
        Vec::with_capacity(resume_count);
    for (index, name, handle) in handles {
        let tagged = match handle.await {
            Ok((index, outcome)) => (index, outcome.map_err(|e| batch_error(&name, e))),
            Err(e) => (
                index,
                Err(BatchError {
                    source_file: name,
                    message: format!("evaluation task failed: {e}"),
                }),
            ),
        };
        outcomes.push(tagged);
    }
    outcomes.sort_by_key(|(index, _)| *index);

    let mut results = Vec::new();
    let mut errors = Vec::new();
    for (_, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                debug!("Batch {run_id}: {} scored {}", result.source_file, result.score);
                results.push(result);
            }
            Err(error) => {
                warn!("Batch {run_id}: {error}");
                errors.push(error);
            }
        }
    }

    let summary = RunSummary {
        run_id,
        timestamp: Utc::now(),
        resume_count,
        jd_word_count,
        success_count: results.len(),
        failure_count: errors.len(),
        duration_seconds: round_to_centis(started.elapsed().as_secs_f64()),
        error_messages: errors.iter().map(ToString::to_string).collect(),
    };

    info!(
        "Batch {run_id} finished in {}s: {} succeeded, {} failed",
        summary.duration_seconds, summary.success_count, summary.failure_count
    );

    let usage_log = Arc::clone(&pipeline.usage_log);
    let entry = summary.clone();
    match tokio::task::spawn_blocking(move || usage_log.append(&entry)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Batch {run_id}: failed to write usage log: {e:#}"),
        Err(e) => warn!("Batch {run_id}: usage log task failed: {e}"),
    }

    Ok(BatchOutcome {
        results,
        errors,
        summary,
    })
}

async fn evaluate_one(
    file: ResumeFile,
    jd_text: Arc<str>,
    weights: ScoringWeights,
    tone: Option<RemarkTone>,
    extractor: Arc<dyn TextExtractor>,
    client: Arc<dyn EvaluationClient>,
) -> Result<EvaluationResult, EvaluationError> {
    let source_file = file.name.clone();

    let resume_text = tokio::task::spawn_blocking(move || extractor.extract(&file))
        .await
        .map_err(|e| EvaluationError::Extraction(format!("extraction task failed: {e}")))??;

    let request = EvaluationRequest {
        resume_text,
        job_description_text: jd_text.to_string(),
        weights,
        tone,
    };
    let prompt = build_prompt(&request);
    let raw = client.evaluate(&prompt).await?;
    parse_evaluation(&raw, &source_file)
}

fn batch_error(source_file: &str, error: EvaluationError) -> BatchError {
    BatchError {
        source_file: source_file.to_string(),
        message: error.to_string(),
    }
}

fn round_to_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    /// Uses the file content as the resume text. Content "FAIL" is an extraction
    /// error and "PANIC" panics inside the extractor.
    struct FakeExtractor;

    impl TextExtractor for FakeExtractor {
        fn extract(&self, file: &ResumeFile) -> Result<String, EvaluationError> {
            let text = String::from_utf8_lossy(&file.content).to_string();
            match text.as_str() {
                "FAIL" => Err(EvaluationError::Extraction("corrupt file".to_string())),
                "PANIC" => panic!("extractor blew up"),
                _ => Ok(text),
            }
        }
    }

    /// Replies based on markers in the resume text:
    /// `score=N` → valid JSON with that score, `TRANSPORT` → transport error,
    /// `GARBAGE` → text with no JSON, `sleep=N` → delays N milliseconds first.
    #[derive(Default)]
    struct FakeClient {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    fn marker<'a>(prompt: &'a str, key: &str) -> Option<&'a str> {
        let start = prompt.find(key)? + key.len();
        let rest = &prompt[start..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        Some(&rest[..end])
    }

    #[async_trait]
    impl EvaluationClient for FakeClient {
        async fn evaluate(&self, prompt: &str) -> Result<String, EvaluationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(ms) = marker(prompt, "sleep=").and_then(|s| s.parse().ok()) {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if prompt.contains("TRANSPORT") {
                return Err(EvaluationError::Transport("status 503: overloaded".to_string()));
            }
            if prompt.contains("GARBAGE") {
                return Ok("Sorry, I can't help with that.".to_string());
            }
            let score = marker(prompt, "score=").unwrap_or("0");
            Ok(format!(
                "```json\n{{\"name\": \"Candidate\", \"score\": {score}}}\n```"
            ))
        }
    }

    #[derive(Default)]
    struct MemoryLog {
        entries: Mutex<Vec<RunSummary>>,
    }

    impl UsageLogger for MemoryLog {
        fn append(&self, summary: &RunSummary) -> anyhow::Result<()> {
            self.entries.lock().unwrap().push(summary.clone());
            Ok(())
        }
    }

    struct FailingLog;

    impl UsageLogger for FailingLog {
        fn append(&self, _summary: &RunSummary) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    struct Harness {
        client: Arc<FakeClient>,
        log: Arc<MemoryLog>,
        pipeline: Pipeline,
    }

    fn harness(max_concurrency: usize) -> Harness {
        let client = Arc::new(FakeClient::default());
        let log = Arc::new(MemoryLog::default());
        let pipeline = Pipeline {
            extractor: Arc::new(FakeExtractor),
            client: client.clone(),
            usage_log: log.clone(),
            max_concurrency,
        };
        Harness {
            client,
            log,
            pipeline,
        }
    }

    fn input(files: &[(&str, &str)]) -> BatchInput {
        BatchInput {
            files: files
                .iter()
                .map(|(name, body)| ResumeFile::new(*name, body.to_string()))
                .collect(),
            jd_text: "Area Sales Manager with 5 to 8 years in paints".to_string(),
            weights: ScoringWeights::default(),
            tone: Some(RemarkTone::Professional),
        }
    }

    #[tokio::test]
    async fn test_extraction_failure_isolated() {
        let h = harness(DEFAULT_MAX_CONCURRENCY);
        let outcome = run_batch(
            input(&[("one.pdf", "score=81"), ("two.pdf", "FAIL"), ("three.pdf", "score=64")]),
            &h.pipeline,
        )
        .await
        .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].source_file, "one.pdf");
        assert_eq!(outcome.results[0].score, 81);
        assert_eq!(outcome.results[1].source_file, "three.pdf");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].source_file, "two.pdf");
        assert!(outcome.errors[0].message.contains("corrupt file"));

        assert_eq!(outcome.summary.success_count, 2);
        assert_eq!(outcome.summary.failure_count, 1);
        assert_eq!(outcome.summary.resume_count, 3);
        assert_eq!(outcome.summary.error_messages.len(), 1);
        assert!(outcome.summary.error_messages[0].starts_with("two.pdf: "));
        // the failed extraction never reached the client
        assert_eq!(h.client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_every_failure_kind_becomes_batch_error() {
        let h = harness(DEFAULT_MAX_CONCURRENCY);
        let outcome = run_batch(
            input(&[
                ("a.pdf", "TRANSPORT"),
                ("b.pdf", "GARBAGE"),
                ("c.pdf", "PANIC"),
                ("d.pdf", "score=70"),
            ]),
            &h.pipeline,
        )
        .await
        .unwrap();

        let failed: Vec<&str> = outcome
            .errors
            .iter()
            .map(|e| e.source_file.as_str())
            .collect();
        assert_eq!(failed, vec!["a.pdf", "b.pdf", "c.pdf"]);
        assert!(outcome.errors[0].message.contains("503"));
        assert!(outcome.errors[1].message.contains("Could not parse JSON"));
        assert!(outcome.errors[1].message.contains("Sorry"));
        assert!(outcome.errors[2].message.contains("extraction task failed"));
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].source_file, "d.pdf");
    }

    #[tokio::test]
    async fn test_zero_failures_still_logs_once() {
        let h = harness(DEFAULT_MAX_CONCURRENCY);
        let outcome = run_batch(
            input(&[("a.pdf", "score=90"), ("b.docx", "score=40")]),
            &h.pipeline,
        )
        .await
        .unwrap();

        let entries = h.log.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].failure_count, 0);
        assert!(entries[0].error_messages.is_empty());
        assert_eq!(entries[0], outcome.summary);
        assert_eq!(outcome.summary.jd_word_count, 10);
    }

    #[tokio::test]
    async fn test_all_failures_still_logs_once() {
        let h = harness(DEFAULT_MAX_CONCURRENCY);
        let outcome = run_batch(input(&[("a.pdf", "FAIL"), ("b.pdf", "FAIL")]), &h.pipeline)
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.summary.failure_count, 2);
        assert_eq!(h.log.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unbalanced_weights_rejected_before_any_call() {
        let h = harness(DEFAULT_MAX_CONCURRENCY);
        let mut batch = input(&[("a.pdf", "score=90")]);
        batch.weights.experience = 45;

        let err = run_batch(batch, &h.pipeline).await.unwrap_err();
        assert_eq!(err, BatchRejected::UnbalancedWeights { total: 105 });
        assert_eq!(h.client.calls.load(Ordering::SeqCst), 0);
        assert!(h.log.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_jd_and_empty_files_rejected() {
        let h = harness(DEFAULT_MAX_CONCURRENCY);

        let mut blank_jd = input(&[("a.pdf", "score=90")]);
        blank_jd.jd_text = "   \n".to_string();
        assert_eq!(
            run_batch(blank_jd, &h.pipeline).await.unwrap_err(),
            BatchRejected::MissingJobDescription
        );

        assert_eq!(
            run_batch(input(&[]), &h.pipeline).await.unwrap_err(),
            BatchRejected::NoResumes
        );
        assert_eq!(h.client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_input_order_preserved_when_later_tasks_finish_first() {
        let h = harness(4);
        let outcome = run_batch(
            input(&[
                ("slow.pdf", "sleep=120 score=10"),
                ("medium.pdf", "sleep=60 score=20"),
                ("fast.pdf", "sleep=1 score=30"),
                ("broken.pdf", "FAIL"),
                ("faster.pdf", "score=40"),
            ]),
            &h.pipeline,
        )
        .await
        .unwrap();

        let order: Vec<&str> = outcome
            .results
            .iter()
            .map(|r| r.source_file.as_str())
            .collect();
        assert_eq!(order, vec!["slow.pdf", "medium.pdf", "fast.pdf", "faster.pdf"]);
        let scores: Vec<u32> = outcome.results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![10, 20, 30, 40]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let h = harness(2);
        let files: Vec<(String, String)> = (0..6)
            .map(|i| (format!("r{i}.pdf"), "sleep=30 score=50".to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = files
            .iter()
            .map(|(n, b)| (n.as_str(), b.as_str()))
            .collect();

        let outcome = run_batch(input(&refs), &h.pipeline).await.unwrap();
        assert_eq!(outcome.results.len(), 6);
        let peak = h.client.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak in-flight {peak} exceeded the limit");
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_batch() {
        let mut h = harness(DEFAULT_MAX_CONCURRENCY);
        h.pipeline.usage_log = Arc::new(FailingLog);
        let outcome = run_batch(input(&[("a.pdf", "score=75")]), &h.pipeline)
            .await
            .unwrap();
        assert_eq!(outcome.summary.success_count, 1);
    }

    /// Records the thread each append runs on; optionally panics.
    struct ThreadRecordingLog {
        threads: Mutex<Vec<std::thread::ThreadId>>,
        panic: bool,
    }

    impl UsageLogger for ThreadRecordingLog {
        fn append(&self, _summary: &RunSummary) -> anyhow::Result<()> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            if self.panic {
                panic!("sink blew up");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_runs_off_the_async_thread() {
        let mut h = harness(DEFAULT_MAX_CONCURRENCY);
        let log = Arc::new(ThreadRecordingLog {
            threads: Mutex::new(Vec::new()),
            panic: false,
        });
        h.pipeline.usage_log = log.clone();

        run_batch(input(&[("a.pdf", "score=75")]), &h.pipeline)
            .await
            .unwrap();

        let threads = log.threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }

    #[tokio::test]
    async fn test_sink_panic_does_not_fail_batch() {
        let mut h = harness(DEFAULT_MAX_CONCURRENCY);
        h.pipeline.usage_log = Arc::new(ThreadRecordingLog {
            threads: Mutex::new(Vec::new()),
            panic: true,
        });
        let outcome = run_batch(input(&[("a.pdf", "score=75")]), &h.pipeline)
            .await
            .unwrap();
        assert_eq!(outcome.summary.success_count, 1);
    }

    #[test]
    fn test_round_to_centis() {
        assert_eq!(round_to_centis(1.23456), 1.23);
        assert_eq!(round_to_centis(0.005), 0.01);
        assert_eq!(round_to_centis(0.0), 0.0);
    }
}
