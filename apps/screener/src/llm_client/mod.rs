//! LLM Client: the single point of entry for generative-model calls in the screener.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini API directly.
//! The batch pipeline depends only on the `EvaluationClient` trait, so tests can
//! substitute an in-memory client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::evaluation::error::EvaluationError;

/// Default `generateContent` endpoint.
pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
const API_KEY_HEADER: &str = "X-goog-api-key";

/// Sends one prompt and returns the model's raw text.
#[async_trait]
pub trait EvaluationClient: Send + Sync {
    async fn evaluate(&self, prompt: &str) -> Result<String, EvaluationError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Connection settings for `GeminiClient`.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Extra attempts after the first for network errors, 429 and 5xx. 0 = single attempt.
    pub max_retries: u32,
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    settings: ClientSettings,
}

impl GeminiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(settings.timeout).build()?,
            settings,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.settings.api_url
    }

    async fn send_once(&self, body: &GenerateRequest<'_>) -> Result<String, Attempt> {
        let response = self
            .client
            .post(&self.settings.api_url)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Attempt::Retryable(EvaluationError::Transport(e.to_string())))?;

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            return Err(Attempt::Retryable(EvaluationError::Transport(format!(
                "status {}: {}",
                status.as_u16(),
                error_message(body)
            ))));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Attempt::Fatal(EvaluationError::Transport(format!(
                "status {}: {}",
                status.as_u16(),
                error_message(body)
            ))));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Attempt::Retryable(EvaluationError::Transport(e.to_string())))?;

        let envelope: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| Attempt::Fatal(EvaluationError::MalformedEnvelope(e.to_string())))?;

        envelope.first_text().ok_or_else(|| {
            Attempt::Fatal(EvaluationError::MalformedEnvelope(
                "missing candidates[0].content.parts[0].text".to_string(),
            ))
        })
    }
}

/// Outcome of a single failed HTTP attempt.
enum Attempt {
    Retryable(EvaluationError),
    Fatal(EvaluationError),
}

#[async_trait]
impl EvaluationClient for GeminiClient {
    /// Retries network errors, 429 and 5xx up to `max_retries` times with
    /// exponential backoff (1s, 2s, 4s, ...). Everything else fails immediately.
    async fn evaluate(&self, prompt: &str) -> Result<String, EvaluationError> {
        let request_body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&request_body).await {
                Ok(text) => {
                    debug!("Gemini call succeeded: {} chars returned", text.len());
                    return Ok(text);
                }
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retryable(e)) if attempt >= self.settings.max_retries => return Err(e),
                Err(Attempt::Retryable(e)) => {
                    let delay = Duration::from_millis(1000u64 * (1u64 << attempt.min(16)));
                    attempt += 1;
                    warn!(
                        "Gemini call attempt {} failed ({e}), retrying after {}ms...",
                        attempt,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Pulls `error.message` out of a Gemini error body, falling back to the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<GeminiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}
