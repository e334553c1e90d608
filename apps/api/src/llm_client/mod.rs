//! Messages API transport for the semantic scorer.
//!
//! The screening core never calls this module; it talks to the `Scorer` capability
//! and `LlmScorer` is the only caller here. Backoff on 429 and 5xx lives in this
//! layer. Whatever error finally surfaces is handed up once.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
/// Model for both skill extraction and candidate evaluation.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_OUTPUT_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} attempts")]
    RateLimited { retries: u32 },

    #[error("API credits exhausted: {message}")]
    QuotaExhausted { message: String },

    #[error("Model returned no text content")]
    EmptyContent,
}

/// Attempts and delays for transient failures. Delay doubles per attempt.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (0-based). The first attempt never waits.
    fn delay_before(&self, attempt: u32) -> Option<Duration> {
        (attempt > 0).then(|| self.base_delay * 2u32.saturating_pow(attempt - 1))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// What one HTTP exchange means for the retry loop.
#[derive(Debug)]
enum Verdict {
    Retry(LlmError),
    Fail(LlmError),
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            endpoint: MESSAGES_URL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// One user turn against the Messages API, retried per the policy.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<MessagesResponse, LlmError> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_OUTPUT_TOKENS,
            system,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            if let Some(delay) = self.retry.delay_before(attempt) {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&body, attempt).await {
                Ok(response) => {
                    debug!(
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "LLM call succeeded"
                    );
                    return Ok(response);
                }
                Err(Verdict::Fail(e)) => return Err(e),
                Err(Verdict::Retry(e)) => {
                    warn!(attempt = attempt + 1, "LLM call failed, will retry: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.retry.max_attempts,
        }))
    }

    async fn attempt(
        &self,
        body: &MessagesRequest<'_>,
        attempt: u32,
    ) -> Result<MessagesResponse, Verdict> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| Verdict::Retry(LlmError::Http(e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<MessagesResponse>()
                .await
                .map_err(|e| Verdict::Fail(LlmError::Http(e)));
        }

        let raw = response.text().await.unwrap_or_default();
        Err(classify_status(status, raw, attempt))
    }

    /// Calls the model and parses its text answer as JSON, tolerating code fences.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;
        let text = response.first_text().ok_or(LlmError::EmptyContent)?;
        Ok(serde_json::from_str(strip_json_fences(text))?)
    }
}

/// 429 and 5xx are transient. 402 means the account is out of credits.
fn classify_status(status: StatusCode, raw_body: String, attempt: u32) -> Verdict {
    let message = serde_json::from_str::<ErrorEnvelope>(&raw_body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(raw_body);

    match status {
        StatusCode::TOO_MANY_REQUESTS => Verdict::Retry(LlmError::RateLimited {
            retries: attempt + 1,
        }),
        StatusCode::PAYMENT_REQUIRED => Verdict::Fail(LlmError::QuotaExhausted { message }),
        s if s.is_server_error() => Verdict::Retry(LlmError::Api {
            status: s.as_u16(),
            message,
        }),
        s => Verdict::Fail(LlmError::Api {
            status: s.as_u16(),
            message,
        }),
    }
}

/// Removes a surrounding markdown code fence, with or without a `json` tag.
fn strip_json_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}
