//! Scorer: the capability seam between the screening core and the semantic model.
//!
//! Default: `LlmScorer` (Claude via `LlmClient`).
//! Tests swap in deterministic stubs; nothing in the core knows about HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, SEMANTIC_MATCHING_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::screening::SkillSet;
use crate::screening::prompts::{
    EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM, SKILL_EXTRACTION_PROMPT_TEMPLATE,
    SKILL_EXTRACTION_SYSTEM,
};

/// Scorer failures. Retryable and non-retryable kinds take the same local fallback;
/// the distinction only feeds logs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScorerError {
    #[error("scorer rate limited: {0}")]
    RateLimited(String),

    #[error("scorer quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("scorer timed out after {0:?}")]
    Timeout(Duration),

    #[error("scorer transport failure: {0}")]
    Transport(String),

    #[error("scorer API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed scorer response: {0}")]
    Malformed(String),
}

impl ScorerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ScorerError::RateLimited(_) | ScorerError::Timeout(_) | ScorerError::Transport(_) => {
                true
            }
            ScorerError::Api { status, .. } => *status >= 500,
            ScorerError::QuotaExhausted(_) | ScorerError::Malformed(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScorerError::RateLimited(_) => "rate_limited",
            ScorerError::QuotaExhausted(_) => "quota_exhausted",
            ScorerError::Timeout(_) => "timeout",
            ScorerError::Transport(_) => "transport",
            ScorerError::Api { .. } => "api",
            ScorerError::Malformed(_) => "malformed",
        }
    }
}

impl From<LlmError> for ScorerError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) => ScorerError::Transport(e.to_string()),
            LlmError::Api { status, message } => ScorerError::Api { status, message },
            LlmError::Parse(e) => ScorerError::Malformed(e.to_string()),
            LlmError::RateLimited { retries } => {
                ScorerError::RateLimited(format!("gave up after {retries} attempts"))
            }
            LlmError::QuotaExhausted { message } => ScorerError::QuotaExhausted(message),
            LlmError::EmptyContent => ScorerError::Malformed("empty content".to_string()),
        }
    }
}

/// Per-skill verdict as the scorer reports it, before clamping.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSkillMatch {
    pub skill: String,
    pub matched: bool,
    pub similarity: f64,
}

/// The scorer's answer for one resume. Every field is optional on the wire so the
/// evaluator can decide what a missing field means.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAssessment {
    pub candidate_name: Option<String>,
    pub email: Option<String>,
    pub overall_match_percentage: Option<f64>,
    pub experience_match_percentage: Option<f64>,
    pub skill_matches: Option<Vec<RawSkillMatch>>,
    pub analysis: Option<String>,
}

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Categorizes the skills a job description asks for.
    async fn extract_skills(&self, job_description: &str) -> Result<SkillSet, ScorerError>;

    /// Assesses one resume against a job description and a combined skill list.
    async fn evaluate(
        &self,
        resume_text: &str,
        job_description: &str,
        skills: &[String],
    ) -> Result<RawAssessment, ScorerError>;
}

/// Semantic scorer backed by Claude.
#[derive(Clone)]
pub struct LlmScorer(pub LlmClient);

#[async_trait]
impl Scorer for LlmScorer {
    async fn extract_skills(&self, job_description: &str) -> Result<SkillSet, ScorerError> {
        let prompt = build_skill_prompt(job_description);
        let system = format!("{SKILL_EXTRACTION_SYSTEM} {JSON_ONLY_SYSTEM}");
        Ok(self.0.call_json::<SkillSet>(&prompt, &system).await?)
    }

    async fn evaluate(
        &self,
        resume_text: &str,
        job_description: &str,
        skills: &[String],
    ) -> Result<RawAssessment, ScorerError> {
        let prompt = build_evaluation_prompt(resume_text, job_description, skills);
        let system = format!("{EVALUATION_SYSTEM} {JSON_ONLY_SYSTEM}");
        Ok(self.0.call_json::<RawAssessment>(&prompt, &system).await?)
    }
}

fn build_skill_prompt(job_description: &str) -> String {
    fill_template(
        SKILL_EXTRACTION_PROMPT_TEMPLATE,
        &[("job_description", job_description)],
    )
}

fn build_evaluation_prompt(resume_text: &str, job_description: &str, skills: &[String]) -> String {
    let skills = if skills.is_empty() {
        "(none listed; judge overall fit only)".to_string()
    } else {
        skills.join(", ")
    };
    fill_template(
        EVALUATION_PROMPT_TEMPLATE,
        &[
            ("semantic_instruction", SEMANTIC_MATCHING_INSTRUCTION),
            ("job_description", job_description),
            ("skills", &skills),
            ("resume_text", resume_text),
        ],
    )
}

/// Single pass over the template: only `{name}` placeholders written in the
/// template itself are substituted, never text coming from a value.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = values.iter().find_map(|(name, value)| {
            tail.strip_prefix(*name)
                .and_then(|after| after.strip_prefix('}'))
                .map(|after| (*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
