//! Candidate evaluation: one ready document in, one assessment out.
//!
//! Any scorer failure (rate limit, quota, transport, timeout, malformed answer)
//! becomes a failed assessment for that document alone. No retries here.

use std::time::Duration;

use tracing::{debug, warn};

use crate::models::document::ReadyDocument;
use crate::models::screening::{CandidateAssessment, JobDescription, SkillMatch};
use crate::screening::scorer::{RawAssessment, RawSkillMatch, Scorer, ScorerError};

const FAILED_ANALYSIS: &str = "Error analyzing this resume";

pub async fn evaluate_candidate(
    scorer: &dyn Scorer,
    document: &ReadyDocument,
    job: &JobDescription,
    timeout: Duration,
) -> CandidateAssessment {
    let skills = job.skill_set.combined();

    let answer = match tokio::time::timeout(
        timeout,
        scorer.evaluate(document.text(), &job.body_text, &skills),
    )
    .await
    {
        Ok(answer) => answer,
        Err(_) => Err(ScorerError::Timeout(timeout)),
    };

    match answer.and_then(|raw| build_assessment(document, &skills, raw)) {
        Ok(assessment) => {
            debug!(
                document_id = %document.id(),
                overall = assessment.overall_match_percent,
                "Candidate evaluated"
            );
            assessment
        }
        Err(e) => {
            warn!(
                document_id = %document.id(),
                file_name = document.file_name(),
                kind = e.kind(),
                retryable = e.is_retryable(),
                "Candidate evaluation failed: {e}"
            );
            failed_assessment(document, &skills)
        }
    }
}

/// Placeholder assessment: zero scores, every skill unmatched, file stem as name.
pub fn failed_assessment(document: &ReadyDocument, skills: &[String]) -> CandidateAssessment {
    CandidateAssessment {
        document_id: document.id(),
        candidate_name: document.placeholder_name(),
        email: None,
        overall_match_percent: 0,
        experience_match_percent: 0,
        skill_matches: skills.iter().map(SkillMatch::unmatched).collect(),
        analysis_text: FAILED_ANALYSIS.to_string(),
        failed: true,
    }
}

/// Validates the scorer's answer. A missing or non-numeric field rejects the whole
/// answer; partially populated assessments are never produced.
fn build_assessment(
    document: &ReadyDocument,
    skills: &[String],
    raw: RawAssessment,
) -> Result<CandidateAssessment, ScorerError> {
    let candidate_name = raw.candidate_name.ok_or_else(|| missing("candidate_name"))?;
    let overall = raw
        .overall_match_percentage
        .ok_or_else(|| missing("overall_match_percentage"))?;
    let experience = raw
        .experience_match_percentage
        .ok_or_else(|| missing("experience_match_percentage"))?;
    let raw_matches = raw.skill_matches.ok_or_else(|| missing("skill_matches"))?;
    let analysis_text = raw.analysis.ok_or_else(|| missing("analysis"))?;

    let candidate_name = match candidate_name.trim() {
        "" => document.placeholder_name(),
        name => name.to_string(),
    };
    let email = raw
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty() && e != "null");

    Ok(CandidateAssessment {
        document_id: document.id(),
        candidate_name,
        email,
        overall_match_percent: to_percent(overall, "overall_match_percentage")?,
        experience_match_percent: to_percent(experience, "experience_match_percentage")?,
        skill_matches: reconcile_skill_matches(skills, &raw_matches)?,
        analysis_text,
        failed: false,
    })
}

fn missing(field: &str) -> ScorerError {
    ScorerError::Malformed(format!("missing field `{field}`"))
}

fn to_percent(value: f64, field: &str) -> Result<u8, ScorerError> {
    if !value.is_finite() {
        return Err(ScorerError::Malformed(format!("`{field}` is not a number")));
    }
    Ok(value.clamp(0.0, 100.0).round() as u8)
}

/// One entry per scored skill, in skill-list order. Skills the scorer skipped are
/// unmatched at zero; skills it invented are dropped.
fn reconcile_skill_matches(
    skills: &[String],
    raw_matches: &[RawSkillMatch],
) -> Result<Vec<SkillMatch>, ScorerError> {
    skills
        .iter()
        .map(|skill| {
            let found = raw_matches
                .iter()
                .find(|m| m.skill.trim().eq_ignore_ascii_case(skill.trim()));
            match found {
                Some(m) if !m.similarity.is_finite() => Err(ScorerError::Malformed(format!(
                    "similarity for `{skill}` is not a number"
                ))),
                Some(m) => Ok(SkillMatch {
                    skill: skill.clone(),
                    matched: m.matched,
                    similarity: m.similarity.clamp(0.0, 1.0),
                }),
                None => Ok(SkillMatch::unmatched(skill.clone())),
            }
        })
        .collect()
}
