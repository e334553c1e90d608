use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::document::DocumentId;

/// Categorized skills extracted from a job description.
///
/// Each list is deduplicated on its own; a skill may sit in both `required` and
/// `preferred` because the two carry different weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillSet {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SkillSet {
    /// Trims names, drops blanks, removes case-insensitive duplicates within each
    /// list (first occurrence wins) and truncates each list to `cap`.
    pub fn normalized(self, cap: usize) -> Self {
        Self {
            required: normalize_list(self.required, cap),
            preferred: normalize_list(self.preferred, cap),
            keywords: normalize_list(self.keywords, cap),
        }
    }

    /// The scored skill list: required first, then preferred. Keywords are
    /// informational and never scored.
    pub fn combined(&self) -> Vec<String> {
        self.required
            .iter()
            .chain(self.preferred.iter())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.preferred.is_empty() && self.keywords.is_empty()
    }
}

fn normalize_list(items: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(cap)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDescription {
    pub title: String,
    pub body_text: String,
    pub skill_set: SkillSet,
    pub created_at: DateTime<Utc>,
}

/// `similarity` keeps the scorer's raw confidence even when `matched` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillMatch {
    pub skill: String,
    pub matched: bool,
    pub similarity: f64,
}

impl SkillMatch {
    pub fn unmatched(skill: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            matched: false,
            similarity: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateAssessment {
    pub document_id: DocumentId,
    pub candidate_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub overall_match_percent: u8,
    pub experience_match_percent: u8,
    pub skill_matches: Vec<SkillMatch>,
    pub analysis_text: String,
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub assessment: CandidateAssessment,
    /// 1-based, dense, unique within a run.
    pub rank: usize,
    /// `overall_match_percent` as a fraction in [0, 1].
    pub match_score: f64,
}

pub const TOTAL_STEPS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStage {
    Idle,
    ExtractingSkills,
    ProcessingDocuments,
    Scoring,
    Ranking,
    Done,
}

impl ScreeningStage {
    pub fn step(self) -> u32 {
        match self {
            ScreeningStage::Idle | ScreeningStage::ExtractingSkills => 0,
            ScreeningStage::ProcessingDocuments => 1,
            ScreeningStage::Scoring => 2,
            ScreeningStage::Ranking => 3,
            ScreeningStage::Done => TOTAL_STEPS,
        }
    }
}

impl std::fmt::Display for ScreeningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreeningStage::Idle => write!(f, "Idle"),
            ScreeningStage::ExtractingSkills => write!(f, "Extracting skills"),
            ScreeningStage::ProcessingDocuments => write!(f, "Processing documents"),
            ScreeningStage::Scoring => write!(f, "Scoring"),
            ScreeningStage::Ranking => write!(f, "Ranking"),
            ScreeningStage::Done => write!(f, "Done"),
        }
    }
}

/// Snapshot published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressState {
    pub stage: ScreeningStage,
    pub current_step: u32,
    pub total_steps: u32,
    pub message: String,
}

impl ProgressState {
    pub fn idle() -> Self {
        Self::at(ScreeningStage::Idle, "")
    }

    pub fn at(stage: ScreeningStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            current_step: stage.step(),
            total_steps: TOTAL_STEPS,
            message: message.into(),
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}
