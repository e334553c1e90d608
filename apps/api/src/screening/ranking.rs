//! Ranking: stable descending sort by overall match, then dense 1-based ranks.
//!
//! Policy: equal scores keep evaluation order and still take distinct consecutive
//! ranks. Shared ranks for ties are deliberately not used.

use serde::Serialize;

use crate::models::screening::{CandidateAssessment, RankedCandidate};

const EXCELLENT_THRESHOLD: u8 = 80;
const GOOD_THRESHOLD: u8 = 60;

pub fn rank_candidates(mut assessments: Vec<CandidateAssessment>) -> Vec<RankedCandidate> {
    // sort_by is stable: ties keep the order the evaluator produced them in
    assessments.sort_by(|a, b| b.overall_match_percent.cmp(&a.overall_match_percent));

    assessments
        .into_iter()
        .enumerate()
        .map(|(index, assessment)| RankedCandidate {
            rank: index + 1,
            match_score: f64::from(assessment.overall_match_percent) / 100.0,
            assessment,
        })
        .collect()
}

/// Aggregate figures for one ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningSummary {
    pub total_candidates: usize,
    /// overall >= 80
    pub excellent_matches: usize,
    /// 60 <= overall < 80
    pub good_matches: usize,
    pub average_score: u8,
    pub failed_assessments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation_note: Option<String>,
}

pub fn summarize(rankings: &[RankedCandidate]) -> ScreeningSummary {
    let total = rankings.len();
    let scores = rankings.iter().map(|r| r.assessment.overall_match_percent);

    let excellent = scores.clone().filter(|s| *s >= EXCELLENT_THRESHOLD).count();
    let good = scores
        .clone()
        .filter(|s| (GOOD_THRESHOLD..EXCELLENT_THRESHOLD).contains(s))
        .count();
    let average = if total == 0 {
        0
    } else {
        let sum: u32 = scores.map(u32::from).sum();
        (f64::from(sum) / total as f64).round() as u8
    };
    let failed = rankings.iter().filter(|r| r.assessment.failed).count();

    ScreeningSummary {
        total_candidates: total,
        excellent_matches: excellent,
        good_matches: good,
        average_score: average,
        failed_assessments: failed,
        degradation_note: (failed > 0)
            .then(|| format!("{failed} of {total} candidates could not be fully analyzed")),
    }
}
