//! Screening orchestrator: the run state machine.
//!
//! Flow: Idle → ExtractingSkills → ProcessingDocuments → Scoring → Ranking → Done → Idle.
//!
//! Each run gets a monotonically increasing id. Resetting the session (or starting
//! a newer run) bumps the active id; anything a superseded run produces after that
//! point is dropped instead of touching progress or the stored outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::models::document::{DocumentId, DocumentStatus, ReadyDocument};
use crate::models::screening::{
    CandidateAssessment, JobDescription, ProgressState, RankedCandidate, ScreeningStage, SkillSet,
};
use crate::screening::evaluator::{evaluate_candidate, failed_assessment};
use crate::screening::ingest::DocumentIngestor;
use crate::screening::ranking::{rank_candidates, summarize, ScreeningSummary};
use crate::screening::scorer::Scorer;
use crate::screening::skills::{extract_skills, MAX_SKILLS_PER_CATEGORY};

#[derive(Debug, Clone)]
pub struct ScreeningSettings {
    /// Evaluations in flight at once. Tuning only; results do not depend on it.
    pub max_concurrent_evaluations: usize,
    /// Upper bound on a single scorer call.
    pub scorer_timeout: Duration,
}

impl Default for ScreeningSettings {
    fn default() -> Self {
        Self {
            max_concurrent_evaluations: 4,
            scorer_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreeningRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Previously extracted (possibly edited) skills; skips the scorer when set.
    #[serde(default)]
    pub skills: Option<SkillSet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningOutcome {
    pub run_id: u64,
    pub job: JobDescription,
    pub rankings: Vec<RankedCandidate>,
    pub summary: ScreeningSummary,
    /// Documents that failed extraction and were never scored.
    pub excluded_documents: Vec<DocumentId>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ScreeningError {
    #[error("A job title is required to start screening")]
    MissingTitle,

    #[error("No documents to rank: {submitted} submitted, none extracted successfully")]
    EmptyBatch { submitted: usize },

    #[error("Screening run {run_id} was superseded")]
    Superseded { run_id: u64 },
}

struct RunState {
    active_run: u64,
    latest: Option<ScreeningOutcome>,
}

pub struct ScreeningOrchestrator {
    ingestor: Arc<DocumentIngestor>,
    scorer: Arc<dyn Scorer>,
    settings: ScreeningSettings,
    run_state: Mutex<RunState>,
    progress: watch::Sender<ProgressState>,
}

impl ScreeningOrchestrator {
    pub fn new(
        ingestor: Arc<DocumentIngestor>,
        scorer: Arc<dyn Scorer>,
        settings: ScreeningSettings,
    ) -> Self {
        let (progress, _) = watch::channel(ProgressState::idle());
        Self {
            ingestor,
            scorer,
            settings,
            run_state: Mutex::new(RunState {
                active_run: 0,
                latest: None,
            }),
            progress,
        }
    }

    pub fn ingestor(&self) -> &Arc<DocumentIngestor> {
        &self.ingestor
    }

    pub fn progress(&self) -> ProgressState {
        self.progress.borrow().clone()
    }

    pub fn latest(&self) -> Option<ScreeningOutcome> {
        self.lock_run().latest.clone()
    }

    /// Skill extraction outside of a run, for previewing before submission.
    pub async fn preview_skills(&self, description: &str) -> SkillSet {
        extract_skills(description, self.scorer.as_ref(), self.settings.scorer_timeout).await
    }

    /// Abandons any active run, forgets documents and the last outcome.
    pub fn reset(&self) {
        let superseded = {
            let mut state = self.lock_run();
            state.active_run += 1;
            state.latest = None;
            self.progress.send_replace(ProgressState::idle());
            state.active_run - 1
        };
        let cleared = self.ingestor.clear();
        info!(superseded_run = superseded, documents = cleared, "Screening session reset");
    }

    /// Runs the full pipeline over the documents registered at call time.
    pub async fn run(&self, request: ScreeningRequest) -> Result<ScreeningOutcome, ScreeningError> {
        if request.title.trim().is_empty() {
            return Err(ScreeningError::MissingTitle);
        }

        let run_id = self.begin_run();
        info!(run_id, title = %request.title, "Screening run started");
        let mut guard = RunGuard {
            orchestrator: self,
            run_id,
            finished: false,
        };

        let result = self.execute(run_id, request).await;
        guard.finished = true;
        match &result {
            Ok(outcome) => info!(
                run_id,
                candidates = outcome.rankings.len(),
                excluded = outcome.excluded_documents.len(),
                "Screening run completed"
            ),
            Err(e) => warn!(run_id, "Screening run ended without ranking: {e}"),
        }

        drop(guard);
        result
    }

    async fn execute(
        &self,
        run_id: u64,
        request: ScreeningRequest,
    ) -> Result<ScreeningOutcome, ScreeningError> {
        self.advance(
            run_id,
            ScreeningStage::ExtractingSkills,
            "Extracting skills from job description...",
        )?;
        let skill_set = match request.skills {
            Some(skills) => skills.normalized(MAX_SKILLS_PER_CATEGORY),
            None => {
                extract_skills(
                    &request.description,
                    self.scorer.as_ref(),
                    self.settings.scorer_timeout,
                )
                .await
            }
        };
        let job = JobDescription {
            title: request.title.trim().to_string(),
            body_text: request.description,
            skill_set,
            created_at: Utc::now(),
        };

        self.advance(
            run_id,
            ScreeningStage::ProcessingDocuments,
            "Parsing resume documents...",
        )?;
        let tracked = self.ingestor.ids();
        let documents = self.ingestor.wait_until_settled(&tracked).await;
        self.ensure_active(run_id)?;

        let mut ready = Vec::new();
        let mut excluded = Vec::new();
        for document in &documents {
            match &document.status {
                DocumentStatus::Failed { .. } => excluded.push(document.id),
                _ => {
                    if let Ok(doc) = ReadyDocument::try_from(document) {
                        ready.push(doc);
                    }
                }
            }
        }
        if ready.is_empty() {
            return Err(ScreeningError::EmptyBatch {
                submitted: documents.len(),
            });
        }

        self.advance(
            run_id,
            ScreeningStage::Scoring,
            format!("Running semantic analysis on {} candidates...", ready.len()),
        )?;
        let assessments = self.score_all(run_id, &ready, &job).await;
        self.ensure_active(run_id)?;

        self.advance(run_id, ScreeningStage::Ranking, "Generating final rankings...")?;
        let rankings = rank_candidates(assessments);
        let summary = summarize(&rankings);
        if let Some(note) = &summary.degradation_note {
            warn!(run_id, "{note}");
        }

        let outcome = ScreeningOutcome {
            run_id,
            job,
            rankings,
            summary,
            excluded_documents: excluded,
        };
        self.complete(run_id, &outcome)?;
        Ok(outcome)
    }

    /// Evaluates every ready document with bounded concurrency. The join below is
    /// the barrier: ranking only sees the list once every evaluation resolved.
    /// Output order matches `ready`, not completion order.
    async fn score_all(
        &self,
        run_id: u64,
        ready: &[ReadyDocument],
        job: &JobDescription,
    ) -> Vec<CandidateAssessment> {
        let total = ready.len();
        let job = Arc::new(job.clone());
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrent_evaluations.max(1)));
        let mut tasks = JoinSet::new();

        for (index, document) in ready.iter().cloned().enumerate() {
            let scorer = Arc::clone(&self.scorer);
            let job = Arc::clone(&job);
            let permits = Arc::clone(&permits);
            let timeout = self.settings.scorer_timeout;
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let assessment = evaluate_candidate(scorer.as_ref(), &document, &job, timeout).await;
                (index, assessment)
            });
        }

        let mut slots: Vec<Option<CandidateAssessment>> = vec![None; total];
        let mut completed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, assessment)) => {
                    slots[index] = Some(assessment);
                    completed += 1;
                    let message = format!("Scored {completed} of {total} candidates");
                    if !self.publish(run_id, ProgressState::at(ScreeningStage::Scoring, message)) {
                        debug!(run_id, "Run superseded during scoring, abandoning evaluations");
                        tasks.abort_all();
                        break;
                    }
                }
                Err(e) => error!(run_id, "Candidate evaluation task aborted: {e}"),
            }
        }

        let skills = job.skill_set.combined();
        slots
            .into_iter()
            .zip(ready)
            .map(|(slot, document)| slot.unwrap_or_else(|| failed_assessment(document, &skills)))
            .collect()
    }

    fn begin_run(&self) -> u64 {
        let mut state = self.lock_run();
        state.active_run += 1;
        state.active_run
    }

    fn ensure_active(&self, run_id: u64) -> Result<(), ScreeningError> {
        if self.lock_run().active_run == run_id {
            Ok(())
        } else {
            Err(ScreeningError::Superseded { run_id })
        }
    }

    /// Publishes a snapshot only if `run_id` is still the active run.
    fn publish(&self, run_id: u64, state: ProgressState) -> bool {
        let run = self.lock_run();
        if run.active_run != run_id {
            debug!(run_id, active = run.active_run, "Dropping progress from superseded run");
            return false;
        }
        self.progress.send_replace(state);
        true
    }

    fn advance(
        &self,
        run_id: u64,
        stage: ScreeningStage,
        message: impl Into<String>,
    ) -> Result<(), ScreeningError> {
        let message = message.into();
        info!(run_id, stage = %stage, "{message}");
        if self.publish(run_id, ProgressState::at(stage, message)) {
            Ok(())
        } else {
            Err(ScreeningError::Superseded { run_id })
        }
    }

    /// Stores the outcome and reports `Done` atomically with the run-id check.
    fn complete(&self, run_id: u64, outcome: &ScreeningOutcome) -> Result<(), ScreeningError> {
        let mut state = self.lock_run();
        if state.active_run != run_id {
            return Err(ScreeningError::Superseded { run_id });
        }
        state.latest = Some(outcome.clone());
        self.progress.send_replace(ProgressState::at(
            ScreeningStage::Done,
            format!("Ranked {} candidates", outcome.rankings.len()),
        ));
        Ok(())
    }

    fn lock_run(&self) -> MutexGuard<'_, RunState> {
        self.run_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns progress to Idle when a run ends, including when its future is
/// dropped mid-stage. Still subject to the run-id check, so a superseded run
/// cannot overwrite a newer run's progress.
struct RunGuard<'a> {
    orchestrator: &'a ScreeningOrchestrator,
    run_id: u64,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(run_id = self.run_id, "Screening run dropped before it finished");
        }
        self.orchestrator.publish(self.run_id, ProgressState::idle());
    }
}
