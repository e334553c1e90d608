//! Deterministic collaborator doubles for screening tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::extraction::{ExtractionError, TextExtractor};
use crate::models::document::UploadedFile;
use crate::models::screening::SkillSet;
use crate::screening::scorer::{RawAssessment, RawSkillMatch, Scorer, ScorerError};

/// Scripted scorer. Evaluations are keyed by resume text; unknown resumes get a
/// transport error.
pub struct StubScorer {
    skills: Result<SkillSet, ScorerError>,
    skill_delay: Option<Duration>,
    assessments: HashMap<String, Result<RawAssessment, ScorerError>>,
    evaluation_delays: HashMap<String, Duration>,
    skill_calls: AtomicUsize,
    evaluate_calls: AtomicUsize,
}

impl StubScorer {
    pub fn new() -> Self {
        Self {
            skills: Ok(SkillSet::default()),
            skill_delay: None,
            assessments: HashMap::new(),
            evaluation_delays: HashMap::new(),
            skill_calls: AtomicUsize::new(0),
            evaluate_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_skills(mut self, skills: SkillSet) -> Self {
        self.skills = Ok(skills);
        self
    }

    pub fn with_skill_error(mut self, err: ScorerError) -> Self {
        self.skills = Err(err);
        self
    }

    pub fn with_skill_delay(mut self, delay: Duration) -> Self {
        self.skill_delay = Some(delay);
        self
    }

    pub fn with_assessment(mut self, resume_text: &str, raw: RawAssessment) -> Self {
        self.assessments.insert(resume_text.to_string(), Ok(raw));
        self
    }

    pub fn with_evaluation_error(mut self, resume_text: &str, err: ScorerError) -> Self {
        self.assessments.insert(resume_text.to_string(), Err(err));
        self
    }

    pub fn with_evaluation_delay(mut self, resume_text: &str, delay: Duration) -> Self {
        self.evaluation_delays.insert(resume_text.to_string(), delay);
        self
    }

    pub fn skill_calls(&self) -> usize {
        self.skill_calls.load(Ordering::SeqCst)
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scorer for StubScorer {
    async fn extract_skills(&self, _job_description: &str) -> Result<SkillSet, ScorerError> {
        self.skill_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.skill_delay {
            tokio::time::sleep(delay).await;
        }
        self.skills.clone()
    }

    async fn evaluate(
        &self,
        resume_text: &str,
        _job_description: &str,
        _skills: &[String],
    ) -> Result<RawAssessment, ScorerError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.evaluation_delays.get(resume_text) {
            tokio::time::sleep(*delay).await;
        }
        self.assessments
            .get(resume_text)
            .cloned()
            .unwrap_or_else(|| Err(ScorerError::Transport("no scripted answer".to_string())))
    }
}

/// Wraps a scorer and parks every evaluation until released.
pub struct GatedScorer {
    inner: StubScorer,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedScorer {
    pub fn new(inner: StubScorer) -> Self {
        Self {
            inner,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl Scorer for GatedScorer {
    async fn extract_skills(&self, job_description: &str) -> Result<SkillSet, ScorerError> {
        self.inner.extract_skills(job_description).await
    }

    async fn evaluate(
        &self,
        resume_text: &str,
        job_description: &str,
        skills: &[String],
    ) -> Result<RawAssessment, ScorerError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.evaluate(resume_text, job_description, skills).await
    }
}

/// Extracts uploads as UTF-8 text, failing for names registered as broken.
#[derive(Default)]
pub struct StubExtractor {
    failing: HashSet<String>,
}

impl StubExtractor {
    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl TextExtractor for StubExtractor {
    fn extract(&self, file: &UploadedFile) -> Result<String, ExtractionError> {
        if self.failing.contains(&file.file_name) {
            return Err(ExtractionError::Corrupt(format!(
                "{} is unreadable",
                file.file_name
            )));
        }
        Ok(String::from_utf8_lossy(&file.bytes).into_owned())
    }
}

/// Blocks extraction on the blocking pool until opened. Once open it stays open.
#[derive(Default)]
pub struct ExtractionGate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl ExtractionGate {
    pub fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
    }
}

/// Text extraction that parks the named files at the gate.
pub struct GatedExtractor {
    inner: StubExtractor,
    gated: HashSet<String>,
    pub entered: Arc<Notify>,
    pub gate: Arc<ExtractionGate>,
}

impl GatedExtractor {
    pub fn new(names: &[&str]) -> Self {
        Self {
            inner: StubExtractor::default(),
            gated: names.iter().map(|n| n.to_string()).collect(),
            entered: Arc::new(Notify::new()),
            gate: Arc::new(ExtractionGate::default()),
        }
    }
}

impl TextExtractor for GatedExtractor {
    fn extract(&self, file: &UploadedFile) -> Result<String, ExtractionError> {
        if self.gated.contains(&file.file_name) {
            self.entered.notify_one();
            self.gate.wait();
        }
        self.inner.extract(file)
    }
}

pub fn text_upload(name: &str, text: &str) -> UploadedFile {
    UploadedFile::new(name, "text/plain", text.as_bytes().to_vec())
}

/// A complete scorer answer with the given scores and per-skill verdicts.
pub fn raw_assessment(
    name: &str,
    overall: f64,
    experience: f64,
    skills: &[(&str, bool, f64)],
) -> RawAssessment {
    RawAssessment {
        candidate_name: Some(name.to_string()),
        email: Some(format!("{}@email.com", name.to_lowercase().replace(' ', "."))),
        overall_match_percentage: Some(overall),
        experience_match_percentage: Some(experience),
        skill_matches: Some(
            skills
                .iter()
                .map(|(skill, matched, similarity)| RawSkillMatch {
                    skill: skill.to_string(),
                    matched: *matched,
                    similarity: *similarity,
                })
                .collect(),
        ),
        analysis: Some(format!("{name} analysis")),
    }
}
