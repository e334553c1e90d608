//! Skill extraction: turns a job description into a categorized `SkillSet`.
//!
//! Primary path asks the scorer. Any scorer failure, timeout or empty answer falls
//! back to a deterministic dictionary heuristic. Never fails outward.

use std::time::Duration;

use tracing::{debug, warn};

use crate::models::screening::SkillSet;
use crate::screening::scorer::{Scorer, ScorerError};

/// Cap applied to every category of a scorer-provided skill set.
pub const MAX_SKILLS_PER_CATEGORY: usize = 8;

const FALLBACK_REQUIRED_CAP: usize = 5;
const FALLBACK_PREFERRED_CAP: usize = 3;

/// (lower-case needle, display name). Dictionary order decides heuristic order.
const SKILL_DICTIONARY: &[(&str, &str)] = &[
    ("python", "Python"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("java", "Java"),
    ("rust", "Rust"),
    ("golang", "Go"),
    ("c++", "C++"),
    ("c#", "C#"),
    ("ruby", "Ruby"),
    ("php", "PHP"),
    ("kotlin", "Kotlin"),
    ("swift", "Swift"),
    ("scala", "Scala"),
    ("sql", "SQL"),
    ("postgresql", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("mongodb", "MongoDB"),
    ("redis", "Redis"),
    ("react", "React"),
    ("angular", "Angular"),
    ("vue", "Vue"),
    ("node.js", "Node.js"),
    ("django", "Django"),
    ("spring boot", "Spring Boot"),
    ("graphql", "GraphQL"),
    ("rest api", "REST APIs"),
    ("docker", "Docker"),
    ("kubernetes", "Kubernetes"),
    ("aws", "AWS"),
    ("azure", "Azure"),
    ("gcp", "GCP"),
    ("terraform", "Terraform"),
    ("kafka", "Kafka"),
    ("machine learning", "Machine Learning"),
    ("tensorflow", "TensorFlow"),
    ("pytorch", "PyTorch"),
    ("data analysis", "Data Analysis"),
    ("linux", "Linux"),
    ("git", "Git"),
    ("ci/cd", "CI/CD"),
];

/// (substring marker, keyword label). Plain substring search.
const EXPERIENCE_MARKERS: &[(&str, &str)] = &[
    ("senior", "Senior level"),
    ("junior", "Junior level"),
    ("principal", "Principal level"),
    ("lead", "Team leadership"),
    ("years", "Years of experience"),
    ("agile", "Agile"),
];

/// Extracts a skill set, preferring the scorer and falling back to the heuristic.
pub async fn extract_skills(
    job_description: &str,
    scorer: &dyn Scorer,
    timeout: Duration,
) -> SkillSet {
    if job_description.trim().is_empty() {
        debug!("Empty job description, skipping skill extraction");
        return SkillSet::default();
    }

    let answer = match tokio::time::timeout(timeout, scorer.extract_skills(job_description)).await
    {
        Ok(answer) => answer,
        Err(_) => Err(ScorerError::Timeout(timeout)),
    };

    match answer {
        Ok(skills) => {
            let skills = skills.normalized(MAX_SKILLS_PER_CATEGORY);
            if skills.is_empty() {
                warn!("Scorer returned no skills, using heuristic extraction");
                return heuristic_skills(job_description);
            }
            debug!(
                required = skills.required.len(),
                preferred = skills.preferred.len(),
                keywords = skills.keywords.len(),
                "Skills extracted by scorer"
            );
            skills
        }
        Err(e) => {
            warn!(
                kind = e.kind(),
                retryable = e.is_retryable(),
                "Skill extraction failed, using heuristic extraction: {e}"
            );
            heuristic_skills(job_description)
        }
    }
}

/// Deterministic local extraction: dictionary terms fill `required` then overflow
/// into `preferred`; experience markers become `keywords`.
pub fn heuristic_skills(job_description: &str) -> SkillSet {
    let text = job_description.to_lowercase();

    let found: Vec<String> = SKILL_DICTIONARY
        .iter()
        .filter(|(needle, _)| contains_term(&text, needle))
        .map(|(_, display)| display.to_string())
        .collect();

    let required: Vec<String> = found.iter().take(FALLBACK_REQUIRED_CAP).cloned().collect();
    let preferred: Vec<String> = found
        .iter()
        .skip(FALLBACK_REQUIRED_CAP)
        .take(FALLBACK_PREFERRED_CAP)
        .cloned()
        .collect();
    let keywords: Vec<String> = EXPERIENCE_MARKERS
        .iter()
        .filter(|(marker, _)| text.contains(marker))
        .map(|(_, label)| label.to_string())
        .collect();

    SkillSet {
        required,
        preferred,
        keywords,
    }
}

/// Substring match that refuses to land inside a longer word
/// ("java" does not match "javascript").
fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
