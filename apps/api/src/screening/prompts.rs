// Prompt constants for the screening scorer.
// Placeholders in `{braces}` are substituted by `LlmScorer` before sending.

/// System prompt for skill extraction.
pub const SKILL_EXTRACTION_SYSTEM: &str = "You are an expert HR analyst. \
    Extract and categorize skills and requirements from job descriptions.";

/// Skill extraction prompt template. Replace `{job_description}` before sending.
pub const SKILL_EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract skills and requirements from the job description below.

Return a JSON object with this EXACT schema (no extra fields):
{
  "required": ["Python", "SQL"],
  "preferred": ["Docker", "Communication"],
  "keywords": ["5+ years experience", "Senior level"]
}

Guidelines:
- "required": technical skills, certifications and hard requirements
- "preferred": nice-to-have skills and soft skills
- "keywords": experience levels, industry terms and other important phrases
- Keep each array to 5-8 items maximum
- Be specific with technology names (e.g. "Python" not "programming")

JOB DESCRIPTION:
{job_description}"#;

/// System prompt for candidate evaluation.
pub const EVALUATION_SYSTEM: &str = "You are an expert HR analyst performing semantic \
    resume screening. Analyze resumes against job requirements using semantic \
    understanding, not just keyword matching.";

/// Candidate evaluation prompt template.
/// Replace: {semantic_instruction}, {job_description}, {skills}, {resume_text}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"{semantic_instruction}

Analyze this resume against the job requirements.

JOB DESCRIPTION:
{job_description}

SKILLS TO EVALUATE: {skills}

RESUME CONTENT:
{resume_text}

Extract the candidate's name and email if present, then evaluate every listed skill.
Return a JSON object with this EXACT schema:
{
  "candidate_name": "Full name from the resume",
  "email": "address if present, otherwise null",
  "overall_match_percentage": 0-100,
  "experience_match_percentage": 0-100,
  "skill_matches": [
    {"skill": "exact skill name from the list", "matched": true, "similarity": 0.0-1.0}
  ],
  "analysis": "Brief 2-3 sentence analysis of candidate fit"
}

Include one skill_matches entry per listed skill. similarity is semantic similarity
where 1.0 is an exact match; report it even when matched is false."#;
