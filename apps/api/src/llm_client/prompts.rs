// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Reminds the model that matching is semantic, not lexical.
pub const SEMANTIC_MATCHING_INSTRUCTION: &str = "\
    Evaluate skills semantically, not by exact keyword: \
    'Machine Learning Engineer' matches 'ML Engineer' and 'AI Engineer'; \
    'Python programming' matches 'Python development' and 'Python 3'; \
    'AWS' matches 'Amazon Web Services' and 'Cloud (AWS)'.";
