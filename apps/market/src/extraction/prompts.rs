// Prompt constants for skill extraction.

/// System prompt for skill extraction — enforces a bare JSON array.
pub const EXTRACTION_SYSTEM: &str = "You are an expert technical recruiter. \
    You extract technical skills from job postings. \
    You MUST respond with a valid JSON array of strings only. \
    Do NOT use markdown code fences. \
    Do NOT include explanations.";

/// Extraction prompt template. Replace `{skills}` and `{posting}` before sending.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract technical skills from this job posting.

RULES:
1. ONLY return skills from this list: {skills}
2. Return ONLY a JSON array, nothing else
3. Ignore skills not in the list

JOB POSTING:
{posting}

RETURN FORMAT (JSON array only):
["Python", "React", "AWS"]"#;

pub fn build_extraction_prompt(posting: &str, allowed: &[String]) -> String {
    EXTRACTION_PROMPT_TEMPLATE
        .replace("{skills}", &allowed.join(", "))
        .replace("{posting}", posting)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_allowed_skills_and_posting() {
        let prompt = build_extraction_prompt(
            "We use Rust daily",
            &["Rust".to_string(), "Go".to_string()],
        );
        assert!(prompt.contains("ONLY return skills from this list: Rust, Go"));
        assert!(prompt.contains("We use Rust daily"));
        assert!(!prompt.contains("{skills}"));
        assert!(!prompt.contains("{posting}"));
    }
}
