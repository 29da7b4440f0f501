//! The text → structure → text pipeline.
//!
//! Extraction turns notes into record drafts, synthesis turns
//! questions into scoped queries, the executor gates those queries
//! against the safety policy, and the summarizer turns rows back into
//! natural language.

pub mod executor;
pub mod extractor;
pub mod summarizer;
pub mod synthesizer;

pub use executor::{QueryExecutor, ScopedQueryTarget};
pub use extractor::Extractor;
pub use summarizer::{NO_MATCHING_RECORDS, Summarizer, SummaryStyle};
pub use synthesizer::QuerySynthesizer;

/// Strip a Markdown code fence from model output, if present. Models
/// routinely wrap JSON or SQL in ``` fences despite instructions.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("[1,2]"), "[1,2]");
        assert_eq!(strip_code_fences("```\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fences("```json\n[1,2]\n```"), "[1,2]");
        assert_eq!(
            strip_code_fences("```sql\nSELECT 1\n```"),
            "SELECT 1"
        );
        assert_eq!(strip_code_fences("  [1,2]  "), "[1,2]");
    }
}
