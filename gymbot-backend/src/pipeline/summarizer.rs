//! Result summarization — rows plus the original question back to
//! natural language.

use std::sync::Arc;

use crate::ai::TextCompleter;
use crate::db::Row;
use crate::errors::PipelineError;

/// Fixed reply for an empty result set. Returned without a model call
/// so the empty case stays deterministic.
pub const NO_MATCHING_RECORDS: &str = "No matching records were found.";

const SUMMARY_INSTRUCTION: &str = "\
You summarize workout-log query results. Work only from the rows provided — \
never invent data that is not in them. Keep the reply compact and concrete.";

/// What the summary is for: answering the question, or proposing
/// workouts from the retrieved history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStyle {
    Answer,
    Suggestion,
}

impl SummaryStyle {
    fn request_line(&self) -> &'static str {
        match self {
            SummaryStyle::Answer => "Answer the question using these rows.",
            SummaryStyle::Suggestion => {
                "Use these rows as training history and suggest what to do next."
            }
        }
    }
}

pub struct Summarizer {
    completer: Arc<dyn TextCompleter>,
}

impl Summarizer {
    pub fn new(completer: Arc<dyn TextCompleter>) -> Self {
        Self { completer }
    }

    pub async fn summarize(
        &self,
        question: &str,
        rows: &[Row],
        style: SummaryStyle,
    ) -> Result<String, PipelineError> {
        if rows.is_empty() {
            return Ok(NO_MATCHING_RECORDS.to_string());
        }

        let serialized: Vec<String> = rows
            .iter()
            .map(|row| serde_json::Value::Object(row.clone()).to_string())
            .collect();

        let prompt = format!(
            "{}\n\nQuestion: {}\n\nRows:\n{}",
            style.request_line(),
            question,
            serialized.join("\n")
        );

        let answer = self.completer.complete(SUMMARY_INSTRUCTION, &prompt).await?;
        if answer.trim().is_empty() {
            return Ok(NO_MATCHING_RECORDS.to_string());
        }
        Ok(answer)
    }
}
