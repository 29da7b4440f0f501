//! Note extraction — free text to structured exercise drafts.

use std::sync::Arc;

use crate::ai::TextCompleter;
use crate::errors::PipelineError;
use crate::models::ExerciseDraft;

use super::strip_code_fences;

const EXTRACT_INSTRUCTION: &str = "\
You convert workout notes into structured JSON. Reply with a JSON array only — \
no prose, no code fences. Emit one object per distinct exercise mentioned, in \
the order mentioned, with exactly these fields:\n\
- exercise_name: lowercase string\n\
- sets: integer set count (0 when the exercise has no sets)\n\
- reps: array of integers, one entry per set (empty when not applicable)\n\
- weights: array of numbers in kilograms, one entry per set, or the string \
\"bodyweight\" when the movement is loaded by body weight alone\n\
- duration_secs: number of seconds for duration-based work, otherwise null\n\
- notes: string with any remarks, otherwise empty\n\
Convert pounds to kilograms and minutes to seconds. Leave genuinely absent \
fields empty or null — never guess values the note does not state. If the \
note mentions no exercises, reply with [].";

/// Turns one free-text note into an ordered sequence of record drafts
/// via a single model call. The whole call fails if any draft is
/// malformed — partial batches never reach the store.
pub struct Extractor {
    completer: Arc<dyn TextCompleter>,
}

impl Extractor {
    pub fn new(completer: Arc<dyn TextCompleter>) -> Self {
        Self { completer }
    }

    pub async fn extract(&self, note: &str) -> Result<Vec<ExerciseDraft>, PipelineError> {
        let raw = self.completer.complete(EXTRACT_INSTRUCTION, note).await?;

        let cleaned = strip_code_fences(&raw);
        let mut drafts: Vec<ExerciseDraft> = serde_json::from_str(cleaned).map_err(|e| {
            PipelineError::Parse(format!("model output is not a draft array: {}", e))
        })?;

        for draft in &mut drafts {
            draft.normalize();
            draft.validate().map_err(PipelineError::Parse)?;
        }

        log::debug!("[EXTRACT] {} draft(s) from note", drafts.len());
        Ok(drafts)
    }
}
