//! Query synthesis — natural-language question to a scoped read query.

use std::sync::Arc;

use crate::ai::TextCompleter;
use crate::errors::PipelineError;
use crate::models::QuerySpec;
use crate::models::exercise;

use super::strip_code_fences;

const SYNTH_INSTRUCTION: &str = "\
You generate SQLite queries over a workout log. Reply with exactly one \
read-only SELECT statement and nothing else — no comments, no prose, no code \
fences. The query must filter on the user_id you are given and must touch no \
other table.";

/// Turns one question into a `QuerySpec` via a single model call. Only
/// the shape of the output is checked here; the executor re-checks
/// every safety property, because an instruction to a non-deterministic
/// generator is not a guarantee.
pub struct QuerySynthesizer {
    completer: Arc<dyn TextCompleter>,
}

impl QuerySynthesizer {
    pub fn new(completer: Arc<dyn TextCompleter>) -> Self {
        Self { completer }
    }

    pub async fn synthesize(
        &self,
        user_id: &str,
        question: &str,
    ) -> Result<QuerySpec, PipelineError> {
        let prompt = synthesis_prompt(user_id, question);
        let raw = self.completer.complete(SYNTH_INSTRUCTION, &prompt).await?;

        let sql = strip_code_fences(&raw)
            .trim()
            .trim_end_matches(';')
            .trim()
            .to_string();

        if sql.is_empty() {
            return Err(PipelineError::Synthesis("model returned no query".to_string()));
        }
        if sql.contains(';') {
            return Err(PipelineError::Synthesis(
                "model returned more than one statement".to_string(),
            ));
        }

        log::debug!("[SYNTH] {}", sql);
        Ok(QuerySpec {
            user_id: user_id.to_string(),
            sql,
        })
    }
}

/// Build the synthesis prompt: the schema description (generated from
/// the same source as the DDL), the caller's user id, and the question.
fn synthesis_prompt(user_id: &str, question: &str) -> String {
    format!(
        "{}\nGenerate a query for user_id '{}' answering the question below. \
         Return only the query.\n\nQuestion: {}",
        exercise::schema_description(),
        user_id,
        question
    )
}
