//! Command dispatcher — the boundary between transport and pipeline.
//!
//! Every failure is converted to a fixed reply here; nothing
//! propagates out, and a failed command never blocks later ones.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ai::TextCompleter;
use crate::db::Database;
use crate::errors::PipelineError;
use crate::models::ExerciseRecord;
use crate::pipeline::{Extractor, QueryExecutor, QuerySynthesizer, Summarizer, SummaryStyle};

use super::types::{CommandKind, NormalizedCommand};

/// Static capability description for /start, /help, and anything the
/// bot does not recognize.
pub const CAPABILITY_TEXT: &str = "\
I keep your workout log.\n\
/note <text> — save a workout note (e.g. \"3 sets of 10 bench press at 60kg\")\n\
/query <text> — ask a question about your logged workouts\n\
/suggest <text> — get suggestions based on your training history";

const NOTHING_TO_SAVE: &str = "I couldn't find any exercises in that note, so nothing was saved.";

/// Routes commands through the pipeline. One command per user at a
/// time: a second command from the same user queues on that user's
/// lock while other users proceed concurrently.
pub struct CommandDispatcher {
    db: Arc<Database>,
    extractor: Extractor,
    synthesizer: QuerySynthesizer,
    executor: QueryExecutor,
    summarizer: Summarizer,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CommandDispatcher {
    pub fn new(db: Arc<Database>, completer: Arc<dyn TextCompleter>) -> Self {
        Self {
            db,
            extractor: Extractor::new(completer.clone()),
            synthesizer: QuerySynthesizer::new(completer.clone()),
            executor: QueryExecutor::new(),
            summarizer: Summarizer::new(completer),
            user_locks: DashMap::new(),
        }
    }

    /// Handle one command and produce the reply text.
    pub async fn dispatch(&self, command: NormalizedCommand) -> String {
        let lock = self
            .user_locks
            .entry(command.user_id.clone())
            .or_default()
            .clone();
        let _serialized = lock.lock().await;

        match &command.kind {
            CommandKind::Start | CommandKind::Help => CAPABILITY_TEXT.to_string(),
            CommandKind::Unknown(name) => {
                log::debug!("[DISPATCH] Unknown command '{}' from {}", name, command.user_id);
                CAPABILITY_TEXT.to_string()
            }
            CommandKind::Note(text) => self
                .handle_note(&command.user_id, text)
                .await
                .unwrap_or_else(|e| failure_reply("note", &command.user_id, e)),
            CommandKind::Query(text) => self
                .handle_question(&command.user_id, text, SummaryStyle::Answer)
                .await
                .unwrap_or_else(|e| failure_reply("query", &command.user_id, e)),
            CommandKind::Suggest(text) => self
                .handle_question(&command.user_id, text, SummaryStyle::Suggestion)
                .await
                .unwrap_or_else(|e| failure_reply("suggest", &command.user_id, e)),
        }
    }

    async fn handle_note(&self, user_id: &str, text: &str) -> Result<String, PipelineError> {
        if text.trim().is_empty() {
            return Ok(CAPABILITY_TEXT.to_string());
        }

        let drafts = self.extractor.extract(text).await?;
        if drafts.is_empty() {
            return Ok(NOTHING_TO_SAVE.to_string());
        }

        let records = self.db.insert_records(user_id, &drafts)?;
        Ok(confirmation(&records))
    }

    async fn handle_question(
        &self,
        user_id: &str,
        text: &str,
        style: SummaryStyle,
    ) -> Result<String, PipelineError> {
        if text.trim().is_empty() {
            return Ok(CAPABILITY_TEXT.to_string());
        }

        let query = self.synthesizer.synthesize(user_id, text).await?;
        let rows = self.executor.validate_and_run(self.db.as_ref(), &query)?;
        self.summarizer.summarize(text, &rows, style).await
    }
}

/// Confirmation listing the saved fields, one line per exercise.
fn confirmation(records: &[ExerciseRecord]) -> String {
    let mut reply = String::from("Saved:\n");
    for record in records {
        reply.push_str(&format!("- {}\n", record.summary_line()));
    }
    reply.trim_end().to_string()
}

fn failure_reply(command: &str, user_id: &str, err: PipelineError) -> String {
    log::warn!("[DISPATCH] /{} failed for user {}: {}", command, user_id, err);
    err.user_reply().to_string()
}
