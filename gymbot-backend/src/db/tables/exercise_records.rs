//! Exercise record operations (atomic batch insert, scoped reads)

use chrono::Utc;
use rusqlite::params;

use super::super::Database;
use crate::errors::StoreError;
use crate::models::{ExerciseDraft, ExerciseRecord};

/// One result row from a scoped query, keyed by column name. Kept
/// generic because synthesized queries may select aggregates rather
/// than whole records.
pub type Row = serde_json::Map<String, serde_json::Value>;

impl Database {
    /// Persist a batch of drafts for one user — all or nothing.
    ///
    /// Every draft is validated before any write happens; a single
    /// invalid draft fails the whole batch and commits nothing.
    pub fn insert_records(
        &self,
        user_id: &str,
        drafts: &[ExerciseDraft],
    ) -> Result<Vec<ExerciseRecord>, StoreError> {
        for draft in drafts {
            draft.validate().map_err(StoreError::Persistence)?;
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let mut records = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let reps_json = serde_json::to_string(&draft.reps)
                .map_err(|e| StoreError::Persistence(e.to_string()))?;
            let weights_json = serde_json::to_string(&draft.weights)
                .map_err(|e| StoreError::Persistence(e.to_string()))?;

            tx.execute(
                "INSERT INTO exercise_records (user_id, exercise_name, sets, reps, weights, duration_secs, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user_id,
                    draft.exercise_name,
                    draft.sets,
                    reps_json,
                    weights_json,
                    draft.duration_secs,
                    draft.notes,
                    now_str,
                ],
            )
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

            records.push(ExerciseRecord {
                id: tx.last_insert_rowid(),
                user_id: user_id.to_string(),
                exercise_name: draft.exercise_name.clone(),
                sets: draft.sets,
                reps: draft.reps.clone(),
                weights: draft.weights.clone(),
                duration_secs: draft.duration_secs,
                notes: draft.notes.clone(),
                created_at: now,
            });
        }

        tx.commit()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        log::info!("[DB] Saved {} record(s) for user {}", records.len(), user_id);
        Ok(records)
    }

    /// Execute an already-validated, read-only query scoped to one
    /// user. An empty result set is a normal outcome, not an error.
    pub fn run_scoped_query(&self, user_id: &str, sql: &str) -> Result<Vec<Row>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut raw_rows = stmt
            .query([])
            .map_err(|e| StoreError::Execution(e.to_string()))?;

        let mut rows = Vec::new();
        while let Some(raw) = raw_rows
            .next()
            .map_err(|e| StoreError::Execution(e.to_string()))?
        {
            let mut row = Row::new();
            for (idx, name) in column_names.iter().enumerate() {
                let value = raw
                    .get_ref(idx)
                    .map_err(|e| StoreError::Execution(e.to_string()))?;
                row.insert(name.clone(), value_to_json(value));
            }
            rows.push(row);
        }

        log::debug!(
            "[DB] Scoped query for user {} returned {} row(s)",
            user_id,
            rows.len()
        );
        Ok(rows)
    }
}

fn value_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}
