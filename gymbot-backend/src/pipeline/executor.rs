//! Query safety gate between an untrusted `QuerySpec` and the store.
//!
//! The synthesizer is instructed to emit a read-only, user-scoped
//! query, but that instruction is not trusted: every query crosses
//! this boundary before it may touch the store. Checks run in order;
//! the first violation wins.

use regex::Regex;

use crate::db::{Database, Row};
use crate::errors::{PipelineError, StoreError};
use crate::models::QuerySpec;
use crate::models::exercise::TABLE_NAME;

/// Statement keywords that modify data or schema. Word-boundary,
/// case-insensitive. attach/detach/pragma and friends are included
/// because they can reach other databases or alter engine state.
const FORBIDDEN_KEYWORDS: &str =
    "insert|update|delete|drop|alter|create|truncate|replace|attach|detach|pragma|vacuum|reindex";

/// The one store operation the executor needs. A seam so tests can
/// prove a rejected query never reaches the store.
pub trait ScopedQueryTarget {
    fn run_scoped_query(&self, user_id: &str, sql: &str) -> Result<Vec<Row>, StoreError>;
}

impl ScopedQueryTarget for Database {
    fn run_scoped_query(&self, user_id: &str, sql: &str) -> Result<Vec<Row>, StoreError> {
        Database::run_scoped_query(self, user_id, sql)
    }
}

pub struct QueryExecutor {
    forbidden: Regex,
    table_refs: Regex,
    scope_literals: Regex,
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self {
            forbidden: Regex::new(&format!(r"(?i)\b(?:{})\b", FORBIDDEN_KEYWORDS)).unwrap(),
            table_refs: Regex::new(r#"(?i)\b(?:from|join)\s+["'`]?([A-Za-z_][A-Za-z0-9_]*)"#)
                .unwrap(),
            scope_literals: Regex::new(
                r#"(?i)\buser_id\b\s*=\s*(?:'([^']*)'|"([^"]*)"|([A-Za-z0-9_.-]+))"#,
            )
            .unwrap(),
        }
    }

    /// Apply the safety policy: forbidden keywords, table allow-list,
    /// user scoping — in that order.
    pub fn validate(&self, query: &QuerySpec) -> Result<(), PipelineError> {
        if let Some(found) = self.forbidden.find(&query.sql) {
            return Err(PipelineError::UnsafeQuery(format!(
                "forbidden keyword '{}'",
                found.as_str()
            )));
        }

        for caps in self.table_refs.captures_iter(&query.sql) {
            let table = &caps[1];
            if !table.eq_ignore_ascii_case(TABLE_NAME) {
                return Err(PipelineError::UnsafeQuery(format!(
                    "query references table '{}'",
                    table
                )));
            }
        }

        let mut scoped = false;
        for caps in self.scope_literals.captures_iter(&query.sql) {
            let literal = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            if literal != query.user_id {
                return Err(PipelineError::UnsafeQuery(
                    "query is scoped to a different user".to_string(),
                ));
            }
            scoped = true;
        }
        if !scoped {
            return Err(PipelineError::UnsafeQuery(
                "query has no user_id filter".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate, then run against the store. Backend failures surface
    /// as execution errors with no retry — generation is
    /// non-deterministic, so regeneration is a caller decision.
    pub fn validate_and_run(
        &self,
        store: &dyn ScopedQueryTarget,
        query: &QuerySpec,
    ) -> Result<Vec<Row>, PipelineError> {
        self.validate(query)?;
        store
            .run_scoped_query(&query.user_id, &query.sql)
            .map_err(PipelineError::from)
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct RecordingStore {
        called: AtomicBool,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                called: AtomicBool::new(false),
            }
        }

        fn was_called(&self) -> bool {
            self.called.load(Ordering::SeqCst)
        }
    }

    impl ScopedQueryTarget for RecordingStore {
        fn run_scoped_query(&self, _user_id: &str, _sql: &str) -> Result<Vec<Row>, StoreError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    fn spec(sql: &str) -> QuerySpec {
        QuerySpec {
            user_id: "42".to_string(),
            sql: sql.to_string(),
        }
    }

    #[test]
    fn test_rejects_delete_before_store_is_touched() {
        let executor = QueryExecutor::new();
        let store = RecordingStore::new();

        let result = executor.validate_and_run(
            &store,
            &spec("DELETE FROM exercise_records WHERE user_id = '42'"),
        );
        assert!(matches!(result, Err(PipelineError::UnsafeQuery(_))));
        assert!(!store.was_called());
    }

    #[test]
    fn test_rejects_keywords_case_insensitively() {
        let executor = QueryExecutor::new();
        for sql in [
            "InSeRt INTO exercise_records VALUES (1)",
            "uPdAtE exercise_records SET sets = 0 WHERE user_id = '42'",
            "DROP TABLE exercise_records",
            "SELECT * FROM exercise_records WHERE user_id = '42'; PRAGMA journal_mode=DELETE",
        ] {
            assert!(
                matches!(executor.validate(&spec(sql)), Err(PipelineError::UnsafeQuery(_))),
                "expected rejection for: {}",
                sql
            );
        }
    }

    #[test]
    fn test_keyword_check_ignores_column_names() {
        // "created_at" contains "create" but is not the keyword
        let executor = QueryExecutor::new();
        let result = executor.validate(&spec(
            "SELECT created_at FROM exercise_records WHERE user_id = '42'",
        ));
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_other_tables() {
        let executor = QueryExecutor::new();
        let store = RecordingStore::new();

        let result = executor
            .validate_and_run(&store, &spec("SELECT * FROM users WHERE user_id = '42'"));
        assert!(matches!(result, Err(PipelineError::UnsafeQuery(_))));
        assert!(!store.was_called());

        let result = executor.validate(&spec(
            "SELECT * FROM exercise_records JOIN sqlite_master ON 1=1 WHERE user_id = '42'",
        ));
        assert!(matches!(result, Err(PipelineError::UnsafeQuery(_))));
    }

    #[test]
    fn test_rejects_missing_user_scope() {
        let executor = QueryExecutor::new();
        let result = executor.validate(&spec("SELECT * FROM exercise_records"));
        assert!(matches!(result, Err(PipelineError::UnsafeQuery(_))));
    }

    #[test]
    fn test_rejects_mismatched_user_literal() {
        let executor = QueryExecutor::new();
        let result = executor.validate(&spec(
            "SELECT * FROM exercise_records WHERE user_id = '43'",
        ));
        assert!(matches!(result, Err(PipelineError::UnsafeQuery(_))));

        // One matching and one foreign literal still fails
        let result = executor.validate(&spec(
            "SELECT * FROM exercise_records WHERE user_id = '42' OR user_id = '43'",
        ));
        assert!(matches!(result, Err(PipelineError::UnsafeQuery(_))));
    }

    #[test]
    fn test_accepts_scoped_select() {
        let executor = QueryExecutor::new();
        let store = RecordingStore::new();

        let rows = executor
            .validate_and_run(
                &store,
                &spec("SELECT exercise_name, sets FROM exercise_records WHERE user_id = '42' ORDER BY created_at DESC"),
            )
            .unwrap();
        assert!(rows.is_empty());
        assert!(store.was_called());
    }

    #[test]
    fn test_accepts_unquoted_numeric_user_literal() {
        let executor = QueryExecutor::new();
        let result = executor.validate(&spec(
            "SELECT COUNT(*) FROM exercise_records WHERE user_id = 42",
        ));
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_placeholder_instead_of_literal() {
        // The synthesizer must echo the literal; a bind placeholder
        // cannot be cross-checked
        let executor = QueryExecutor::new();
        let result = executor.validate(&spec(
            "SELECT * FROM exercise_records WHERE user_id = ?",
        ));
        assert!(matches!(result, Err(PipelineError::UnsafeQuery(_))));
    }
}
