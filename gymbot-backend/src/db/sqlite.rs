use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::sync::Mutex;

use crate::models::exercise;

/// Append-only record store: one SQLite connection behind a mutex.
/// There is no update or delete path — corrections are new records.
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn new(db_path: &str) -> SqliteResult<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(db_path)?;
        conn.execute(&exercise::create_table_sql(), [])?;

        log::info!("[DB] Opened record store at {}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
