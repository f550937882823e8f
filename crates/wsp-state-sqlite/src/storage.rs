use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;
use wsp_core::now_unix;
use wsp_live::{Disposer, Notifier};
use wsp_workspace::{KeyCallback, LocalState};

/// `LocalState` persisted in a SQLite file, one row per key.
pub struct SqliteLocalState {
    conn: Mutex<Connection>,
    changed: Notifier<String>,
}

impl SqliteLocalState {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path).with_context(|| format!("open sqlite db {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory sqlite db")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql).context("apply local_state schema")?;
        Ok(Self { conn: Mutex::new(conn), changed: Notifier::new() })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalState for SqliteLocalState {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn()
            .query_row("SELECT value_json FROM local_state WHERE key = ?1", params![key], |r| r.get(0))
            .optional()?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s).with_context(|| format!("decode local state {key}"))?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Option<Value>) -> Result<()> {
        {
            let conn = self.conn();
            match &value {
                Some(v) => {
                    conn.execute(
                        "INSERT INTO local_state(key, value_json, updated_at) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
                        params![key, serde_json::to_string(v)?, now_unix()],
                    )?;
                }
                None => {
                    conn.execute("DELETE FROM local_state WHERE key = ?1", params![key])?;
                }
            }
        }
        debug!(key, removed = value.is_none(), "local state written");
        self.changed.emit(&key.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key FROM local_state ORDER BY key")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut keys = vec![];
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn on_change(&self, handler: KeyCallback) -> Disposer {
        self.changed.on(move |key: &String| handler(key.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn sqlite_open_and_migrate() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("state.db");
        let _ = SqliteLocalState::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("state.db");
        {
            let state = SqliteLocalState::open(&db_path).unwrap();
            state.set("page:p1:mode", Some(json!("canvas"))).unwrap();
        }
        let state = SqliteLocalState::open(&db_path).unwrap();
        assert_eq!(state.get("page:p1:mode").unwrap(), Some(json!("canvas")));
        assert_eq!(state.keys().unwrap(), vec!["page:p1:mode"]);
    }

    #[test]
    fn overwrite_and_delete() {
        let state = SqliteLocalState::open_in_memory().unwrap();
        state.set("k", Some(json!({"a": 1}))).unwrap();
        state.set("k", Some(json!({"a": 2}))).unwrap();
        assert_eq!(state.get("k").unwrap(), Some(json!({"a": 2})));
        state.set("k", None).unwrap();
        assert_eq!(state.get("k").unwrap(), None);
        assert!(state.keys().unwrap().is_empty());
    }

    #[test]
    fn change_notification_after_write() {
        let state = SqliteLocalState::open_in_memory().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let d = state.on_change(Box::new(move |key: &str| s.lock().unwrap().push(key.to_string())));
        state.set("x", Some(json!(true))).unwrap();
        d.dispose();
        state.set("y", Some(json!(true))).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["x"]);
    }

    #[test]
    fn corrupt_value_is_an_error() {
        let state = SqliteLocalState::open_in_memory().unwrap();
        state
            .conn()
            .execute("INSERT INTO local_state(key, value_json, updated_at) VALUES ('bad', '{not json', 0)", [])
            .unwrap();
        assert!(state.get("bad").is_err());
    }
}
