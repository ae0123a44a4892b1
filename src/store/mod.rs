//! Entity storage with SQLite
//!
//! One `MetadataStore` wraps one connection. Writes for a single submission
//! are grouped with [`MetadataStore::transaction`].

mod detection;
mod schema;
mod threads;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

use crate::error::Result;
use crate::source::SubredditAbout;

pub use detection::{DetectionRow, DetectionSpec};
pub use schema::SCHEMA;
pub use threads::{CommentRow, SubmissionListRow, SubmissionRow};

pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    crate::Error::Config(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run `f` inside one transaction: committed when `f` returns `Ok`,
    /// rolled back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // ============================================
    // REDDITORS
    // ============================================

    /// Look up a redditor by username, creating it on first sight.
    ///
    /// `created_utc` is only written when the row is created.
    pub fn get_or_create_redditor(
        &self,
        username: &str,
        created_utc: Option<DateTime<Utc>>,
    ) -> Result<RedditorRow> {
        self.conn.execute(
            "INSERT INTO redditors (username, created_utc) VALUES (?1, ?2)
             ON CONFLICT(username) DO NOTHING",
            params![username, created_utc],
        )?;

        let row = self.conn.query_row(
            "SELECT id, username, created_utc FROM redditors WHERE username = ?",
            params![username],
            redditor_from_row,
        )?;
        Ok(row)
    }

    pub fn find_redditor(&self, username: &str) -> Result<Option<RedditorRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, username, created_utc FROM redditors WHERE username = ?",
                params![username],
                redditor_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn count_redditors(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM redditors", [], |row| row.get(0))?;
        Ok(count)
    }

    // ============================================
    // SUBREDDITS
    // ============================================

    /// Register a subreddit by name, returning its id
    pub fn ensure_subreddit(&self, name: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO subreddits (name, display_name) VALUES (?1, ?1)
             ON CONFLICT(name) DO NOTHING",
            params![name],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM subreddits WHERE name = ?",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn update_subreddit_about(&self, id: i64, about: &SubredditAbout) -> Result<()> {
        self.conn.execute(
            r#"UPDATE subreddits SET
                   display_name = ?2, description = ?3, description_html = ?4,
                   public_description = ?5, created_utc = ?6, over_18 = ?7,
                   subscribers = ?8, can_assign_link_flair = ?9,
                   can_assign_user_flair = ?10, spoilers_enabled = ?11,
                   modified_at = datetime('now')
               WHERE id = ?1"#,
            params![
                id,
                about.display_name,
                about.description,
                about.description_html,
                about.public_description,
                about.created_utc,
                about.over_18,
                about.subscribers,
                about.can_assign_link_flair,
                about.can_assign_user_flair,
                about.spoilers_enabled,
            ],
        )?;
        Ok(())
    }

    pub fn list_subreddits(&self) -> Result<Vec<SubredditRow>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT s.id, s.name, s.display_name, s.subscribers, s.over_18, s.created_utc,
                      (SELECT COUNT(*) FROM submissions sub WHERE sub.subreddit_id = s.id)
               FROM subreddits s
               ORDER BY s.name"#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SubredditRow {
                id: row.get(0)?,
                name: row.get(1)?,
                display_name: row.get(2)?,
                subscribers: row.get(3)?,
                over_18: row.get(4)?,
                created_utc: row.get(5)?,
                submission_count: row.get(6)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ============================================
    // TASK RUNS
    // ============================================

    /// Record the start of a sync or classification pass
    pub fn start_run(&self, kind: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO task_runs (id, kind, status, result, started_at)
             VALUES (?, ?, 'started', 'pending', ?)",
            params![id, kind, Utc::now()],
        )?;
        Ok(id)
    }

    /// Close a run with its summary or error message
    pub fn finish_run(&self, id: &str, outcome: std::result::Result<&str, &str>) -> Result<()> {
        let (result, summary, error) = match outcome {
            Ok(summary) => ("success", Some(summary), None),
            Err(message) => ("error", None, Some(message)),
        };
        self.conn.execute(
            "UPDATE task_runs SET status = 'finished', result = ?2, summary = ?3,
                 error_message = ?4, stopped_at = ?5
             WHERE id = ?1",
            params![id, result, summary, error, Utc::now()],
        )?;
        Ok(())
    }

    pub fn list_runs(&self, limit: usize) -> Result<Vec<RunRow>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT id, kind, status, result, summary, error_message, started_at, stopped_at
               FROM task_runs
               ORDER BY started_at DESC
               LIMIT ?"#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RunRow {
                id: row.get(0)?,
                kind: row.get(1)?,
                status: row.get(2)?,
                result: row.get(3)?,
                summary: row.get(4)?,
                error_message: row.get(5)?,
                started_at: row.get(6)?,
                stopped_at: row.get(7)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn redditor_from_row(row: &rusqlite::Row) -> rusqlite::Result<RedditorRow> {
    Ok(RedditorRow {
        id: row.get(0)?,
        username: row.get(1)?,
        created_utc: row.get(2)?,
    })
}

// ============================================
// ROW TYPES
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct RedditorRow {
    pub id: i64,
    pub username: String,
    pub created_utc: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct SubredditRow {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub subscribers: i64,
    pub over_18: bool,
    pub created_utc: Option<DateTime<Utc>>,
    pub submission_count: i64,
}

#[derive(Debug)]
pub struct RunRow {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub result: String,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}
