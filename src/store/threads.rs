//! Submission and comment persistence

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::MetadataStore;
use crate::error::Result;
use crate::source::{CommentSnapshot, SubmissionSnapshot};
use crate::transcript::{Thread, ThreadComment};

const SUBMISSION_COLUMNS: &str = "id, reddit_id, subreddit_id, author_id, title, selftext, url, \
     created_utc, score, upvote_ratio, num_comments, over_18, spoiler, stickied, distinguished, \
     edited_utc, locked, saved, is_original_content, is_self, permalink, author_flair_text, \
     link_flair_text, link_flair_template_id";

const COMMENT_COLUMNS: &str = "id, reddit_id, submission_id, author_id, parent_id, body, \
     body_html, created_utc, score, distinguished, edited_utc, stickied, saved, is_submitter, \
     permalink";

impl MetadataStore {
    // ============================================
    // SUBMISSIONS
    // ============================================

    pub fn find_submission(&self, reddit_id: &str) -> Result<Option<SubmissionRow>> {
        let sql = format!("SELECT {} FROM submissions WHERE reddit_id = ?", SUBMISSION_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![reddit_id], submission_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn insert_submission(
        &self,
        subreddit_id: i64,
        author_id: Option<i64>,
        s: &SubmissionSnapshot,
    ) -> Result<i64> {
        self.conn.execute(
            r#"INSERT INTO submissions (
                   reddit_id, subreddit_id, author_id, title, selftext, url, created_utc,
                   score, upvote_ratio, num_comments, over_18, spoiler, stickied,
                   distinguished, edited_utc, locked, saved, is_original_content, is_self,
                   permalink, author_flair_text, link_flair_text, link_flair_template_id
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)"#,
            params![
                s.id,
                subreddit_id,
                author_id,
                s.title,
                s.selftext,
                s.url,
                s.created_utc,
                s.score,
                s.upvote_ratio,
                s.num_comments,
                s.over_18,
                s.spoiler,
                s.stickied,
                s.distinguished,
                s.edited_utc,
                s.locked,
                s.saved,
                s.is_original_content,
                s.is_self,
                s.permalink,
                s.author_flair_text,
                s.link_flair_text,
                s.link_flair_template_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrite every fetched attribute of a stored submission
    pub fn update_submission(
        &self,
        id: i64,
        author_id: Option<i64>,
        s: &SubmissionSnapshot,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE submissions SET
                   author_id = ?2, title = ?3, selftext = ?4, url = ?5, created_utc = ?6,
                   score = ?7, upvote_ratio = ?8, num_comments = ?9, over_18 = ?10,
                   spoiler = ?11, stickied = ?12, distinguished = ?13, edited_utc = ?14,
                   locked = ?15, saved = ?16, is_original_content = ?17, is_self = ?18,
                   permalink = ?19, author_flair_text = ?20, link_flair_text = ?21,
                   link_flair_template_id = ?22, modified_at = datetime('now')
               WHERE id = ?1"#,
            params![
                id,
                author_id,
                s.title,
                s.selftext,
                s.url,
                s.created_utc,
                s.score,
                s.upvote_ratio,
                s.num_comments,
                s.over_18,
                s.spoiler,
                s.stickied,
                s.distinguished,
                s.edited_utc,
                s.locked,
                s.saved,
                s.is_original_content,
                s.is_self,
                s.permalink,
                s.author_flair_text,
                s.link_flair_text,
                s.link_flair_template_id,
            ],
        )?;
        Ok(())
    }

    /// Refresh only the counters and flags that change without an edit
    pub fn refresh_submission_metadata(&self, id: i64, s: &SubmissionSnapshot) -> Result<()> {
        self.conn.execute(
            r#"UPDATE submissions SET
                   score = ?2, upvote_ratio = ?3, num_comments = ?4, stickied = ?5,
                   locked = ?6, saved = ?7, modified_at = datetime('now')
               WHERE id = ?1"#,
            params![id, s.score, s.upvote_ratio, s.num_comments, s.stickied, s.locked, s.saved],
        )?;
        Ok(())
    }

    /// Submission ids, newest first, optionally restricted to one subreddit
    pub fn submission_ids(&self, subreddit: Option<&str>) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT s.id FROM submissions s
               JOIN subreddits r ON r.id = s.subreddit_id
               WHERE ?1 IS NULL OR r.name = ?1
               ORDER BY s.created_utc DESC, s.id DESC"#,
        )?;
        let ids = stmt.query_map(params![subreddit], |row| row.get(0))?;
        Ok(ids.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_submissions(
        &self,
        subreddit: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SubmissionListRow>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT s.id, s.reddit_id, r.name, u.username, s.title, s.score,
                      s.num_comments,
                      (SELECT COUNT(*) FROM comments c WHERE c.submission_id = s.id),
                      s.created_utc
               FROM submissions s
               JOIN subreddits r ON r.id = s.subreddit_id
               LEFT JOIN redditors u ON u.id = s.author_id
               WHERE ?1 IS NULL OR r.name = ?1
               ORDER BY s.created_utc DESC, s.id DESC
               LIMIT ?2"#,
        )?;

        let rows = stmt.query_map(params![subreddit, limit as i64], |row| {
            Ok(SubmissionListRow {
                id: row.get(0)?,
                reddit_id: row.get(1)?,
                subreddit: row.get(2)?,
                author: row.get(3)?,
                title: row.get(4)?,
                score: row.get(5)?,
                num_comments: row.get(6)?,
                stored_comments: row.get(7)?,
                created_utc: row.get(8)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ============================================
    // COMMENTS
    // ============================================

    /// All stored comments of a submission in insertion order
    pub fn comments_for_submission(&self, submission_id: i64) -> Result<Vec<CommentRow>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE submission_id = ? ORDER BY id",
            COMMENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![submission_id], comment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn find_comment(&self, reddit_id: &str) -> Result<Option<CommentRow>> {
        let sql = format!("SELECT {} FROM comments WHERE reddit_id = ?", COMMENT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![reddit_id], comment_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn insert_comment(
        &self,
        submission_id: i64,
        author_id: Option<i64>,
        parent_id: Option<i64>,
        c: &CommentSnapshot,
    ) -> Result<i64> {
        self.conn.execute(
            r#"INSERT INTO comments (
                   reddit_id, submission_id, author_id, parent_id, body, body_html,
                   created_utc, score, distinguished, edited_utc, stickied, saved,
                   is_submitter, permalink
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                c.id,
                submission_id,
                author_id,
                parent_id,
                c.body,
                c.body_html,
                c.created_utc,
                c.score,
                c.distinguished,
                c.edited_utc,
                c.stickied,
                c.saved,
                c.is_submitter,
                c.permalink,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_comment(
        &self,
        id: i64,
        author_id: Option<i64>,
        parent_id: Option<i64>,
        c: &CommentSnapshot,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE comments SET
                   author_id = ?2, parent_id = ?3, body = ?4, body_html = ?5,
                   created_utc = ?6, score = ?7, distinguished = ?8, edited_utc = ?9,
                   stickied = ?10, saved = ?11, is_submitter = ?12, permalink = ?13,
                   modified_at = datetime('now')
               WHERE id = ?1"#,
            params![
                id,
                author_id,
                parent_id,
                c.body,
                c.body_html,
                c.created_utc,
                c.score,
                c.distinguished,
                c.edited_utc,
                c.stickied,
                c.saved,
                c.is_submitter,
                c.permalink,
            ],
        )?;
        Ok(())
    }

    pub fn refresh_comment_metadata(&self, id: i64, c: &CommentSnapshot) -> Result<()> {
        self.conn.execute(
            r#"UPDATE comments SET score = ?2, stickied = ?3, saved = ?4,
                   modified_at = datetime('now')
               WHERE id = ?1"#,
            params![id, c.score, c.stickied, c.saved],
        )?;
        Ok(())
    }

    // ============================================
    // THREAD LOADING
    // ============================================

    /// Load a submission and its comments with author names resolved
    pub fn load_thread(&self, submission_id: i64) -> Result<Option<Thread>> {
        let head = self
            .conn
            .query_row(
                r#"SELECT s.reddit_id, s.title, s.selftext, u.username
                   FROM submissions s
                   LEFT JOIN redditors u ON u.id = s.author_id
                   WHERE s.id = ?"#,
                params![submission_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((reddit_id, title, selftext, author)) = head else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            r#"SELECT c.id, c.parent_id, u.username, c.body, c.created_utc
               FROM comments c
               LEFT JOIN redditors u ON u.id = c.author_id
               WHERE c.submission_id = ?
               ORDER BY c.id"#,
        )?;
        let comments = stmt
            .query_map(params![submission_id], |row| {
                Ok(ThreadComment {
                    id: row.get(0)?,
                    parent_id: row.get(1)?,
                    author: row.get(2)?,
                    body: row.get(3)?,
                    created_utc: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(Thread {
            submission_id,
            reddit_id,
            title,
            author,
            selftext,
            comments,
        }))
    }

    pub fn count_comments(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn submission_from_row(row: &Row) -> rusqlite::Result<SubmissionRow> {
    Ok(SubmissionRow {
        id: row.get(0)?,
        reddit_id: row.get(1)?,
        subreddit_id: row.get(2)?,
        author_id: row.get(3)?,
        title: row.get(4)?,
        selftext: row.get(5)?,
        url: row.get(6)?,
        created_utc: row.get(7)?,
        score: row.get(8)?,
        upvote_ratio: row.get(9)?,
        num_comments: row.get(10)?,
        over_18: row.get(11)?,
        spoiler: row.get(12)?,
        stickied: row.get(13)?,
        distinguished: row.get(14)?,
        edited_utc: row.get(15)?,
        locked: row.get(16)?,
        saved: row.get(17)?,
        is_original_content: row.get(18)?,
        is_self: row.get(19)?,
        permalink: row.get(20)?,
        author_flair_text: row.get(21)?,
        link_flair_text: row.get(22)?,
        link_flair_template_id: row.get(23)?,
    })
}

fn comment_from_row(row: &Row) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        reddit_id: row.get(1)?,
        submission_id: row.get(2)?,
        author_id: row.get(3)?,
        parent_id: row.get(4)?,
        body: row.get(5)?,
        body_html: row.get(6)?,
        created_utc: row.get(7)?,
        score: row.get(8)?,
        distinguished: row.get(9)?,
        edited_utc: row.get(10)?,
        stickied: row.get(11)?,
        saved: row.get(12)?,
        is_submitter: row.get(13)?,
        permalink: row.get(14)?,
    })
}

// ============================================
// ROW TYPES
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRow {
    pub id: i64,
    pub reddit_id: String,
    pub subreddit_id: i64,
    pub author_id: Option<i64>,
    pub title: String,
    pub selftext: String,
    pub url: String,
    pub created_utc: DateTime<Utc>,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: i64,
    pub over_18: bool,
    pub spoiler: bool,
    pub stickied: bool,
    pub distinguished: Option<String>,
    pub edited_utc: Option<DateTime<Utc>>,
    pub locked: bool,
    pub saved: bool,
    pub is_original_content: bool,
    pub is_self: bool,
    pub permalink: String,
    pub author_flair_text: Option<String>,
    pub link_flair_text: Option<String>,
    pub link_flair_template_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRow {
    pub id: i64,
    pub reddit_id: String,
    pub submission_id: i64,
    pub author_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub body: String,
    pub body_html: String,
    pub created_utc: DateTime<Utc>,
    pub score: i64,
    pub distinguished: Option<String>,
    pub edited_utc: Option<DateTime<Utc>>,
    pub stickied: bool,
    pub saved: bool,
    pub is_submitter: bool,
    pub permalink: String,
}

/// Summary line for `list`
#[derive(Debug)]
pub struct SubmissionListRow {
    pub id: i64,
    pub reddit_id: String,
    pub subreddit: String,
    pub author: Option<String>,
    pub title: String,
    pub score: i64,
    pub num_comments: i64,
    pub stored_comments: i64,
    pub created_utc: DateTime<Utc>,
}
