//! Thread source trait and snapshot types
//!
//! A source produces point-in-time snapshots of submissions and their fully
//! expanded comment lists. The Reddit HTTP client is the production source;
//! tests plug in in-memory fakes.

mod forest;
mod reddit;
mod wire;

pub use reddit::RedditSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Author attribution as reported upstream
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorRef {
    pub username: String,
    /// Account creation time, when the source supplies it
    pub created_utc: Option<DateTime<Utc>>,
}

impl AuthorRef {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            created_utc: None,
        }
    }
}

/// Snapshot of a submission as fetched
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSnapshot {
    /// Bare id (no `t3_` prefix)
    pub id: String,
    pub author: Option<AuthorRef>,
    pub title: String,
    pub selftext: String,
    pub url: String,
    pub created_utc: DateTime<Utc>,
    /// `None` when the submission was never edited
    pub edited_utc: Option<DateTime<Utc>>,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: i64,
    pub over_18: bool,
    pub spoiler: bool,
    pub stickied: bool,
    pub distinguished: Option<String>,
    pub locked: bool,
    pub saved: bool,
    pub is_original_content: bool,
    pub is_self: bool,
    pub permalink: String,
    pub author_flair_text: Option<String>,
    pub link_flair_text: Option<String>,
    pub link_flair_template_id: Option<String>,
}

/// Snapshot of a single comment as fetched
#[derive(Debug, Clone, PartialEq)]
pub struct CommentSnapshot {
    /// Bare id (no `t1_` prefix)
    pub id: String,
    /// Fullname of the parent: `t3_...` for root comments, `t1_...` otherwise
    pub parent_id: String,
    pub author: Option<AuthorRef>,
    pub body: String,
    pub body_html: String,
    pub created_utc: DateTime<Utc>,
    pub edited_utc: Option<DateTime<Utc>>,
    pub score: i64,
    pub distinguished: Option<String>,
    pub stickied: bool,
    pub saved: bool,
    pub is_submitter: bool,
    pub permalink: String,
}

/// Descriptive subreddit fields from the about endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubredditAbout {
    pub display_name: String,
    pub description: String,
    pub description_html: String,
    pub public_description: String,
    pub created_utc: Option<DateTime<Utc>>,
    pub over_18: bool,
    pub subscribers: i64,
    pub can_assign_link_flair: bool,
    pub can_assign_user_flair: bool,
    pub spoilers_enabled: bool,
}

/// Upstream fetch layer
///
/// Implementations must report throttling as `Error::RateLimited` so the
/// retry controller can tell it apart from other failures.
#[async_trait]
pub trait ThreadSource: Send + Sync {
    /// Newest submissions of a subreddit, newest first
    async fn newest_submissions(&self, subreddit: &str) -> Result<Vec<SubmissionSnapshot>>;

    /// Every comment of a submission with all "load more" placeholders
    /// expanded, parents before children
    async fn expand_comments(&self, submission_id: &str) -> Result<Vec<CommentSnapshot>>;

    /// Descriptive metadata of a subreddit
    async fn subreddit_about(&self, subreddit: &str) -> Result<SubredditAbout>;
}

/// Convert an upstream epoch float into a timestamp (millisecond precision)
pub fn epoch_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}
