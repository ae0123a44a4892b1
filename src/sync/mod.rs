//! Subreddit synchronization
//!
//! A pass walks every stored subreddit, lists its newest submissions and
//! reconciles each one (submission row plus expanded comments) as a single
//! retried unit. A failing submission is logged and skipped; a rate limit
//! on the listing itself ends the pass.

pub mod author;
pub mod reconcile;
pub mod retry;
pub mod supervisor;

use std::fmt;

use tracing::{error, info, warn};

use crate::error::Result;
use crate::source::{SubmissionSnapshot, ThreadSource};
use crate::store::MetadataStore;

pub use reconcile::{reconcile_thread, CommentTally, Outcome, ThreadReport};
pub use retry::{retry_on_rate_limit, RetryPolicy};
pub use supervisor::{run_forever, Schedule};

/// Totals of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub subreddits: usize,
    pub submissions_created: usize,
    pub submissions_updated: usize,
    pub submissions_refreshed: usize,
    pub comments: CommentTally,
    pub failed_submissions: usize,
    pub failed_subreddits: usize,
}

impl SyncReport {
    fn record(&mut self, thread: &ThreadReport) {
        match thread.submission {
            Outcome::Created => self.submissions_created += 1,
            Outcome::Updated => self.submissions_updated += 1,
            Outcome::Refreshed => self.submissions_refreshed += 1,
        }
        self.comments.created += thread.comments.created;
        self.comments.updated += thread.comments.updated;
        self.comments.refreshed += thread.comments.refreshed;
    }

    fn merge(&mut self, other: &SyncReport) {
        self.subreddits += other.subreddits;
        self.submissions_created += other.submissions_created;
        self.submissions_updated += other.submissions_updated;
        self.submissions_refreshed += other.submissions_refreshed;
        self.comments.created += other.comments.created;
        self.comments.updated += other.comments.updated;
        self.comments.refreshed += other.comments.refreshed;
        self.failed_submissions += other.failed_submissions;
        self.failed_subreddits += other.failed_subreddits;
    }

    pub fn submissions(&self) -> usize {
        self.submissions_created + self.submissions_updated + self.submissions_refreshed
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subreddits, {} submissions ({} new, {} edited), {} comments ({} new, {} edited), {} failed",
            self.subreddits,
            self.submissions(),
            self.submissions_created,
            self.submissions_updated,
            self.comments.total(),
            self.comments.created,
            self.comments.updated,
            self.failed_submissions + self.failed_subreddits,
        )
    }
}

/// Fetch comments and reconcile one submission
async fn sync_submission(
    store: &MetadataStore,
    source: &dyn ThreadSource,
    subreddit_id: i64,
    snapshot: &SubmissionSnapshot,
) -> Result<ThreadReport> {
    // Expansion happens before the transaction opens
    let comments = source.expand_comments(&snapshot.id).await?;
    reconcile_thread(store, subreddit_id, snapshot, &comments)
}

/// Sync the newest submissions of one subreddit
pub async fn sync_subreddit(
    store: &MetadataStore,
    source: &dyn ThreadSource,
    policy: RetryPolicy,
    name: &str,
) -> Result<SyncReport> {
    let subreddit_id = store.ensure_subreddit(name)?;
    let snapshots = source.newest_submissions(name).await?;
    info!(subreddit = %name, submissions = snapshots.len(), "syncing subreddit");

    let mut report = SyncReport {
        subreddits: 1,
        ..Default::default()
    };

    for snapshot in &snapshots {
        let label = format!("submission {}", snapshot.id);
        let result = retry_on_rate_limit(policy, &label, move || {
            sync_submission(store, source, subreddit_id, snapshot)
        })
        .await;

        match result {
            Ok(thread) => report.record(&thread),
            Err(e) => {
                error!(subreddit = %name, submission = %snapshot.id, "sync failed: {}", e);
                report.failed_submissions += 1;
            }
        }
    }

    Ok(report)
}

/// One full pass over every stored subreddit.
///
/// `seed` names are registered first. The pass is recorded in `task_runs`.
pub async fn sync_all(
    store: &MetadataStore,
    source: &dyn ThreadSource,
    policy: RetryPolicy,
    seed: &[String],
) -> Result<SyncReport> {
    for name in seed {
        store.ensure_subreddit(name)?;
    }

    let run_id = store.start_run("sync")?;
    let result = sync_subreddits(store, source, policy).await;

    match &result {
        Ok(report) => {
            info!("sync finished: {}", report);
            store.finish_run(&run_id, Ok(report.to_string().as_str()))?;
        }
        Err(e) => {
            store.finish_run(&run_id, Err(e.to_string().as_str()))?;
        }
    }
    result
}

async fn sync_subreddits(
    store: &MetadataStore,
    source: &dyn ThreadSource,
    policy: RetryPolicy,
) -> Result<SyncReport> {
    let mut total = SyncReport::default();

    for subreddit in store.list_subreddits()? {
        match sync_subreddit(store, source, policy, &subreddit.name).await {
            Ok(report) => total.merge(&report),
            Err(e) if e.is_rate_limited() => {
                warn!(subreddit = %subreddit.name, "listing rate limited, ending pass");
                return Err(e);
            }
            Err(e) => {
                error!(subreddit = %subreddit.name, "listing failed: {}", e);
                total.failed_subreddits += 1;
            }
        }
    }

    Ok(total)
}

/// Refresh descriptive subreddit fields from the about endpoint
pub async fn refresh_subreddit(
    store: &MetadataStore,
    source: &dyn ThreadSource,
    name: &str,
) -> Result<()> {
    let id = store.ensure_subreddit(name)?;
    let about = source.subreddit_about(name).await?;
    store.update_subreddit_about(id, &about)?;
    info!(subreddit = %name, subscribers = about.subscribers, "refreshed subreddit");
    Ok(())
}
