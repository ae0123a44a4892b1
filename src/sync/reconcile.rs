//! Reconciliation of fetched threads against stored rows
//!
//! A fetched submission and its expanded comment list are written in one
//! pass. Existing rows get either a full overwrite (the upstream edit time
//! moved forward) or a metadata refresh (score and flags only). Parents are
//! resolved through a per-submission [`CommentCache`], seeded from the store
//! and extended with every comment created during the pass.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::author;
use crate::error::{Error, Result};
use crate::fullname::{self, Kind};
use crate::source::{CommentSnapshot, SubmissionSnapshot};
use crate::store::MetadataStore;

/// What happened to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    /// All fetched fields written
    Updated,
    /// Only volatile metadata written
    Refreshed,
}

/// Per-outcome comment counts for one submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentTally {
    pub created: usize,
    pub updated: usize,
    pub refreshed: usize,
}

impl CommentTally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Refreshed => self.refreshed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.refreshed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadReport {
    pub submission_id: i64,
    pub submission: Outcome,
    pub comments: CommentTally,
}

/// True when the fetched edit time warrants overwriting every field:
/// it is present and either nothing is stored or it is strictly newer.
pub fn needs_full_update(
    fetched: Option<DateTime<Utc>>,
    stored: Option<DateTime<Utc>>,
) -> bool {
    match (fetched, stored) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(fetched), Some(stored)) => fetched > stored,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CachedComment {
    id: i64,
    edited_utc: Option<DateTime<Utc>>,
}

/// Stored comments of one submission keyed by bare id
#[derive(Debug, Default)]
pub struct CommentCache {
    entries: HashMap<String, CachedComment>,
}

impl CommentCache {
    /// Seed the cache with every stored comment of a submission
    pub fn load(store: &MetadataStore, submission_id: i64) -> Result<Self> {
        let entries = store
            .comments_for_submission(submission_id)?
            .into_iter()
            .map(|row| {
                (
                    row.reddit_id,
                    CachedComment {
                        id: row.id,
                        edited_utc: row.edited_utc,
                    },
                )
            })
            .collect();
        Ok(Self { entries })
    }

    /// Store id of a cached comment
    pub fn id_of(&self, reddit_id: &str) -> Option<i64> {
        self.entries.get(reddit_id).map(|c| c.id)
    }

    fn get(&self, reddit_id: &str) -> Option<CachedComment> {
        self.entries.get(reddit_id).copied()
    }

    fn insert(&mut self, reddit_id: &str, id: i64, edited_utc: Option<DateTime<Utc>>) {
        self.entries
            .insert(reddit_id.to_string(), CachedComment { id, edited_utc });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Create or update the submission row. Returns its store id.
pub fn reconcile_submission(
    store: &MetadataStore,
    subreddit_id: i64,
    snapshot: &SubmissionSnapshot,
) -> Result<(i64, Outcome)> {
    let Some(existing) = store.find_submission(&snapshot.id)? else {
        let author_id = author::resolve(store, snapshot.author.as_ref())?;
        let id = store.insert_submission(subreddit_id, author_id, snapshot)?;
        debug!(submission = %snapshot.id, "created submission");
        return Ok((id, Outcome::Created));
    };

    if needs_full_update(snapshot.edited_utc, existing.edited_utc) {
        let author_id = author::resolve(store, snapshot.author.as_ref())?;
        store.update_submission(existing.id, author_id, snapshot)?;
        debug!(submission = %snapshot.id, "submission edited, full update");
        Ok((existing.id, Outcome::Updated))
    } else {
        store.refresh_submission_metadata(existing.id, snapshot)?;
        Ok((existing.id, Outcome::Refreshed))
    }
}

/// Write every fetched comment of a submission, parents before children.
///
/// Fails with `Error::OrderingViolation` when a comment points at a parent
/// that is neither the submission nor a comment already in the cache.
pub fn reconcile_comments(
    store: &MetadataStore,
    submission_id: i64,
    submission_reddit_id: &str,
    comments: &[CommentSnapshot],
    cache: &mut CommentCache,
) -> Result<CommentTally> {
    let submission_fullname = fullname::prefix(submission_reddit_id, Kind::Submission);
    let mut tally = CommentTally::default();

    for comment in comments {
        let outcome = match cache.get(&comment.id) {
            Some(cached) if needs_full_update(comment.edited_utc, cached.edited_utc) => {
                let parent_id = resolve_parent(cache, &submission_fullname, comment)?;
                let author_id = author::resolve(store, comment.author.as_ref())?;
                store.update_comment(cached.id, author_id, parent_id, comment)?;
                cache.insert(&comment.id, cached.id, comment.edited_utc);
                Outcome::Updated
            }
            Some(cached) => {
                store.refresh_comment_metadata(cached.id, comment)?;
                Outcome::Refreshed
            }
            None => {
                let parent_id = resolve_parent(cache, &submission_fullname, comment)?;
                let author_id = author::resolve(store, comment.author.as_ref())?;
                let id = store.insert_comment(submission_id, author_id, parent_id, comment)?;
                cache.insert(&comment.id, id, comment.edited_utc);
                Outcome::Created
            }
        };
        tally.record(outcome);
    }

    Ok(tally)
}

fn resolve_parent(
    cache: &CommentCache,
    submission_fullname: &str,
    comment: &CommentSnapshot,
) -> Result<Option<i64>> {
    if comment.parent_id == submission_fullname {
        return Ok(None);
    }
    cache
        .id_of(fullname::strip(&comment.parent_id))
        .map(Some)
        .ok_or_else(|| Error::OrderingViolation {
            comment: comment.id.clone(),
            parent: comment.parent_id.clone(),
        })
}

/// Reconcile a submission and its comments inside one transaction
pub fn reconcile_thread(
    store: &MetadataStore,
    subreddit_id: i64,
    snapshot: &SubmissionSnapshot,
    comments: &[CommentSnapshot],
) -> Result<ThreadReport> {
    store.transaction(|store| {
        let (submission_id, outcome) = reconcile_submission(store, subreddit_id, snapshot)?;
        let mut cache = CommentCache::load(store, submission_id)?;
        let tally = reconcile_comments(store, submission_id, &snapshot.id, comments, &mut cache)?;
        Ok(ThreadReport {
            submission_id,
            submission: outcome,
            comments: tally,
        })
    })
}
