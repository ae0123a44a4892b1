//! Reddit JSON wire types
//!
//! Only the fields the store keeps are declared; everything else in the
//! payload is ignored by serde.

use serde::{Deserialize, Deserializer};

use super::{epoch_to_utc, AuthorRef, CommentSnapshot, SubmissionSnapshot, SubredditAbout};

/// `{"kind": "Listing", "data": {"after": ..., "children": [...]}}`
#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default = "Vec::new")]
    pub children: Vec<T>,
}

/// Wrapper for a listing of submissions
#[derive(Debug, Deserialize)]
pub(crate) struct LinkThing {
    pub data: RawSubmission,
}

/// Entry of a comment listing
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub(crate) enum Thing {
    #[serde(rename = "t1")]
    Comment(RawComment),
    #[serde(rename = "more")]
    More(RawMore),
}

/// `edited` is `false` or an epoch float
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(crate) enum Edited {
    Flag(bool),
    At(f64),
}

impl Edited {
    fn epoch(self) -> Option<f64> {
        match self {
            Edited::At(secs) => Some(secs),
            Edited::Flag(_) => None,
        }
    }
}

impl Default for Edited {
    fn default() -> Self {
        Edited::Flag(false)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSubmission {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub edited: Edited,
    #[serde(default)]
    pub score: i64,
    #[serde(default = "default_upvote_ratio")]
    pub upvote_ratio: f64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub spoiler: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub distinguished: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub saved: bool,
    #[serde(default)]
    pub is_original_content: bool,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub author_flair_text: Option<String>,
    #[serde(default)]
    pub link_flair_text: Option<String>,
    #[serde(default)]
    pub link_flair_template_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawComment {
    pub id: String,
    pub parent_id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub edited: Edited,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub distinguished: Option<String>,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub saved: bool,
    #[serde(default)]
    pub is_submitter: bool,
    #[serde(default)]
    pub permalink: String,
    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Vec<Thing>,
}

/// Placeholder for comments that were not included in the response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMore {
    #[serde(default)]
    pub id: String,
    pub parent_id: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AboutThing {
    pub data: RawSubredditAbout,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSubredditAbout {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub public_description: Option<String>,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub over18: bool,
    #[serde(default)]
    pub subscribers: Option<i64>,
    #[serde(default)]
    pub can_assign_link_flair: bool,
    #[serde(default)]
    pub can_assign_user_flair: bool,
    #[serde(default = "default_true")]
    pub spoilers_enabled: bool,
}

/// Response of `/api/morechildren?api_type=json`
#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenJson {
    #[serde(default)]
    pub data: Option<MoreChildrenData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<Thing>,
}

fn default_upvote_ratio() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// `replies` is an empty string when there are none, a listing otherwise
fn deserialize_replies<'de, D>(deserializer: D) -> Result<Vec<Thing>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Replies {
        Listing(Listing<Thing>),
        Empty(String),
    }

    Ok(match Option::<Replies>::deserialize(deserializer)? {
        Some(Replies::Listing(listing)) => listing.data.children,
        Some(Replies::Empty(_)) | None => Vec::new(),
    })
}

/// Deleted and removed accounts come back as `"[deleted]"`
fn author_ref(author: Option<String>) -> Option<AuthorRef> {
    author
        .filter(|name| !name.is_empty() && name != "[deleted]")
        .map(AuthorRef::new)
}

impl From<RawSubmission> for SubmissionSnapshot {
    fn from(raw: RawSubmission) -> Self {
        Self {
            id: raw.id,
            author: author_ref(raw.author),
            title: raw.title,
            selftext: raw.selftext,
            url: raw.url,
            created_utc: epoch_to_utc(raw.created_utc).unwrap_or_default(),
            edited_utc: raw.edited.epoch().and_then(epoch_to_utc),
            score: raw.score,
            upvote_ratio: raw.upvote_ratio,
            num_comments: raw.num_comments,
            over_18: raw.over_18,
            spoiler: raw.spoiler,
            stickied: raw.stickied,
            distinguished: raw.distinguished,
            locked: raw.locked,
            saved: raw.saved,
            is_original_content: raw.is_original_content,
            is_self: raw.is_self,
            permalink: raw.permalink,
            author_flair_text: raw.author_flair_text,
            link_flair_text: raw.link_flair_text,
            link_flair_template_id: raw.link_flair_template_id,
        }
    }
}

impl RawComment {
    /// Split off the nested replies and convert the comment itself
    pub fn into_parts(self) -> (CommentSnapshot, Vec<Thing>) {
        let snapshot = CommentSnapshot {
            id: self.id,
            parent_id: self.parent_id,
            author: author_ref(self.author),
            body: self.body,
            body_html: self.body_html,
            created_utc: epoch_to_utc(self.created_utc).unwrap_or_default(),
            edited_utc: self.edited.epoch().and_then(epoch_to_utc),
            score: self.score,
            distinguished: self.distinguished,
            stickied: self.stickied,
            saved: self.saved,
            is_submitter: self.is_submitter,
            permalink: self.permalink,
        };
        (snapshot, self.replies)
    }
}

impl From<RawSubredditAbout> for SubredditAbout {
    fn from(raw: RawSubredditAbout) -> Self {
        Self {
            display_name: raw.display_name,
            description: raw.description.unwrap_or_default(),
            description_html: raw.description_html.unwrap_or_default(),
            public_description: raw.public_description.unwrap_or_default(),
            created_utc: raw.created_utc.and_then(epoch_to_utc),
            over_18: raw.over18,
            subscribers: raw.subscribers.unwrap_or(0),
            can_assign_link_flair: raw.can_assign_link_flair,
            can_assign_user_flair: raw.can_assign_user_flair,
            spoilers_enabled: raw.spoilers_enabled,
        }
    }
}
