//! Reddit "fullname" identifiers
//!
//! The API refers to objects by a type-prefixed id such as `t1_abc123`
//! (a comment) or `t3_xyz789` (a submission). The store keeps the bare id.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Object kinds that carry a fullname prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Comment,
    User,
    Submission,
    Message,
    Subreddit,
    Award,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::Comment,
        Kind::User,
        Kind::Submission,
        Kind::Message,
        Kind::Subreddit,
        Kind::Award,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            Kind::Comment => "t1",
            Kind::User => "t2",
            Kind::Submission => "t3",
            Kind::Message => "t4",
            Kind::Subreddit => "t5",
            Kind::Award => "t6",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Comment => "Comment",
            Kind::User => "User",
            Kind::Submission => "Submission",
            Kind::Message => "Message",
            Kind::Subreddit => "Subreddit",
            Kind::Award => "Award",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidKind(s.to_string()))
    }
}

/// Remove the three character type prefix (`t1_`, `t3_`, ...).
///
/// The prefix is not checked against any kind. Inputs shorter than a
/// prefix strip to an empty string.
pub fn strip(fullname: &str) -> &str {
    fullname.get(3..).unwrap_or("")
}

/// Build the fullname of `bare_id` for the given kind
pub fn prefix(bare_id: &str, kind: Kind) -> String {
    format!("{}_{}", kind.prefix(), bare_id)
}

/// Build a fullname from a kind given by name, e.g. `"Submission"`
pub fn prefix_named(bare_id: &str, kind: &str) -> Result<String> {
    let kind: Kind = kind.parse()?;
    Ok(prefix(bare_id, kind))
}
