//! Plain-text transcript of a thread
//!
//! The transcript is what the language model reads, so rendering is a pure
//! function of its input: identical threads give byte-identical text.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Name shown for comments and submissions without an author
pub const DELETED_AUTHOR: &str = "[deleted]";

const SEPARATOR: &str = "---";
const INDENT: &str = "    ";

/// A submission with its stored comments, as loaded for classification
#[derive(Debug, Clone)]
pub struct Thread {
    pub submission_id: i64,
    pub reddit_id: String,
    pub title: String,
    pub author: Option<String>,
    pub selftext: String,
    pub comments: Vec<ThreadComment>,
}

#[derive(Debug, Clone)]
pub struct ThreadComment {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub author: Option<String>,
    pub body: String,
    pub created_utc: DateTime<Utc>,
}

/// Render the thread as title, author, body, separator, then the comment
/// tree depth-first with four spaces of indentation per level.
pub fn render(thread: &Thread) -> String {
    let mut out = String::new();

    out.push_str(&format!("Title: {}\n", thread.title));
    out.push_str(&format!("Author: {}\n", author_name(&thread.author)));
    if !thread.selftext.trim().is_empty() {
        out.push('\n');
        out.push_str(thread.selftext.trim_end());
        out.push('\n');
    }
    out.push_str(SEPARATOR);
    out.push('\n');

    let mut children: HashMap<Option<i64>, Vec<&ThreadComment>> = HashMap::new();
    for comment in &thread.comments {
        children.entry(comment.parent_id).or_default().push(comment);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.created_utc.cmp(&b.created_utc).then(a.id.cmp(&b.id)));
    }

    // Explicit stack instead of recursion; deep threads are common
    let mut stack: Vec<(&ThreadComment, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|c| (*c, 0)).collect())
        .unwrap_or_default();

    while let Some((comment, depth)) = stack.pop() {
        render_comment(&mut out, comment, depth);
        if let Some(kids) = children.get(&Some(comment.id)) {
            stack.extend(kids.iter().rev().map(|c| (*c, depth + 1)));
        }
    }

    out
}

fn render_comment(out: &mut String, comment: &ThreadComment, depth: usize) {
    let indent = INDENT.repeat(depth);
    let mut lines = comment.body.trim_end().lines();

    out.push_str(&indent);
    out.push_str(author_name(&comment.author));
    out.push(':');
    if let Some(first) = lines.next() {
        out.push(' ');
        out.push_str(first);
    }
    out.push('\n');

    // Continuation lines keep the comment's indentation
    for line in lines {
        out.push_str(&indent);
        out.push_str(line);
        out.push('\n');
    }
}

fn author_name(author: &Option<String>) -> &str {
    author.as_deref().unwrap_or(DELETED_AUTHOR)
}
