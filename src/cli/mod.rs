//! Command implementations for the `threadsift` binary

pub mod classify;
pub mod list;
pub mod read;
pub mod results;
pub mod runs;
pub mod spec;
pub mod subreddit;
pub mod sync;

/// First line of `text`, cut to `max` characters with a trailing ellipsis
pub(crate) fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
