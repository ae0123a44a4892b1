//! List command implementation

use anyhow::Result;

use super::truncate;
use crate::store::MetadataStore;
use crate::transcript::DELETED_AUTHOR;

pub fn run(store: &MetadataStore, subreddit: Option<String>, limit: usize) -> Result<()> {
    let submissions = store.list_submissions(subreddit.as_deref(), limit)?;

    if submissions.is_empty() {
        println!("No submissions found. Run 'threadsift sync' first.");
        return Ok(());
    }

    println!(
        "{:<12} {:<10} {:<16} {:<16} {:>6} {:>9} {}",
        "Created", "ID", "Subreddit", "Author", "Score", "Comments", "Title"
    );
    println!("{}", "-".repeat(110));

    for s in submissions {
        println!(
            "{:<12} {:<10} {:<16} {:<16} {:>6} {:>9} {}",
            s.created_utc.format("%m-%d %H:%M"),
            s.reddit_id,
            truncate(&s.subreddit, 16),
            truncate(s.author.as_deref().unwrap_or(DELETED_AUTHOR), 16),
            s.score,
            format!("{}/{}", s.stored_comments, s.num_comments),
            truncate(&s.title, 40),
        );
    }

    Ok(())
}
