//! Read command implementation

use anyhow::Result;

use crate::fullname;
use crate::store::MetadataStore;
use crate::transcript;

pub fn run(store: &MetadataStore, reddit_id: &str) -> Result<()> {
    // Accept the fullname too
    let reddit_id = if reddit_id.starts_with("t3_") {
        fullname::strip(reddit_id)
    } else {
        reddit_id
    };
    let Some(submission) = store.find_submission(reddit_id)? else {
        println!("Submission '{}' not found.", reddit_id);
        return Ok(());
    };

    let Some(thread) = store.load_thread(submission.id)? else {
        println!("Submission '{}' not found.", reddit_id);
        return Ok(());
    };

    println!("{}", "=".repeat(80));
    println!(
        "Submission: {} | Score: {} | Comments: {}/{}",
        submission.reddit_id,
        submission.score,
        thread.comments.len(),
        submission.num_comments
    );
    println!("{}", "=".repeat(80));
    print!("{}", transcript::render(&thread));
    Ok(())
}
