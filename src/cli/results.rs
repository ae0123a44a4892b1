use anyhow::Result;

use super::truncate;
use crate::store::MetadataStore;

pub fn run(store: &MetadataStore, spec: Option<i64>, limit: usize) -> Result<()> {
    let rows = store.list_detections(spec, limit)?;
    if rows.is_empty() {
        println!("No results found. Run 'threadsift classify' first.");
        return Ok(());
    }

    println!(
        "{:<17} {:<10} {:<5} {:<40} {}",
        "Recorded", "ID", "Spec", "Title", "Verdict"
    );
    println!("{}", "-".repeat(110));
    for row in rows {
        println!(
            "{:<17} {:<10} {:<5} {:<40} {}",
            row.recorded_at.format("%Y-%m-%d %H:%M"),
            row.reddit_id,
            row.information_id,
            truncate(&row.title, 40),
            row.verdict
        );
    }
    Ok(())
}
