use anyhow::Result;

use crate::store::MetadataStore;

pub fn run(store: &MetadataStore, limit: usize) -> Result<()> {
    let runs = store.list_runs(limit)?;
    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    println!(
        "{:<10} {:<10} {:<8} {:<17} {:>9} {}",
        "ID", "Kind", "Result", "Started", "Duration", "Summary"
    );
    println!("{}", "-".repeat(100));
    for run in runs {
        let duration = run
            .stopped_at
            .map(|stop| format!("{}s", (stop - run.started_at).num_seconds()))
            .unwrap_or_else(|| "-".to_string());
        let summary = run
            .error_message
            .as_deref()
            .or(run.summary.as_deref())
            .unwrap_or("");
        println!(
            "{:<10} {:<10} {:<8} {:<17} {:>9} {}",
            &run.id[..8.min(run.id.len())],
            run.kind,
            run.result,
            run.started_at.format("%Y-%m-%d %H:%M"),
            duration,
            summary
        );
    }
    Ok(())
}
