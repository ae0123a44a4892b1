//! Sync command implementation

use anyhow::{Context, Result};

use crate::config::Config;
use crate::source::RedditSource;
use crate::store::MetadataStore;
use crate::sync;

pub async fn run(store: &MetadataStore, config: &Config, watch: bool) -> Result<()> {
    config.require_reddit_credentials()?;
    let source = RedditSource::new(config.reddit.clone());
    let policy = config.retry_policy();

    if watch {
        sync::run_forever(store, &source, policy, config.schedule(), &config.subreddits, None)
            .await;
        return Ok(());
    }

    if config.subreddits.is_empty() && store.list_subreddits()?.is_empty() {
        println!("No subreddits configured. Add one with 'threadsift subreddit add <name>'.");
        return Ok(());
    }

    let report = sync::sync_all(store, &source, policy, &config.subreddits)
        .await
        .context("sync pass failed")?;

    println!("Sync complete: {}", report);
    if report.failed_submissions + report.failed_subreddits > 0 {
        anyhow::bail!(
            "{} submissions and {} subreddits failed, see log for details",
            report.failed_submissions,
            report.failed_subreddits
        );
    }
    Ok(())
}
