use anyhow::Result;
use tracing::warn;

use crate::config::Config;
use crate::source::RedditSource;
use crate::store::MetadataStore;
use crate::sync;

pub async fn add(store: &MetadataStore, config: &Config, name: String) -> Result<()> {
    store.ensure_subreddit(&name)?;
    println!("Subreddit '{}' registered.", name);

    // Descriptive fields are optional; registration stands without them
    if config.require_reddit_credentials().is_ok() {
        let source = RedditSource::new(config.reddit.clone());
        if let Err(e) = sync::refresh_subreddit(store, &source, &name).await {
            warn!(subreddit = %name, "could not fetch subreddit details: {}", e);
        }
    }
    Ok(())
}

pub fn list(store: &MetadataStore) -> Result<()> {
    let subreddits = store.list_subreddits()?;
    if subreddits.is_empty() {
        println!("No subreddits found.");
        return Ok(());
    }

    println!(
        "{:<24} {:<12} {:<6} {:<12} {}",
        "Name", "Subscribers", "NSFW", "Created", "Stored"
    );
    println!("{}", "-".repeat(70));
    for s in subreddits {
        println!(
            "{:<24} {:<12} {:<6} {:<12} {}",
            s.name,
            s.subscribers,
            if s.over_18 { "yes" } else { "no" },
            s.created_utc
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
            s.submission_count
        );
    }
    Ok(())
}

/// Refresh one subreddit, or every stored one when `name` is `None`
pub async fn refresh(store: &MetadataStore, config: &Config, name: Option<String>) -> Result<()> {
    config.require_reddit_credentials()?;
    let source = RedditSource::new(config.reddit.clone());

    let names = match name {
        Some(name) => vec![name],
        None => store.list_subreddits()?.into_iter().map(|s| s.name).collect(),
    };

    for name in names {
        sync::refresh_subreddit(store, &source, &name).await?;
        println!("Refreshed '{}'", name);
    }
    Ok(())
}
