//! Classify command implementation

use anyhow::{Context, Result};

use crate::classify::{self, OpenAiClient};
use crate::config::Config;
use crate::store::MetadataStore;

pub async fn run(
    store: &MetadataStore,
    config: &Config,
    subreddit: Option<String>,
    force: bool,
) -> Result<()> {
    config.require_llm_credentials()?;
    let model = OpenAiClient::new(&config.llm);

    let report = classify::classify_all(
        store,
        &model,
        config.retry_policy(),
        subreddit.as_deref(),
        force,
    )
    .await
    .context("classification pass failed")?;

    println!("Classification complete: {}", report);
    if report.failed > 0 {
        anyhow::bail!("{} classifications failed, see log for details", report.failed);
    }
    Ok(())
}
