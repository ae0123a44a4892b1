//! Long-running sync loop

use std::time::Duration;

use tracing::{error, info};

use super::{sync_all, RetryPolicy, SyncReport};
use crate::error::Result;
use crate::source::ThreadSource;
use crate::store::MetadataStore;

/// Waits between full passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub run_interval: Duration,
    /// Used instead of `run_interval` after a pass ended on a rate limit
    pub rate_limit_cooldown: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            run_interval: Duration::from_secs(20 * 60),
            rate_limit_cooldown: Duration::from_secs(10 * 60),
        }
    }
}

impl Schedule {
    pub fn delay_after(&self, outcome: &Result<SyncReport>) -> Duration {
        match outcome {
            Err(e) if e.is_rate_limited() => self.rate_limit_cooldown,
            _ => self.run_interval,
        }
    }
}

/// Run sync passes until the process is stopped, or `max_passes` is reached
pub async fn run_forever(
    store: &MetadataStore,
    source: &dyn ThreadSource,
    policy: RetryPolicy,
    schedule: Schedule,
    seed: &[String],
    max_passes: Option<usize>,
) {
    let mut passes = 0;
    loop {
        let outcome = sync_all(store, source, policy, seed).await;
        if let Err(e) = &outcome {
            error!("sync pass failed: {}", e);
        }
        passes += 1;
        if max_passes.is_some_and(|max| passes >= max) {
            return;
        }

        let delay = schedule.delay_after(&outcome);
        info!("next sync pass in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}
