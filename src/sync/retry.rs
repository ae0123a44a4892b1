//! Bounded retry on upstream rate limits

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Fixed-delay retry policy for one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_secs(15),
        }
    }
}

/// Run `operation`, retrying while it fails with `Error::RateLimited`.
///
/// Each retry is preceded by `policy.delay`. After `policy.max_retries`
/// retries the last rate-limit error is returned. Any other error is
/// returned immediately.
pub async fn retry_on_rate_limit<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Err(e) if e.is_rate_limited() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    "{} rate limited (retry {}/{}), waiting {:?}",
                    label, attempt, policy.max_retries, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            result => return result,
        }
    }
}
