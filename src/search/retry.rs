use crate::config::RetryConfig;
use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Run `op` up to `max_attempts` times with exponential backoff.
///
/// Backoff starts at the configured minimum and doubles after each failure,
/// capped at the maximum. Configuration errors fail immediately. Either way
/// the final error is surfaced as [`Error::ServiceInit`].
pub async fn with_backoff<T, F, Fut>(policy: &RetryConfig, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.min_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{} connected after {} attempts", label, attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label,
                    attempt,
                    max_attempts,
                    e.log_safe(),
                    backoff
                );
                sleep(backoff).await;
                backoff = next_backoff(backoff, policy.max_backoff());
            }
            Err(e) => {
                return Err(match e {
                    Error::ServiceInit(msg) => Error::ServiceInit(msg),
                    other => Error::ServiceInit(format!(
                        "{label} failed after {attempt} attempts: {other}"
                    )),
                });
            }
        }
    }
}

/// Configuration problems fail on the first attempt
fn is_retryable(error: &Error) -> bool {
    !matches!(error, Error::Config(_) | Error::Validation(_))
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}
