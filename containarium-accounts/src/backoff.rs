use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::AccountError;

/// Stderr substrings that mark a `useradd`/`userdel` failure as lock
/// contention rather than a real error (§4.B point 5).
const LOCK_ERROR_PATTERNS: &[&str] = &[
    "cannot lock",
    "try again later",
    "resource temporarily unavailable",
];

pub fn is_lock_error(stderr: &str) -> bool {
    let lowered = stderr.to_lowercase();
    LOCK_ERROR_PATTERNS.iter().any(|p| lowered.contains(p))
}

/// Exponential backoff with jitter, capped by a final long "last-stand"
/// wait (§4.B point 5). Non-lock errors are returned immediately without
/// consuming a retry.
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
    pub last_stand_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_delay: Duration::from_millis(200),
            max_attempts: 5,
            last_stand_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub async fn run<F, Fut, T>(&self, mut attempt_fn: F) -> Result<T, AccountError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AccountError>>,
    {
        for attempt in 0..self.max_attempts {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(attempt, ?delay, "account op hit lock contention, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() => {
                    warn!("account op entering last-stand wait before final attempt");
                    tokio::time::sleep(self.last_stand_delay).await;
                    return attempt_fn().await;
                }
                Err(err) => return Err(err),
            }
        }
        attempt_fn().await
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay * 2_u32.saturating_pow(attempt);
        let jitter_ms = rand::thread_rng().gen_range(0..50);
        exp + Duration::from_millis(jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_lock_contention_patterns() {
        assert!(is_lock_error("useradd: cannot lock /etc/passwd; try again later."));
        assert!(is_lock_error("Resource temporarily unavailable"));
        assert!(!is_lock_error("useradd: user 'bob' already exists"));
    }

    #[tokio::test]
    async fn non_lock_errors_fail_fast_without_retry() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result = policy
            .run(|| {
                calls += 1;
                async { Err::<(), _>(AccountError::InvalidUsername("bad".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn lock_errors_retry_until_success() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_attempts: 5,
            last_stand_delay: Duration::from_millis(1),
        };
        let mut calls = 0;
        let result = policy
            .run(|| {
                calls += 1;
                let succeed_now = calls >= 3;
                async move {
                    if succeed_now {
                        Ok(())
                    } else {
                        Err(AccountError::LockTimeout("cannot lock".into()))
                    }
                }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }
}
