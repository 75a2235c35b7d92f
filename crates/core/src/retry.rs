use crate::config::RetryConfig;
use std::future::Future;
use tokio::time::sleep;
use tracing::{info, warn};

/// Runs `call` until it succeeds or `retry.max_retries` extra attempts have
/// been spent, doubling the backoff between attempts up to `max_backoff`.
pub(crate) async fn with_backoff<F, Fut, T, E>(
    retry: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut backoff = retry.initial_backoff;

    loop {
        match call().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation, attempts = attempt + 1, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                attempt += 1;
                if attempt > retry.max_retries {
                    warn!(
                        operation,
                        attempts = attempt,
                        error = %error,
                        "request failed after max retries"
                    );
                    return Err(error);
                }

                warn!(
                    operation,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %error,
                    "request failed, retrying"
                );

                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, retry.max_backoff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fast_retry(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let attempts = AtomicUsize::new(0);
        let attempts = &attempts;

        let result: Result<&str, String> = with_backoff(&fast_retry(3), "probe", || async move {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("transient".to_string())
            } else {
                Ok("ready")
            }
        })
        .await;

        assert_eq!(result, Ok("ready"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicUsize::new(0);
        let attempts = &attempts;

        let result: Result<(), String> = with_backoff(&fast_retry(2), "probe", || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err("down".to_string())
        })
        .await;

        assert_eq!(result, Err("down".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
