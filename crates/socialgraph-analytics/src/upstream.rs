use socialgraph_core::{Result, SocialGraphError};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Run an upstream collaborator call under a deadline, retrying once after
/// a fixed backoff if it times out. Failures other than the deadline are
/// surfaced immediately.
pub(crate) async fn with_retry<T, F, Fut>(
    deadline: Duration,
    backoff: Duration,
    upstream: &'static str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match timeout(deadline, call()).await {
        Ok(result) => result,
        Err(_) => {
            debug!(upstream, "upstream call timed out, retrying once");
            sleep(backoff).await;
            match timeout(deadline, call()).await {
                Ok(result) => result,
                Err(_) => Err(SocialGraphError::UpstreamTimeout { upstream }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let result = with_retry(Duration::from_millis(50), Duration::from_millis(1), "test", || {
            async { Ok::<_, SocialGraphError>(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_timeout_retries_once_then_surfaces() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32> = with_retry(
            Duration::from_millis(10),
            Duration::from_millis(1),
            "slow upstream",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_secs(3600)).await;
                    Ok(0)
                }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(SocialGraphError::UpstreamTimeout { upstream: "slow upstream" })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_can_succeed() {
        let attempts = AtomicUsize::new(0);
        let result = with_retry(
            Duration::from_millis(20),
            Duration::from_millis(1),
            "flaky upstream",
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        sleep(Duration::from_secs(3600)).await;
                    }
                    Ok::<_, SocialGraphError>(attempt)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_timeout_errors_are_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32> = with_retry(
            Duration::from_millis(50),
            Duration::from_millis(1),
            "test",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(SocialGraphError::InvalidParameter("bad".to_string())) }
            },
        )
        .await;

        assert!(matches!(result, Err(SocialGraphError::InvalidParameter(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
