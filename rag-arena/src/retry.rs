//! Timeouts and bounded exponential backoff around external calls.

use std::future::Future;

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{RagError, Result, Stage};

/// Applies a [`RetryConfig`] to calls of one pipeline stage.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    config: RetryConfig,
    stage: Stage,
}

impl RetryPolicy {
    pub(crate) fn new(config: RetryConfig, stage: Stage) -> Self {
        Self { config, stage }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached. Each attempt is bounded by the per-call
    /// timeout; a timeout counts as a retryable failure.
    ///
    /// Final failures are wrapped into the stage's `*Unavailable` error.
    pub(crate) async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(op()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let wait = self.config.backoff(attempt);
                    warn!(
                        stage = %self.stage,
                        attempt,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "retryable failure, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => return Err(RagError::exhausted(self.stage, attempt, err)),
            }
        }
    }

    /// Run `op` once under the per-call timeout.
    pub(crate) async fn run_once<T, Fut>(&self, op: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.attempt(op).await.map_err(|err| RagError::exhausted(self.stage, 1, err))
    }

    async fn attempt<T, Fut>(&self, op: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.config.timeout();
        match tokio::time::timeout(timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(RagError::Timeout { stage: self.stage, timeout }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        let config =
            RetryConfig { max_attempts, base_delay_ms: 100, max_delay_ms: 1_000, timeout_ms: 50 };
        RetryPolicy::new(config, Stage::Embedding)
    }

    fn flaky(
        fail_times: u32,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut() -> std::future::Ready<Result<u32>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n <= fail_times {
                Err(RagError::EmbeddingError { provider: "test".into(), message: "429".into() })
            } else {
                Ok(n)
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let value = policy(3).run(flaky(2, calls.clone())).await.unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = policy(3).run(flaky(u32::MAX, calls.clone())).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingUnavailable { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let err = policy(5)
            .run(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err::<(), _>(RagError::Snapshot("corrupt".into())))
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out_and_count_as_attempts() {
        let err = policy(2)
            .run(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        match err {
            RagError::EmbeddingUnavailable { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, RagError::Timeout { stage: Stage::Embedding, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_once_never_retries() {
        let policy = RetryPolicy::new(RetryConfig::default(), Stage::Generation);
        let err = policy
            .run_once(async {
                Err::<String, _>(RagError::GenerationError {
                    provider: "test".into(),
                    message: "down".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::GenerationUnavailable { .. }));
    }
}
