//! Retry policy for model HTTP calls.
//!
//! Whether a failed request is retried is decided where the failure is
//! observed: the HTTP status, or the kind of transport error. Error text and
//! response bodies are never inspected.

use komon_core::{KomonError, Result};
use std::{future::Future, time::Duration};

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based), capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let factor = f64::from(self.backoff_multiplier.max(1.0)).powi(exponent);
        let scaled = self.initial_delay.as_secs_f64() * factor;
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled)
    }
}

/// A failed request attempt together with the verdict on retrying it.
#[derive(Debug)]
pub struct RequestFailure {
    pub error: KomonError,
    pub retryable: bool,
    /// Server-requested wait (`Retry-After`), used instead of the backoff delay.
    pub retry_after: Option<Duration>,
}

impl RequestFailure {
    pub fn transient(error: KomonError) -> Self {
        Self { error, retryable: true, retry_after: None }
    }

    pub fn permanent(error: KomonError) -> Self {
        Self { error, retryable: false, retry_after: None }
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, error: KomonError) -> Self {
        Self { error, retryable: is_retryable_status(status), retry_after: None }
    }

    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Throttling, timeouts and server-side failures.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// `Retry-After` in its delta-seconds form. HTTP dates are ignored.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Run `operation` until it succeeds, fails permanently, or the retry budget
/// is spent. The last error is returned unchanged.
pub async fn retry_request<T, Op, Fut>(retry_config: &RetryConfig, mut operation: Op) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestFailure>>,
{
    let mut attempt: u32 = 0;

    loop {
        let failure = match operation().await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        if !retry_config.enabled || !failure.retryable || attempt >= retry_config.max_retries {
            return Err(failure.error);
        }

        attempt += 1;
        let delay = failure
            .retry_after
            .map(|wait| wait.min(retry_config.max_delay))
            .unwrap_or_else(|| retry_config.delay_for(attempt));
        tracing::warn!(
            attempt,
            max_retries = retry_config.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %failure.error,
            "model request failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    type Attempt = std::future::Ready<std::result::Result<&'static str, RequestFailure>>;

    fn counting<F>(attempts: &Arc<AtomicU32>, fail: F) -> impl FnMut() -> Attempt
    where
        F: Fn(u32) -> Option<RequestFailure>,
    {
        let attempts = attempts.clone();
        move || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            std::future::ready(match fail(n) {
                Some(failure) => Err(failure),
                None => Ok("ok"),
            })
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn test_status_decides_not_message() {
        let failure = RequestFailure::from_status(
            400,
            KomonError::Model(
                "The input token count (1500000) exceeds the limit: 503 UNAVAILABLE".into(),
            ),
        );
        assert!(!failure.retryable);
        assert!(RequestFailure::from_status(503, KomonError::Model("bad".into())).retryable);
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(1), Duration::from_millis(250));
        assert_eq!(config.delay_for(2), Duration::from_millis(500));
        assert_eq!(config.delay_for(3), Duration::from_secs(1));
        assert_eq!(config.delay_for(40), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(" 7 "), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = counting(&attempts, |n| {
            (n < 2).then(|| RequestFailure::transient(KomonError::Model("503".into())))
        });

        let result = retry_request(&RetryConfig::default(), op).await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_returns_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = counting(&attempts, |_| {
            Some(RequestFailure::from_status(400, KomonError::Model("429 in body".into())))
        });

        let err = retry_request(&RetryConfig::default(), op).await.unwrap_err();
        assert!(err.to_string().contains("429 in body"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = counting(&attempts, |_| {
            Some(RequestFailure::transient(KomonError::Model("503".into())))
        });

        let config = RetryConfig::default().with_max_retries(2);
        assert!(retry_request(&config, op).await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disabled_runs_once() {
        let attempts = Arc::new(AtomicU32::new(0));
        let op = counting(&attempts, |_| {
            Some(RequestFailure::transient(KomonError::Model("503".into())))
        });

        assert!(retry_request(&RetryConfig::disabled(), op).await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
