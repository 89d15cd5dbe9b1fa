//! Declarative retry policy for summarisation calls.
//!
//! The policy is keyed on [`RemoteErrorKind`] rather than on a client
//! library's exception type, so which failures are retried is visible in the
//! configuration and testable with a fake backend.
//!
//! ## Schedule
//!
//! With the defaults (`initial` 1 s, `multiplier` 2, `maximum` 60 s,
//! `deadline` 300 s) the waits between attempts are
//! 1 s → 2 s → 4 s → … → 32 s → 60 s → 60 s …, and no attempt starts or
//! runs past 300 s after the first one began. Each attempt is itself
//! bounded by whatever is left of the deadline.

use crate::error::{RemoteError, RemoteErrorKind, SummarizeError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::warn;

/// When and how often a failed backend call is attempted again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Wait before the second attempt. Default: 1 s.
    pub initial: Duration,
    /// Factor applied to the wait after every failed attempt. Default: 2.0.
    pub multiplier: f64,
    /// Upper bound on a single wait. Default: 60 s.
    pub maximum: Duration,
    /// Budget for all attempts and waits combined. Default: 300 s.
    pub deadline: Duration,
    /// Failure kinds that may be retried. Default: deadline-exceeded only.
    pub retry_on: Vec<RemoteErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            maximum: Duration::from_secs(60),
            deadline: Duration::from_secs(300),
            retry_on: vec![RemoteErrorKind::DeadlineExceeded],
        }
    }
}

/// A successful call together with what it took to get there.
#[derive(Debug, Clone)]
pub struct Retried<T> {
    pub value: T,
    /// Number of attempts made, including the successful one.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Emitted once per retry, just before the backoff sleep.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a> {
    /// The attempt that just failed (1-indexed).
    pub attempt: u32,
    /// How long the loop will wait before the next attempt.
    pub delay: Duration,
    pub error: &'a RemoteError,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            retry_on: Vec::new(),
            ..Self::default()
        }
    }

    /// Whether a failure of this kind may be attempted again.
    pub fn is_retryable(&self, kind: RemoteErrorKind) -> bool {
        self.retry_on.contains(&kind)
    }

    /// Wait before the attempt following failed attempt number `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.maximum.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    pub(crate) fn validate(&self) -> Result<(), SummarizeError> {
        if !(self.multiplier >= 1.0) {
            return Err(SummarizeError::InvalidConfig(format!(
                "retry multiplier must be ≥ 1, got {}",
                self.multiplier
            )));
        }
        if self.initial > self.maximum {
            return Err(SummarizeError::InvalidConfig(format!(
                "initial retry delay ({:?}) exceeds maximum ({:?})",
                self.initial, self.maximum
            )));
        }
        if self.deadline.is_zero() {
            return Err(SummarizeError::InvalidConfig(
                "retry deadline must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Drive `op` until it succeeds, fails with a non-retryable kind, or the
    /// deadline would be overrun by the next wait.
    ///
    /// `op` receives the 1-indexed attempt number. `on_retry` is called
    /// before each backoff sleep.
    pub async fn run<T, F, Fut>(
        &self,
        mut op: F,
        mut on_retry: impl FnMut(&RetryEvent<'_>),
    ) -> Result<Retried<T>, SummarizeError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let remaining = self.deadline.saturating_sub(start.elapsed());

            let result = match timeout(remaining, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::deadline_exceeded(format!(
                    "no response before the {}s retry deadline",
                    self.deadline.as_secs()
                ))),
            };

            let err = match result {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        attempts: attempt,
                        elapsed: start.elapsed(),
                    })
                }
                Err(err) => err,
            };

            if !self.is_retryable(err.kind) {
                return Err(exhausted(err, attempt, start));
            }

            let delay = self.delay_after(attempt);
            if start.elapsed() + delay >= self.deadline {
                warn!(
                    "Attempt {} failed ({}); retry budget of {}s exhausted",
                    attempt,
                    err,
                    self.deadline.as_secs()
                );
                return Err(exhausted(err, attempt, start));
            }

            warn!(
                "Attempt {} failed ({}); retrying in {:.1}s",
                attempt,
                err,
                delay.as_secs_f64()
            );
            on_retry(&RetryEvent {
                attempt,
                delay,
                error: &err,
            });
            sleep(delay).await;
        }
    }
}

fn exhausted(err: RemoteError, attempts: u32, start: Instant) -> SummarizeError {
    match err.kind {
        RemoteErrorKind::DeadlineExceeded => SummarizeError::Timeout {
            attempts,
            elapsed_ms: start.elapsed().as_millis() as u64,
        },
        kind => SummarizeError::Remote {
            kind,
            attempts,
            message: err.message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn default_schedule_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let waits: Vec<u64> = (1..=9).map(|a| policy.delay_after(a).as_secs()).collect();
        assert_eq!(waits, vec![1, 2, 4, 8, 16, 32, 60, 60, 60]);
    }

    #[test]
    fn only_deadline_exceeded_is_retryable_by_default() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(RemoteErrorKind::DeadlineExceeded));
        assert!(!policy.is_retryable(RemoteErrorKind::Transient));
        assert!(!policy.is_retryable(RemoteErrorKind::Permanent));
    }

    #[test]
    fn validate_rejects_shrinking_multiplier() {
        let policy = RetryPolicy {
            multiplier: 0.5,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
        assert!(RetryPolicy::default().validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_deadline_exceeded_then_succeeds() {
        let policy = RetryPolicy::default();
        let starts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let failures: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

        let result = policy
            .run(
                |attempt| {
                    let starts = Arc::clone(&starts);
                    let failures = Arc::clone(&failures);
                    async move {
                        starts.lock().unwrap().push(Instant::now());
                        if attempt < 3 {
                            failures.lock().unwrap().push(Instant::now());
                            Err(RemoteError::deadline_exceeded("504"))
                        } else {
                            Ok("Objectives: x")
                        }
                    }
                },
                |_| {},
            )
            .await
            .expect("third attempt succeeds");

        assert_eq!(result.attempts, 3);
        assert_eq!(result.value, "Objectives: x");

        let starts = starts.lock().unwrap();
        let failures = failures.lock().unwrap();
        assert_eq!(starts.len(), 3);
        let gap = starts[1] - failures[0];
        assert!(gap >= Duration::from_secs(1), "gap {gap:?}");
        assert!(gap <= Duration::from_secs(2), "gap {gap:?}");
        assert!(result.elapsed < Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(Mutex::new(0u32));

        let err = policy
            .run(
                |_| {
                    let calls = Arc::clone(&calls);
                    async move {
                        *calls.lock().unwrap() += 1;
                        Err::<(), _>(RemoteError::permanent("API key not valid"))
                    }
                },
                |_| panic!("no retry expected"),
            )
            .await
            .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 1);
        match err {
            SummarizeError::Remote { kind, attempts, .. } => {
                assert_eq!(kind, RemoteErrorKind::Permanent);
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_next_wait_overruns_deadline() {
        let policy = RetryPolicy::default();
        let mut retries = Vec::new();

        let err = policy
            .run(
                |_| async { Err::<(), _>(RemoteError::deadline_exceeded("slow")) },
                |event| retries.push(event.delay.as_secs()),
            )
            .await
            .unwrap_err();

        // 1+2+4+8+16+32+60+60+60 = 243s; another 60s wait would reach 303s.
        assert_eq!(retries, vec![1, 2, 4, 8, 16, 32, 60, 60, 60]);
        match err {
            SummarizeError::Timeout {
                attempts,
                elapsed_ms,
            } => {
                assert_eq!(attempts, 10);
                assert!(elapsed_ms < 300_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_is_cut_off_at_deadline() {
        let policy = RetryPolicy::default();
        let begin = Instant::now();

        let err = policy
            .run(
                |_| std::future::pending::<Result<(), RemoteError>>(),
                |_| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SummarizeError::Timeout { attempts: 1, .. }));
        assert!(begin.elapsed() >= Duration::from_secs(300));
        assert!(begin.elapsed() < Duration::from_secs(301));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_retried_when_configured() {
        let policy = RetryPolicy {
            retry_on: vec![RemoteErrorKind::DeadlineExceeded, RemoteErrorKind::Transient],
            ..RetryPolicy::default()
        };
        let calls = Arc::new(Mutex::new(0u32));

        let out = policy
            .run(
                |attempt| {
                    let calls = Arc::clone(&calls);
                    async move {
                        *calls.lock().unwrap() += 1;
                        if attempt == 1 {
                            Err(RemoteError::transient("429"))
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(out.value, 2);
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
