//! Retry utilities with exponential backoff and jitter.
//!
//! This module provides bounded retries for operations that may fail
//! transiently. The wait before each retry is the current base delay plus a
//! uniformly random jitter; the base delay doubles after every retryable
//! failure. Waiting goes through a [`Sleeper`] so tests can observe delays
//! without sleeping.
//!
//! # Example
//!
//! ```rust,no_run
//! use fellow_mcp::retry::{with_retry_if, RetryPolicy, TokioSleeper};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! async fn example() {
//!     let policy = RetryPolicy::default();
//!
//!     let result = with_retry_if(
//!         &policy,
//!         &TokioSleeper,
//!         || async { Err::<(), _>(MyError::Transient) },
//!         |err| matches!(err, MyError::Transient),
//!     )
//!     .await;
//!     assert!(result.is_err());
//! }
//! ```

use async_trait::async_trait;
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Retry behavior for outbound calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay before the first retry.
    pub initial_delay: Duration,

    /// Factor applied to the base delay after each retryable failure.
    pub multiplier: u32,

    /// Exclusive upper bound of the random jitter added to each wait.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(300),
            multiplier: 2,
            max_jitter: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Policy used for the Fellow API.
    pub fn standard() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            multiplier: 1,
            max_jitter: Duration::ZERO,
        }
    }
}

/// Per-call retry bookkeeping. Created fresh for every top-level call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    /// Attempts made so far.
    pub attempt: u32,

    /// Base delay for the next wait.
    pub delay: Duration,
}

impl RetryState {
    /// Start a new call under the given policy.
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            delay: policy.initial_delay,
        }
    }

    /// Compute the wait before the next attempt and advance the base delay.
    pub fn next_wait(&mut self, policy: &RetryPolicy) -> Duration {
        let wait = self.delay + jitter(policy.max_jitter);
        self.delay = self.delay.saturating_mul(policy.multiplier);
        wait
    }
}

/// Uniform random duration in `[0, max)`.
fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

/// Cooperative wait abstraction.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Failure of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// A non-retryable error, returned as produced.
    Terminal(E),

    /// Every attempt failed with a retryable error.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Terminal(e) => e.fmt(f),
            RetryError::Exhausted { attempts } => {
                write!(f, "upstream unavailable after {} attempts", attempts)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Execute a function with retries and a predicate for retryable errors.
///
/// Non-retryable errors are returned immediately as [`RetryError::Terminal`].
/// When every one of `policy.max_attempts` attempts fails with a retryable
/// error, [`RetryError::Exhausted`] is returned and the last error is dropped.
///
/// # Arguments
///
/// * `policy` - Retry policy
/// * `sleeper` - Wait implementation used between attempts
/// * `f` - Function to execute (must be `FnMut` and return a `Future`)
/// * `is_retryable` - Predicate to determine if an error is retryable
pub async fn with_retry_if<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut f: F,
    mut is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: fmt::Debug,
    P: FnMut(&E) -> bool,
{
    let mut state = RetryState::new(policy);

    loop {
        state.attempt += 1;

        match f().await {
            Ok(result) => {
                if state.attempt > 1 {
                    tracing::info!(attempts = state.attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if !is_retryable(&e) => {
                tracing::debug!(error = ?e, "Error is not retryable, returning immediately");
                return Err(RetryError::Terminal(e));
            }
            Err(e) if state.attempt >= policy.max_attempts => {
                tracing::error!(
                    attempts = state.attempt,
                    error = ?e,
                    "All retry attempts exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts: state.attempt,
                });
            }
            Err(e) => {
                let wait = state.next_wait(policy);
                tracing::warn!(
                    attempt = state.attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = wait.as_millis() as u64,
                    error = ?e,
                    "Attempt failed, retrying"
                );

                sleeper.sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sleeper that records requested waits and returns immediately.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn waits(&self) -> Vec<Duration> {
            self.waits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.initial_delay, Duration::from_millis(300));
        assert_eq!(policy.multiplier, 2);
        assert_eq!(policy.max_jitter, Duration::from_millis(200));
        assert_eq!(RetryPolicy::standard(), policy);
        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_backoff_doubles_with_bounded_jitter() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::new(&policy);

        for base in [300u64, 600, 1200] {
            let wait = state.next_wait(&policy);
            assert!(wait >= Duration::from_millis(base));
            assert!(wait < Duration::from_millis(base + 200));
        }
        assert_eq!(state.delay, Duration::from_millis(2400));
    }

    #[test]
    fn test_zero_jitter() {
        let policy = RetryPolicy {
            max_jitter: Duration::ZERO,
            ..RetryPolicy::default()
        };
        let mut state = RetryState::new(&policy);
        assert_eq!(state.next_wait(&policy), Duration::from_millis(300));
        assert_eq!(state.next_wait(&policy), Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let sleeper = RecordingSleeper::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry_if(
            &RetryPolicy::default(),
            &sleeper,
            || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(42)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_succeeds_after_retries() {
        let sleeper = RecordingSleeper::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry_if(
            &RetryPolicy::default(),
            &sleeper,
            || {
                let counter = counter_clone.clone();
                async move {
                    let count = counter.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err("not yet")
                    } else {
                        Ok(42)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.waits().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let sleeper = RecordingSleeper::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry_if(
            &RetryPolicy::default(),
            &sleeper,
            || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>("always fails")
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err(RetryError::Exhausted { attempts: 4 }));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.waits().len(), 3);
        assert_eq!(
            RetryError::<&str>::Exhausted { attempts: 4 }.to_string(),
            "upstream unavailable after 4 attempts"
        );
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let sleeper = RecordingSleeper::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry_if(
            &RetryPolicy::default(),
            &sleeper,
            || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>("permanent failure")
                }
            },
            |_| false,
        )
        .await;

        assert_eq!(result, Err(RetryError::Terminal("permanent failure")));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits().is_empty());
    }
}
