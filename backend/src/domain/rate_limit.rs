//! Sliding-window rate limiting for join attempts.
//!
//! The limiter counts *failed* attempts per device inside a rolling window
//! and rejects further joins before any session lookup happens, so code
//! guessing is throttled without revealing whether a code exists.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::ports::{JoinAttemptLedger, JoinAttemptLedgerError};
use crate::domain::{DeviceId, Error, SessionCode};

/// Environment variable overriding the window length in seconds.
pub const RATE_LIMIT_WINDOW_SECS_ENV: &str = "JOIN_RATE_LIMIT_WINDOW_SECS";

/// Environment variable overriding the failure threshold.
pub const RATE_LIMIT_MAX_FAILURES_ENV: &str = "JOIN_RATE_LIMIT_MAX_FAILURES";

/// Environment abstraction for rate limit configuration lookups.
///
/// Allows testing with stub environments without unsafe env var mutations.
pub trait RateLimitEnv {
    /// Fetch a string value by name.
    fn string(&self, name: &str) -> Option<String>;
}

/// Environment access backed by the real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRateLimitEnv;

impl RateLimitEnv for DefaultRateLimitEnv {
    fn string(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Configuration for join rate limiting.
///
/// # Example
///
/// ```
/// # use backend::domain::rate_limit::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::default();
/// assert_eq!(config.window(), Duration::from_secs(60));
/// assert_eq!(config.max_failures(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    window: Duration,
    max_failures: u32,
}

impl RateLimitConfig {
    /// Default sliding window length in seconds.
    const DEFAULT_WINDOW_SECS: u64 = 60;

    /// Default number of failed attempts tolerated inside the window.
    const DEFAULT_MAX_FAILURES: u32 = 3;

    /// Minimum allowed window, preventing a configuration that never
    /// throttles.
    const MIN_WINDOW_SECS: u64 = 1;

    /// Maximum allowed window (one day).
    const MAX_WINDOW_SECS: u64 = 24 * 3600;

    /// Load configuration from the real process environment.
    ///
    /// Reads `JOIN_RATE_LIMIT_WINDOW_SECS` (default: 60) and
    /// `JOIN_RATE_LIMIT_MAX_FAILURES` (default: 3). The window is clamped
    /// to [1, 86400]; a zero threshold is lifted to 1.
    pub fn from_env() -> Self {
        Self::from_env_with(&DefaultRateLimitEnv)
    }

    /// Load configuration from a custom environment source.
    pub fn from_env_with(env: &impl RateLimitEnv) -> Self {
        let window_secs = env
            .string(RATE_LIMIT_WINDOW_SECS_ENV)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_WINDOW_SECS)
            .clamp(Self::MIN_WINDOW_SECS, Self::MAX_WINDOW_SECS);
        let max_failures = env
            .string(RATE_LIMIT_MAX_FAILURES_ENV)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(Self::DEFAULT_MAX_FAILURES)
            .max(1);
        Self {
            window: Duration::from_secs(window_secs),
            max_failures,
        }
    }

    /// Create with explicit values (for testing).
    pub fn with_values(window: Duration, max_failures: u32) -> Self {
        Self {
            window,
            max_failures: max_failures.max(1),
        }
    }

    /// The sliding window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Failed attempts tolerated inside one window.
    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    fn window_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.window.as_secs()).unwrap_or(i64::MAX))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(Self::DEFAULT_WINDOW_SECS),
            max_failures: Self::DEFAULT_MAX_FAILURES,
        }
    }
}

/// One row of the append-only attempt ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAttempt {
    pub device_id: DeviceId,
    pub attempted_code: String,
    pub succeeded: bool,
    pub attempted_at: DateTime<Utc>,
}

impl JoinAttempt {
    /// Record of an attempt whose code resolved to a live session.
    pub fn succeeded(device_id: DeviceId, code: &SessionCode, attempted_at: DateTime<Utc>) -> Self {
        Self {
            device_id,
            attempted_code: code.as_str().to_owned(),
            succeeded: true,
            attempted_at,
        }
    }

    /// Record of an attempt that found no live session.
    pub fn failed(device_id: DeviceId, code: &SessionCode, attempted_at: DateTime<Utc>) -> Self {
        Self {
            device_id,
            attempted_code: code.as_str().to_owned(),
            succeeded: false,
            attempted_at,
        }
    }
}

/// Decision returned by [`JoinRateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The device may attempt a join.
    Allowed,
    /// The device exhausted its failures; retry after the given delay.
    Limited { retry_after_seconds: u64 },
}

fn map_ledger_error(error: JoinAttemptLedgerError) -> Error {
    match error {
        JoinAttemptLedgerError::Connection { message } => {
            Error::service_unavailable(format!("join attempt ledger unavailable: {message}"))
        }
        JoinAttemptLedgerError::Query { message } => {
            Error::internal(format!("join attempt ledger error: {message}"))
        }
    }
}

/// Sliding-window limiter over the attempt ledger.
#[derive(Clone)]
pub struct JoinRateLimiter<L> {
    ledger: Arc<L>,
    config: RateLimitConfig,
}

impl<L> JoinRateLimiter<L> {
    /// Create a limiter over the given ledger.
    pub fn new(ledger: Arc<L>, config: RateLimitConfig) -> Self {
        Self { ledger, config }
    }
}

impl<L> JoinRateLimiter<L>
where
    L: JoinAttemptLedger,
{
    /// Decide whether the device may attempt a join at `now`.
    ///
    /// The decision only reads the ledger; recording the attempt happens
    /// separately once the outcome is known, so a rejected check leaves no
    /// row behind.
    pub async fn check(
        &self,
        device_id: &DeviceId,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, Error> {
        let cutoff = now - self.config.window_chrono();
        let failures = self
            .ledger
            .failed_attempts_since(device_id, cutoff)
            .await
            .map_err(map_ledger_error)?;

        let max = self.config.max_failures() as usize;
        if failures.len() < max {
            return Ok(RateLimitDecision::Allowed);
        }

        // The device is readmitted once enough failures age out of the
        // window for the count to drop below the threshold.
        let Some(freeing) = failures.get(failures.len() - max) else {
            return Ok(RateLimitDecision::Allowed);
        };
        let freed_at = *freeing + self.config.window_chrono();
        let retry_after_seconds = u64::try_from((freed_at - now).num_seconds().max(1)).unwrap_or(1);
        Ok(RateLimitDecision::Limited {
            retry_after_seconds,
        })
    }

    /// Append an attempt row.
    pub async fn record(&self, attempt: &JoinAttempt) -> Result<(), Error> {
        self.ledger.append(attempt).await.map_err(map_ledger_error)
    }

    /// Drop rows that can no longer influence any window ending at or
    /// after `now`. Maintenance only; correctness never depends on it.
    pub async fn prune(&self, now: DateTime<Utc>) -> Result<usize, Error> {
        let cutoff = now - self.config.window_chrono();
        self.ledger
            .prune_before(cutoff)
            .await
            .map_err(map_ledger_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockJoinAttemptLedger;
    use rstest::rstest;

    struct StubEnv(Vec<(&'static str, &'static str)>);

    impl RateLimitEnv for StubEnv {
        fn string(&self, name: &str) -> Option<String> {
            self.0
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    fn device() -> DeviceId {
        DeviceId::mint()
    }

    #[rstest]
    #[case(Vec::new(), 60, 3)]
    #[case(vec![(RATE_LIMIT_WINDOW_SECS_ENV, "120")], 120, 3)]
    #[case(vec![(RATE_LIMIT_MAX_FAILURES_ENV, "5")], 60, 5)]
    #[case(vec![(RATE_LIMIT_WINDOW_SECS_ENV, "0")], 1, 3)]
    #[case(vec![(RATE_LIMIT_MAX_FAILURES_ENV, "0")], 60, 1)]
    #[case(vec![(RATE_LIMIT_WINDOW_SECS_ENV, "nonsense")], 60, 3)]
    fn config_reads_and_clamps_environment(
        #[case] vars: Vec<(&'static str, &'static str)>,
        #[case] window_secs: u64,
        #[case] max_failures: u32,
    ) {
        let config = RateLimitConfig::from_env_with(&StubEnv(vars));
        assert_eq!(config.window(), Duration::from_secs(window_secs));
        assert_eq!(config.max_failures(), max_failures);
    }

    #[tokio::test]
    async fn allows_device_below_threshold() {
        let now = Utc::now();
        let mut ledger = MockJoinAttemptLedger::new();
        ledger
            .expect_failed_attempts_since()
            .return_once(move |_, _| Ok(vec![now - chrono::Duration::seconds(10)]));

        let limiter = JoinRateLimiter::new(Arc::new(ledger), RateLimitConfig::default());
        let decision = limiter.check(&device(), now).await.expect("check succeeds");
        assert_eq!(decision, RateLimitDecision::Allowed);
    }

    #[tokio::test]
    async fn limits_device_at_threshold_with_retry_delay() {
        let now = Utc::now();
        let failures = vec![
            now - chrono::Duration::seconds(50),
            now - chrono::Duration::seconds(30),
            now - chrono::Duration::seconds(5),
        ];
        let mut ledger = MockJoinAttemptLedger::new();
        ledger
            .expect_failed_attempts_since()
            .return_once(move |_, _| Ok(failures));

        let limiter = JoinRateLimiter::new(Arc::new(ledger), RateLimitConfig::default());
        let decision = limiter.check(&device(), now).await.expect("check succeeds");
        // The oldest failure ages out 10 seconds from now.
        assert_eq!(
            decision,
            RateLimitDecision::Limited {
                retry_after_seconds: 10
            }
        );
    }

    #[tokio::test]
    async fn ignores_failures_outside_the_window() {
        let now = Utc::now();
        let mut ledger = MockJoinAttemptLedger::new();
        ledger
            .expect_failed_attempts_since()
            .withf(move |_, cutoff| *cutoff == now - chrono::Duration::seconds(60))
            .return_once(|_, _| Ok(Vec::new()));

        let limiter = JoinRateLimiter::new(Arc::new(ledger), RateLimitConfig::default());
        let decision = limiter.check(&device(), now).await.expect("check succeeds");
        assert_eq!(decision, RateLimitDecision::Allowed);
    }

    #[tokio::test]
    async fn maps_connection_errors_to_service_unavailable() {
        let mut ledger = MockJoinAttemptLedger::new();
        ledger
            .expect_failed_attempts_since()
            .return_once(|_, _| Err(JoinAttemptLedgerError::connection("down")));

        let limiter = JoinRateLimiter::new(Arc::new(ledger), RateLimitConfig::default());
        let error = limiter
            .check(&device(), Utc::now())
            .await
            .expect_err("ledger offline");
        assert_eq!(error.code(), crate::domain::ErrorCode::ServiceUnavailable);
    }
}
