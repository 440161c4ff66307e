//! Per-provider circuit breaker (spec §4.2).
//!
//! Three states — Closed, Open, HalfOpen — derived from a single
//! `openUntil` timestamp plus a failure counter. Unlike the lock-free
//! atomics breaker this crate's teacher uses elsewhere, `recordSuccess` and
//! `recordFailure` here must each be a single compound transition across
//! several fields at once (counters *and* `openUntil` together), so the
//! state lives behind one `Mutex` rather than independent atomics.

use std::sync::Mutex;
use std::time::Duration;

/// A provider whose `failure_threshold` is this large never opens in
/// practice — the "effectively disabled breaker" sentinel for a terminal
/// fallback that must always be attempted.
pub const DISABLED_THRESHOLD: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

/// Static per-provider breaker wiring (part of `ProviderConfig`, spec §3).
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: usize,
    pub reset_timeout: Duration,
    pub use_exponential_backoff: bool,
    pub max_reset_timeout: Duration,
}

impl BreakerConfig {
    pub fn new(failure_threshold: usize, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            use_exponential_backoff: false,
            max_reset_timeout: reset_timeout,
        }
    }

    pub fn with_exponential_backoff(mut self, max_reset_timeout: Duration) -> Self {
        self.use_exponential_backoff = true;
        self.max_reset_timeout = max_reset_timeout;
        self
    }

    /// A breaker that never opens, for a terminal fallback provider.
    pub fn disabled() -> Self {
        Self {
            failure_threshold: DISABLED_THRESHOLD,
            reset_timeout: Duration::ZERO,
            use_exponential_backoff: false,
            max_reset_timeout: Duration::ZERO,
        }
    }
}

#[derive(Debug)]
struct Inner {
    consecutive_failures: usize,
    failure_multiplier: u32,
    open_until_millis: Option<u64>,
}

impl Default for Inner {
    fn default() -> Self {
        Self { consecutive_failures: 0, failure_multiplier: 1, open_until_millis: None }
    }
}

/// Snapshot of breaker state, safe to hand out to concurrent diagnostic callers.
#[derive(Debug, Clone)]
pub struct CircuitSnapshot {
    pub status: CircuitStatus,
    pub open_until_millis: Option<u64>,
    pub consecutive_failures: usize,
}

/// Runtime per-provider breaker state. Created once at chain construction and
/// owned for the process lifetime; mutated only via `record_success` /
/// `record_failure`.
#[derive(Debug)]
pub struct CircuitState {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitState {
    pub fn new(config: BreakerConfig) -> Self {
        Self { config, inner: Mutex::new(Inner::default()) }
    }

    /// Pure read: derive the breaker's status as of `now_millis`.
    pub fn observed_status(&self, now_millis: u64) -> CircuitStatus {
        let inner = self.inner.lock().expect("circuit state mutex poisoned");
        match inner.open_until_millis {
            None => CircuitStatus::Closed,
            Some(open_until) if now_millis >= open_until => CircuitStatus::HalfOpen,
            Some(_) => CircuitStatus::Open,
        }
    }

    /// Unconditionally closes the breaker and resets its counters.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit state mutex poisoned");
        inner.consecutive_failures = 0;
        inner.failure_multiplier = 1;
        inner.open_until_millis = None;
    }

    /// Records a failure as of `now_millis`, opening the breaker if the
    /// threshold is reached (including while HalfOpen, where the threshold
    /// was already met and this re-opens with the next timeout).
    pub fn record_failure(&self, now_millis: u64) {
        let mut inner = self.inner.lock().expect("circuit state mutex poisoned");
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        if inner.consecutive_failures >= self.config.failure_threshold {
            let timeout = if self.config.use_exponential_backoff {
                let scaled = self
                    .config
                    .reset_timeout
                    .checked_mul(inner.failure_multiplier)
                    .unwrap_or(self.config.max_reset_timeout);
                scaled.min(self.config.max_reset_timeout)
            } else {
                self.config.reset_timeout
            };

            inner.open_until_millis = Some(now_millis + timeout.as_millis() as u64);

            if self.config.use_exponential_backoff {
                inner.failure_multiplier = inner.failure_multiplier.saturating_mul(2);
            }

            tracing::warn!(
                consecutive_failures = inner.consecutive_failures,
                threshold = self.config.failure_threshold,
                timeout_ms = timeout.as_millis() as u64,
                "circuit breaker open"
            );
        }
    }

    pub fn snapshot(&self, now_millis: u64) -> CircuitSnapshot {
        let inner = self.inner.lock().expect("circuit state mutex poisoned");
        let status = match inner.open_until_millis {
            None => CircuitStatus::Closed,
            Some(open_until) if now_millis >= open_until => CircuitStatus::HalfOpen,
            Some(_) => CircuitStatus::Open,
        };
        CircuitSnapshot {
            status,
            open_until_millis: inner.open_until_millis,
            consecutive_failures: inner.consecutive_failures,
        }
    }
}
