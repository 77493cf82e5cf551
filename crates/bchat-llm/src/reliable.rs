use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use bchat_core::config::{ApiConfig, ErrorHandlingConfig};
use bchat_core::errors::GatewayError;
use bchat_core::summary::SessionSummary;

use crate::parse;
use crate::provider::SummaryProvider;

/// Configuration for the resilient call orchestrator.
#[derive(Clone, Debug)]
pub struct ResilienceConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub max_retries: u32,
    pub rate_limit_per_minute: usize,
    pub backoff_base: u32,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(300),
            max_retries: 3,
            rate_limit_per_minute: 60,
            backoff_base: 2,
            max_backoff: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ResilienceConfig {
    pub fn from_config(api: &ApiConfig, errors: &ErrorHandlingConfig) -> Self {
        Self {
            failure_threshold: errors.circuit_breaker_threshold,
            recovery_timeout: Duration::from_secs(errors.circuit_breaker_timeout_secs),
            max_retries: api.max_retries,
            rate_limit_per_minute: api.rate_limit_requests_per_minute,
            backoff_base: errors.exponential_backoff_base,
            max_backoff: Duration::from_secs(errors.max_backoff_seconds),
            request_timeout: Duration::from_secs(api.timeout_secs),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Failure-isolation state machine guarding the one outbound dependency.
/// One instance per process, shared by reference among concurrent pipeline
/// runs; all transitions happen under a single mutex.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    /// Check whether a call may proceed. An open breaker past its recovery
    /// timeout moves to half-open and lets one trial call through.
    pub fn try_acquire(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed > self.recovery_timeout {
                    info!("circuit breaker half-open, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    Err(GatewayError::CircuitOpen)
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;
        if inner.state != CircuitState::Closed {
            info!("circuit breaker closed after successful call");
            inner.state = CircuitState::Closed;
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::HalfOpen => {
                warn!("trial call failed, circuit breaker re-opened");
                inner.state = CircuitState::Open;
            }
            CircuitState::Closed if inner.failure_count >= self.failure_threshold => {
                warn!(
                    failures = inner.failure_count,
                    "circuit breaker opened after consecutive failures"
                );
                inner.state = CircuitState::Open;
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }
}

/// Sliding-window rate limiter: at most `limit` calls in the trailing
/// window. A full window sleeps for its remainder instead of failing,
/// blocking only the calling task.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: usize) -> Self {
        Self::with_window(limit, Duration::from_secs(60))
    }

    pub fn with_window(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock();
                let now = Instant::now();
                while let Some(front) = timestamps.front() {
                    if now.duration_since(*front) >= self.window {
                        timestamps.pop_front();
                    } else {
                        break;
                    }
                }
                match timestamps.front() {
                    // Oldest call ages out of the window first.
                    Some(front) if timestamps.len() >= self.limit => {
                        Some(self.window - now.duration_since(*front))
                    }
                    _ => {
                        timestamps.push_back(now);
                        None
                    }
                }
            };
            match wait {
                None => return,
                Some(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "rate limit window full, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    pub fn in_flight_window(&self) -> usize {
        self.timestamps.lock().len()
    }
}

/// Wraps a SummaryProvider with the circuit breaker, rate limiter, and
/// retry/backoff policy, and parses the response. Never returns an error:
/// every failure mode degrades to a structured payload so callers can still
/// persist the session.
pub struct ReliableClient<P: SummaryProvider> {
    inner: P,
    config: ResilienceConfig,
    breaker: Arc<CircuitBreaker>,
    limiter: Arc<RateLimiter>,
}

impl<P: SummaryProvider> ReliableClient<P> {
    pub fn new(inner: P, config: ResilienceConfig) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(
            config.failure_threshold,
            config.recovery_timeout,
        ));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self::with_shared(inner, config, breaker, limiter)
    }

    /// Share breaker and limiter across clients (one of each per process).
    pub fn with_shared(
        inner: P,
        config: ResilienceConfig,
        breaker: Arc<CircuitBreaker>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            inner,
            config,
            breaker,
            limiter,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn provider_name(&self) -> &str {
        self.inner.name()
    }

    /// Issue the summarization call. Up to `max_retries` additional attempts
    /// after the first failure; each attempt is rate-limit checked, breaker
    /// checked, and bounded by the request timeout. An open breaker fails
    /// fast without invoking the dependency; a non-retryable error aborts
    /// the retry loop.
    pub async fn summarize(&self, prompt: &str) -> SessionSummary {
        let mut last_error: Option<GatewayError> = None;
        let mut attempts = 0u32;

        for attempt in 0..=self.config.max_retries {
            if let Err(e) = self.breaker.try_acquire() {
                warn!(error = %e, "rejecting call without invoking dependency");
                return SessionSummary::degraded("API temporarily unavailable", e.to_string());
            }
            self.limiter.acquire().await;

            attempts += 1;
            let outcome =
                match tokio::time::timeout(self.config.request_timeout, self.inner.complete(prompt))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GatewayError::Timeout(self.config.request_timeout)),
                };

            match outcome {
                Ok(text) => {
                    self.breaker.record_success();
                    return parse::parse_summary(&text);
                }
                Err(e) => {
                    self.breaker.record_failure();
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        kind = e.error_kind(),
                        error = %e,
                        "summarization attempt failed"
                    );
                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".into());
        SessionSummary::degraded(
            "API temporarily unavailable",
            format!("API call failed after {attempts} attempts: {last}"),
        )
    }

    /// Exponential delay: min(base^attempt, max_backoff) seconds.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = (self.config.backoff_base as u64).saturating_pow(attempt);
        Duration::from_secs(exp).min(self.config.max_backoff)
    }
}
