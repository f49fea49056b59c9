//! Circuit breaker guarding calls to the MCP gateway, per Michael Nygard's
//! Release It! pattern: CLOSED (normal), OPEN (failing, reject immediately),
//! HALF_OPEN (single test call after the recovery timeout elapses).
//!
//! Exclusively owned by one `McpGatewayClient`; its lifetime equals the
//! client's.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use ragcore_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(Inner { state: CircuitState::Closed, failure_count: 0, last_failure_time: None }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;
        inner.state = CircuitState::Closed;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());

        if inner.failure_count >= self.failure_threshold {
            inner.state = CircuitState::Open;
        }
    }

    /// Returns `Ok(())` if a call may proceed, or `Err(Error::CircuitOpen)`
    /// with the remaining recovery time otherwise. Transitions OPEN to
    /// HALF_OPEN as a side effect once the recovery timeout has elapsed,
    /// allowing exactly the caller that observes the transition through.
    pub fn can_execute(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let Some(last_failure) = inner.last_failure_time else {
                    return Ok(());
                };
                let elapsed = last_failure.elapsed();
                if elapsed >= self.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    let remaining = self.recovery_timeout - elapsed;
                    Err(Error::CircuitOpen { remaining_secs: remaining.as_secs_f64() })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn rejects_calls_while_open() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.record_failure();
        assert!(breaker.can_execute().is_err());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn transitions_to_half_open_after_recovery_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        assert!(breaker.can_execute().is_err());
        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.can_execute().is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }
}
