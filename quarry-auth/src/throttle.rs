//! Temporary lockout of principals with too many failed login attempts.

use crate::config::ThrottleConfig;
use crate::errors::AuthError;
use dashmap::DashMap;
use log::{debug, warn};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct LoginAttempt {
    counter: i64,
    last_attempt: Instant,
}

impl LoginAttempt {
    fn new() -> Self {
        Self {
            counter: 0,
            last_attempt: Instant::now(),
        }
    }

    fn reset(&mut self) {
        self.counter = 0;
        self.last_attempt = Instant::now();
    }
}

/// Per-principal failed-attempt counter with a time-window reset.
///
/// State is keyed by the credential's declared identity, so unrelated
/// principals never contend; every transition for one principal runs under
/// that entry's lock. With a non-positive limit or timeout the throttle is
/// disabled and tracks nothing.
pub struct LoginAttemptThrottle {
    attempts: DashMap<String, LoginAttempt>,
    limit: i64,
    timeout: Duration,
    enabled: bool,
}

impl LoginAttemptThrottle {
    pub fn new(config: &ThrottleConfig) -> Self {
        let enabled = config.enabled();
        if !enabled {
            debug!("login attempt throttling is disabled");
        }
        Self {
            attempts: DashMap::new(),
            limit: config.limit,
            timeout: Duration::from_secs(config.timeout_secs.max(0) as u64),
            enabled,
        }
    }

    /// Checks whether the principal may attempt a login. A locked principal
    /// keeps its window fresh: retrying while locked re-increments the
    /// counter and restamps the timestamp.
    pub fn before_attempt(&self, principal: &str) -> Result<(), AuthError> {
        if !self.enabled {
            return Ok(());
        }

        let mut entry = self
            .attempts
            .entry(principal.to_string())
            .or_insert_with(LoginAttempt::new);

        if entry.last_attempt.elapsed() > self.timeout {
            debug!("login attempt window for {} elapsed, reset counter", principal);
            entry.reset();
        }

        if entry.counter >= self.limit {
            entry.counter += 1;
            entry.last_attempt = Instant::now();
            warn!("login attempt limit for {} reached, attempt blocked", principal);
            return Err(AuthError::AccountLocked);
        }

        Ok(())
    }

    /// Clears the principal's state after a successful authentication.
    pub fn on_success(&self, principal: &str) {
        if !self.enabled {
            return;
        }
        self.attempts.remove(principal);
    }

    /// Records a failed authentication.
    pub fn on_failure(&self, principal: &str) {
        if !self.enabled {
            return;
        }

        let mut entry = self
            .attempts
            .entry(principal.to_string())
            .or_insert_with(LoginAttempt::new);
        entry.counter += 1;
        entry.last_attempt = Instant::now();
        debug!(
            "failed login attempt {} of {} for {}",
            entry.counter, self.limit, principal
        );
    }
}
