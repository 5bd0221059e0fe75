//! Retry policy for calls to the search backend.

use std::time::Duration;

use backoff::backoff::Backoff;

use sukl_types::RetrySettings;

use crate::error::SearchError;

/// Statuses worth another attempt.
pub const RETRYABLE_STATUS: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Synthetic status for a transport-level timeout.
pub const TIMEOUT_STATUS: u16 = 504;

/// Synthetic status for any other transport-level failure.
pub const NETWORK_ERROR_STATUS: u16 = 502;

pub fn is_retryable(status: u16) -> bool {
    RETRYABLE_STATUS.contains(&status)
}

/// Maximum attempts plus the sleeps between them.
///
/// The schedule always has `max_attempts - 1` entries: there is nothing to
/// wait for after the final attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delays: Vec<Duration>) -> Result<Self, SearchError> {
        if max_attempts == 0 {
            return Err(SearchError::Config(
                "retry policy needs at least one attempt".to_string(),
            ));
        }
        if delays.len() != (max_attempts - 1) as usize {
            return Err(SearchError::Config(format!(
                "retry policy with {} attempts needs {} delays, got {}",
                max_attempts,
                max_attempts - 1,
                delays.len()
            )));
        }
        Ok(Self {
            max_attempts,
            delays,
        })
    }

    pub fn from_settings(settings: &RetrySettings) -> Result<Self, SearchError> {
        Self::new(settings.max_attempts, settings.backoff())
    }

    /// A single attempt, no sleeps.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delays: Vec::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Fresh schedule for one logical call.
    pub fn schedule(&self) -> FixedSchedule {
        FixedSchedule::new(self.delays.clone())
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, sleeping 1s then 3s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delays: vec![Duration::from_secs(1), Duration::from_secs(3)],
        }
    }
}

/// Backoff that yields a fixed list of delays once, then stops.
#[derive(Debug, Clone)]
pub struct FixedSchedule {
    delays: Vec<Duration>,
    next: usize,
}

impl FixedSchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays, next: 0 }
    }
}

impl Backoff for FixedSchedule {
    fn reset(&mut self) {
        self.next = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        let delay = self.delays.get(self.next).copied();
        if delay.is_some() {
            self.next += 1;
        }
        delay
    }
}
