//! Page text recognition and retrying of flaky recognition services.

use std::thread;
use std::time::Duration;

use crate::error::Result;

/// Turns a rendered page image into text.
pub trait TextRecognizer {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Recognize the text of a PNG-encoded page (`page` is 1-based).
    fn recognize(&self, png: &[u8], page: usize) -> Result<String>;
}

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles each time.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retrying after the failed attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    }

    /// Run `op`, retrying only while it fails with a transient error.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    let wait = self.delay(attempt);
                    log::warn!(
                        "{} unavailable, retrying in {:?} ({}/{}): {}",
                        what,
                        wait,
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;

    fn instant() -> RetryPolicy {
        RetryPolicy::new(5, Duration::ZERO)
    }

    #[test]
    fn test_default_delays_double() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..5).map(|a| policy.delay(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_retries_transient_until_success() {
        let calls = Cell::new(0);
        let result = instant().run("gemini", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(Error::ServiceUnavailable("503".into()))
            } else {
                Ok("text")
            }
        });
        assert_eq!(result.unwrap(), "text");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<()> = instant().run("gemini", || {
            calls.set(calls.get() + 1);
            Err(Error::ServiceUnavailable("overloaded".into()))
        });
        assert!(matches!(result, Err(Error::ServiceUnavailable(_))));
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn test_non_transient_fails_immediately() {
        let calls = Cell::new(0);
        let result: Result<()> = instant().run("gemini", || {
            calls.set(calls.get() + 1);
            Err(Error::Service("400 invalid key".into()))
        });
        assert!(matches!(result, Err(Error::Service(_))));
        assert_eq!(calls.get(), 1);
    }
}
