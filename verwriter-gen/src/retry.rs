//! Bounded retry for transient filesystem failures.

use std::io;
use std::time::Duration;

/// Fixed attempt count with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(500),
        }
    }
}

/// All attempts failed, or retrying was declined.
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last: io::Error,
}

impl RetryPolicy {
    /// Run `op` until it succeeds or the budget runs out.
    ///
    /// `should_retry` is consulted after each failure except the last; returning
    /// `false` stops immediately. A policy with zero attempts still runs once.
    pub fn run<T>(
        &self,
        mut op: impl FnMut(u32) -> io::Result<T>,
        mut should_retry: impl FnMut(u32, &io::Error) -> bool,
    ) -> Result<T, RetryExhausted> {
        let max = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= max || !should_retry(attempt, &err) {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    tracing::debug!("attempt {attempt}/{max} failed: {err}; retrying");
                    std::thread::sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}
