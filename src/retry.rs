//! Bounded retry with exponential backoff.
//!
//! One policy type serves every retried operation on the node: telemetry
//! upload, alert upload and Wi-Fi scanning.  Each attempt gets a fresh
//! call of the operation closure, so resources acquired inside it (HTTP
//! connections, scan buffers) are released between attempts.

use serde::{Deserialize, Serialize};

use crate::app::ports::Timebase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u8,
    /// Wait before the second attempt.
    pub base_delay_ms: u32,
    /// Factor applied to the wait after each further failure.
    pub multiplier: u32,
    /// Upper bound on any single wait.
    pub max_delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            multiplier: 2,
            max_delay_ms: 30_000,
        }
    }
}

/// Result of a retried operation and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u8,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u8, base_delay_ms: u32, multiplier: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            multiplier,
            max_delay_ms: 30_000,
        }
    }

    /// Wait before 1-based `attempt`; zero for the first.
    pub fn delay_before(&self, attempt: u8) -> u32 {
        if attempt <= 1 {
            return 0;
        }
        let mut delay = self.base_delay_ms;
        for _ in 2..attempt {
            delay = delay.saturating_mul(self.multiplier);
        }
        delay.min(self.max_delay_ms)
    }

    /// Call `op` with the 1-based attempt number until it succeeds or the
    /// attempts run out, sleeping on `time` between failures.
    pub fn run<T, E>(
        &self,
        time: &mut impl Timebase,
        mut op: impl FnMut(u8) -> Result<T, E>,
    ) -> Retried<T, E> {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = op(attempt);
            if result.is_ok() || attempt >= max {
                return Retried {
                    result,
                    attempts: attempt,
                };
            }
            attempt += 1;
            time.delay_ms(self.delay_before(attempt));
        }
    }
}
