// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so tests can control timestamps deterministically.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Anything that can tell the current time. Implemented by `SystemClock`
/// for production and `FakeClock` for tests.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    fn epoch_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic, manually-advanced clock for tests.
#[derive(Clone)]
pub struct FakeClock {
    millis: Arc<AtomicI64>,
}

impl FakeClock {
    pub fn at_epoch_ms(millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(millis)),
        }
    }

    /// Advance the clock by `ms` milliseconds and return the new time.
    pub fn advance_ms(&self, ms: i64) -> DateTime<Utc> {
        let new_val = self.millis.fetch_add(ms, Ordering::SeqCst) + ms;
        Utc.timestamp_millis_opt(new_val).single().unwrap_or(Utc::now())
    }

    pub fn set_epoch_ms(&self, ms: i64) {
        self.millis.store(ms, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms).single().unwrap_or(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_deterministically() {
        let clock = FakeClock::at_epoch_ms(1_000);
        assert_eq!(clock.epoch_ms(), 1_000);
        clock.advance_ms(500);
        assert_eq!(clock.epoch_ms(), 1_500);
    }
}
