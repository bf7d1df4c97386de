// src/utils/clock.rs
//! Time source for record timestamps.
//!
//! Registries stamp records with unix seconds taken from an injected [`Clock`]
//! so tests can pin and advance time explicitly.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the commit timestamp for registry mutations.
pub trait Clock: Send + Sync {
    /// Current time as unix seconds.
    fn now(&self) -> u64;
}

/// Wall clock in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Negative only before 1970; clamp rather than wrap.
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Manually driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        ManualClock {
            seconds: AtomicU64::new(start),
        }
    }

    pub fn set(&self, seconds: u64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    /// Moves the clock forward and returns the new time.
    pub fn advance(&self, by: u64) -> u64 {
        self.seconds.fetch_add(by, Ordering::SeqCst) + by
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }
}
