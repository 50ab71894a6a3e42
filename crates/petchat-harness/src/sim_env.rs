//! Virtual clock.

use std::{
    ops::{Add, Sub},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use petchat_core::Environment;

/// Wall clock reading at virtual time zero, in Unix millis.
pub const SIM_EPOCH_MILLIS: u64 = 1_700_000_000_000;

/// Instant on the virtual clock, in nanoseconds since start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(u64);

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, delta: Duration) -> Self {
        Self(self.0.saturating_add(u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX)))
    }
}

/// Environment whose time only moves through [`SimEnv::advance`].
///
/// Clones share the clock. `sleep` returns at once and advances the clock by
/// the requested duration.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    nanos: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: Duration) {
        let nanos = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn wall_clock_millis(&self) -> u64 {
        SIM_EPOCH_MILLIS + self.nanos.load(Ordering::SeqCst) / 1_000_000
    }
}
