//! Environment abstraction for deterministic testing.
//!
//! Decouples drivers from the system clock. Production uses tokio timers;
//! tests use a virtual clock that only advances when told to.

use std::time::Duration;

/// Abstract environment providing time and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, simulation uses a
    /// virtual instant.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this. State machines take time as input.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Milliseconds since the Unix epoch, for wire timestamps such as `ping`.
    fn wall_clock_millis(&self) -> u64;
}
