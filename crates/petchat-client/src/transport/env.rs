//! Production environment.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use petchat_core::Environment;

/// System clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn wall_clock_millis(&self) -> u64 {
        // A clock before 1970 only affects ping payloads.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = env.now();

        assert!(t2 > t1);
    }

    #[test]
    fn wall_clock_is_after_2020() {
        assert!(SystemEnv::new().wall_clock_millis() > 1_577_836_800_000);
    }

    #[tokio::test]
    async fn sleep_waits() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_millis(20)).await;

        assert!(env.now() - start >= Duration::from_millis(20));
    }
}
