//! Time source abstraction for retry, settle, and debounce delays.
//!
//! Every suspension point in the engine goes through [`Clock`] so that
//! simulations and tests can advance time without real waiting.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Injectable time source used by the discovery loop, menu surfaces, and
/// the engine's debounce timer.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Returns the current instant according to this clock.
    fn now(&self) -> Instant;

    /// Suspends the caller for `duration` of clock time.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by tokio timers.
///
/// Reads tokio's clock so paused-time tests see the same instants the
/// timers use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_clock_sleeps_forward() {
        let clock = SystemClock;
        let start = clock.now();

        clock.sleep(Duration::from_millis(5)).await;

        assert!(clock.now().duration_since(start) >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_zero_sleep_returns_immediately() {
        let clock = SystemClock;
        let start = clock.now();

        clock.sleep(Duration::ZERO).await;

        assert!(clock.now().duration_since(start) < Duration::from_secs(1));
    }
}
