//! Time source used by the wait state machine

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::provider::BoxFuture;

/// Source of "now" and of suspend points between polls
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual clock for tests
///
/// Sleeping completes immediately, advances virtual time by the requested
/// duration and records it. Time only moves when a sleep future is polled.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += duration;
    }

    /// Virtual time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every completed sleep, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.sleeps
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(duration);
            self.advance(duration);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_secs(5)).await;
        clock.sleep(Duration::from_secs(1)).await;
        assert_eq!(clock.now() - start, Duration::from_secs(6));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(5), Duration::from_secs(1)]
        );
    }

    #[test]
    fn unpolled_sleep_does_not_advance() {
        let clock = ManualClock::new();
        let fut = clock.sleep(Duration::from_secs(30));
        drop(fut);
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn tokio_clock_sleeps() {
        let clock = TokioClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.now() - start >= Duration::from_millis(5));
    }
}
