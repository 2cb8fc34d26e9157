//! Dual sliding-window admission control for the Riot API.
//!
//! Riot enforces two request ceilings at once: a short per-second window and
//! a long two-minute window. Every outbound request must take a slot in both
//! windows before it is sent. The purge+check+append sequence runs under one
//! lock, so concurrent callers can never overshoot either ceiling.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const SHORT_WINDOW: Duration = Duration::from_secs(1);
const LONG_WINDOW: Duration = Duration::from_secs(120);
/// Floor for a capped sleep so a caller past its `max_wait` still yields
/// between re-checks instead of spinning.
const MIN_SLEEP: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct Windows {
    short: VecDeque<Instant>,
    long: VecDeque<Instant>,
    total_grants: u64,
}

impl Windows {
    fn purge(&mut self, now: Instant) {
        while self
            .short
            .front()
            .is_some_and(|&t| now.duration_since(t) >= SHORT_WINDOW)
        {
            self.short.pop_front();
        }
        while self
            .long
            .front()
            .is_some_and(|&t| now.duration_since(t) >= LONG_WINDOW)
        {
            self.long.pop_front();
        }
    }
}

/// Shared admission controller. One instance governs every outbound request
/// in the process, however many collection cycles run concurrently.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    per_second: usize,
    per_two_minutes: usize,
    windows: Mutex<Windows>,
}

impl SlidingWindowLimiter {
    /// Ceilings below 1 are raised to 1: a zero ceiling has no slot that
    /// could ever expire, so `acquire` would spin forever.
    pub fn new(per_second: usize, per_two_minutes: usize) -> Self {
        Self {
            per_second: per_second.max(1),
            per_two_minutes: per_two_minutes.max(1),
            windows: Mutex::new(Windows::default()),
        }
    }

    /// Block until a request may legally be sent under both ceilings, then
    /// record the grant.
    ///
    /// `max_wait` caps any single sleep so the call re-checks near the
    /// deadline; it does not fail on timeout and always grants eventually.
    pub async fn acquire(&self, max_wait: Option<Duration>) {
        let start = Instant::now();
        loop {
            let wait = {
                let mut w = self.windows.lock().await;
                let now = Instant::now();
                w.purge(now);
                if w.short.len() < self.per_second && w.long.len() < self.per_two_minutes {
                    w.short.push_back(now);
                    w.long.push_back(now);
                    w.total_grants += 1;
                    return;
                }
                // Time until the earliest slot in an over-full window expires.
                let wait_short = (w.short.len() >= self.per_second)
                    .then(|| w.short.front())
                    .flatten()
                    .map(|&t| SHORT_WINDOW.saturating_sub(now.duration_since(t)));
                let wait_long = (w.long.len() >= self.per_two_minutes)
                    .then(|| w.long.front())
                    .flatten()
                    .map(|&t| LONG_WINDOW.saturating_sub(now.duration_since(t)));
                match (wait_short, wait_long) {
                    (Some(a), Some(b)) => a.min(b),
                    (Some(a), None) => a,
                    (None, Some(b)) => b,
                    (None, None) => MIN_SLEEP,
                }
            };

            let mut sleep_for = wait;
            if let Some(cap) = max_wait {
                let elapsed = start.elapsed();
                if elapsed + sleep_for > cap {
                    sleep_for = cap.saturating_sub(elapsed);
                }
            }
            if sleep_for.is_zero() {
                sleep_for = MIN_SLEEP;
            }
            debug!(wait = ?sleep_for, "rate budget exhausted, waiting");
            tokio::time::sleep(sleep_for).await;
        }
    }

    /// Total grants handed out since construction.
    pub async fn total_grants(&self) -> u64 {
        self.windows.lock().await.total_grants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[tokio::test(start_paused = true)]
    async fn grants_immediately_under_ceiling() {
        let limiter = SlidingWindowLimiter::new(5, 100);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire(None).await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.total_grants().await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ceiling_still_admits_one_per_window() {
        let limiter = SlidingWindowLimiter::new(0, 100);
        limiter.acquire(None).await;

        let start = Instant::now();
        limiter.acquire(None).await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(1), "waited {waited:?}");
        assert!(waited < Duration::from_secs(2), "waited {waited:?}");
        assert_eq!(limiter.total_grants().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn short_window_forces_wait() {
        let limiter = SlidingWindowLimiter::new(2, 100);
        limiter.acquire(None).await;
        limiter.acquire(None).await;

        let start = Instant::now();
        limiter.acquire(None).await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(1), "waited {waited:?}");
        assert!(waited < Duration::from_secs(2), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn long_window_forces_wait() {
        let limiter = SlidingWindowLimiter::new(10, 2);
        limiter.acquire(None).await;
        limiter.acquire(None).await;

        let start = Instant::now();
        limiter.acquire(None).await;
        assert!(start.elapsed() >= Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn max_wait_caps_sleep_but_still_grants() {
        let limiter = SlidingWindowLimiter::new(1, 100);
        limiter.acquire(None).await;

        let start = Instant::now();
        limiter.acquire(Some(Duration::from_millis(200))).await;
        // The capped sleeps keep re-checking until the slot frees at 1s.
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_exceed_ceiling() {
        let limiter = Arc::new(SlidingWindowLimiter::new(3, 100));
        let grants: Arc<StdMutex<Vec<Instant>>> = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            let grants = grants.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire(None).await;
                grants.lock().unwrap().push(Instant::now());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut times = grants.lock().unwrap().clone();
        times.sort();
        assert_eq!(times.len(), 10);
        for (i, &t) in times.iter().enumerate() {
            let in_window = times[..=i]
                .iter()
                .filter(|&&u| t.duration_since(u) < Duration::from_secs(1))
                .count();
            assert!(in_window <= 3, "{in_window} grants in a 1s window");
        }
    }
}
