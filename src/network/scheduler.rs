//! Fixed-Rate Tick Scheduler
//!
//! Drift-compensated: each tick is aimed at `previous expected + interval`.
//! When the wall clock has already passed that instant the tick runs right
//! away and the expectation resets to now, so an overloaded room slows down
//! instead of bursting through a backlog of missed ticks.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Pure timing state of one tick loop.
#[derive(Clone, Copy, Debug)]
pub struct DriftClock {
    interval: Duration,
    expected: Instant,
    last: Instant,
}

impl DriftClock {
    /// Clock whose first tick is due one interval after `now`.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            expected: now + interval,
            last: now,
        }
    }

    /// Clock for a tick rate in Hz.
    pub fn from_rate(tick_rate: u32, now: Instant) -> Self {
        Self::new(Duration::from_micros(1_000_000 / tick_rate.max(1) as u64), now)
    }

    /// When the next tick should fire.
    pub fn deadline(&self) -> Instant {
        self.expected
    }

    /// Record a tick firing at `now` and schedule the next one.
    ///
    /// Returns the seconds elapsed since the previous tick.
    pub fn fire(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;

        let next = self.expected + self.interval;
        self.expected = if now >= next { now } else { next };
        elapsed
    }
}

/// Handle to a running tick loop.
#[derive(Debug, Default)]
pub struct TickScheduler {
    handle: Option<JoinHandle<()>>,
}

impl TickScheduler {
    /// Not yet running.
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Spawn the loop. `on_tick` receives the elapsed seconds and returns
    /// false to end the loop. Restarts if already running.
    pub fn start<F, Fut>(&mut self, tick_rate: u32, mut on_tick: F)
    where
        F: FnMut(f32) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        self.stop();
        self.handle = Some(tokio::spawn(async move {
            let mut clock = DriftClock::from_rate(tick_rate, Instant::now());
            loop {
                sleep_until(clock.deadline()).await;
                let dt = clock.fire(Instant::now());
                if !on_tick(dt).await {
                    debug!("tick loop finished");
                    break;
                }
            }
        }));
    }

    /// Cancel the loop. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Is a loop currently attached?
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
