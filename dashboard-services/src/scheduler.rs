//! Interval scheduler for polling services
//!
//! Drives an async tick closure at a fixed interval. At most one timer
//! loop is active per scheduler: `start` while running replaces the
//! existing timer, and `stop` while stopped is a no-op. The tick body
//! is awaited inside the loop, so ticks are strictly serialized; if a
//! tick outlasts the interval, the overdue tick is skipped rather than
//! queued.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

struct RunningTimer {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Replaceable fixed-interval timer driving one polling consumer
pub struct Scheduler {
    name: String,
    timer: Mutex<Option<RunningTimer>>,
}

impl Scheduler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timer: Mutex::new(None),
        }
    }

    /// Start ticking at the given interval
    ///
    /// The first tick fires one full interval after this call. If the
    /// scheduler is already running, the existing timer is replaced;
    /// its in-flight tick (if any) settles before the old loop exits,
    /// and the tick rate is never doubled.
    pub fn start<F, Fut>(&self, interval: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let name = self.name.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        debug!("[Scheduler:{}] timer loop stopping", name);
                        break;
                    }
                    _ = ticker.tick() => {
                        // Awaited inline: the next tick cannot begin
                        // until this one settles.
                        tick().await;
                        if *stop_rx.borrow() {
                            debug!("[Scheduler:{}] stopped during tick; exiting", name);
                            break;
                        }
                    }
                }
            }
        });

        let mut slot = self.timer.lock();
        if let Some(old) = slot.take() {
            info!("[Scheduler:{}] restarting; replacing existing timer", self.name);
            let _ = old.stop_tx.send(true);
        } else {
            info!(
                "[Scheduler:{}] started with interval {:?}",
                self.name, interval
            );
        }
        *slot = Some(RunningTimer { stop_tx, task });
    }

    /// Cancel the pending timer
    ///
    /// A tick already in flight settles and its result is still
    /// delivered; no further ticks fire afterwards. Calling `stop` on
    /// a stopped scheduler is a no-op.
    pub fn stop(&self) {
        let mut slot = self.timer.lock();
        match slot.take() {
            Some(timer) => {
                let _ = timer.stop_tx.send(true);
                info!("[Scheduler:{}] stopped", self.name);
            }
            None => {
                debug!("[Scheduler:{}] stop called while stopped; ignoring", self.name);
            }
        }
    }

    /// Whether a timer loop is currently active
    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .map(|t| !t.task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.lock().take() {
            let _ = timer.stop_tx.send(true);
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const INTERVAL: Duration = Duration::from_secs(1);

    fn counting_tick(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    async fn advance_intervals(n: u32) {
        for _ in 0..n {
            tokio::time::advance(INTERVAL).await;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_tick_per_interval() {
        let scheduler = Scheduler::new("test");
        let ticks = Arc::new(AtomicUsize::new(0));

        scheduler.start(INTERVAL, counting_tick(&ticks));
        tokio::task::yield_now().await;

        // No tick before the first interval elapses.
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        advance_intervals(5).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_does_not_double_tick_rate() {
        let scheduler = Scheduler::new("test");
        let ticks = Arc::new(AtomicUsize::new(0));

        scheduler.start(INTERVAL, counting_tick(&ticks));
        scheduler.start(INTERVAL, counting_tick(&ticks));
        tokio::task::yield_now().await;

        advance_intervals(5).await;

        // One timer loop, not two: 5 intervals, 5 ticks (plus or minus
        // one for the replacement boundary).
        let observed = ticks.load(Ordering::SeqCst);
        assert!(
            (4..=6).contains(&observed),
            "expected ~5 ticks, observed {}",
            observed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticking() {
        let scheduler = Scheduler::new("test");
        let ticks = Arc::new(AtomicUsize::new(0));

        scheduler.start(INTERVAL, counting_tick(&ticks));
        tokio::task::yield_now().await;
        advance_intervals(2).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        scheduler.stop();
        tokio::task::yield_now().await;
        advance_intervals(3).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_stopped_is_a_noop() {
        let scheduler = Scheduler::new("test");
        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tick_skips_overdue_ticks_never_overlaps() {
        let scheduler = Scheduler::new("test");
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::new(AtomicUsize::new(0));

        let in_flight_clone = Arc::clone(&in_flight);
        let max_clone = Arc::clone(&max_in_flight);
        let ticks_clone = Arc::clone(&ticks);
        scheduler.start(INTERVAL, move || {
            let in_flight = Arc::clone(&in_flight_clone);
            let max = Arc::clone(&max_clone);
            let ticks = Arc::clone(&ticks_clone);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(now, Ordering::SeqCst);
                // Tick body outlasts the interval.
                tokio::time::sleep(INTERVAL * 3).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::task::yield_now().await;

        advance_intervals(12).await;

        // Fetch phases never ran concurrently.
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        // Overdue ticks were skipped, not queued: with a 3-interval
        // tick body, at most one tick completes per 4 intervals.
        let completed = ticks.load(Ordering::SeqCst);
        assert!(
            (2..=4).contains(&completed),
            "expected ~3 completed ticks, observed {}",
            completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_in_flight_tick_settle() {
        let scheduler = Scheduler::new("test");
        let completed = Arc::new(AtomicUsize::new(0));

        let completed_clone = Arc::clone(&completed);
        scheduler.start(INTERVAL, move || {
            let completed = Arc::clone(&completed_clone);
            async move {
                tokio::time::sleep(INTERVAL * 2).await;
                completed.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::task::yield_now().await;

        // Enter the first tick, then stop mid-tick.
        advance_intervals(1).await;
        scheduler.stop();

        advance_intervals(4).await;

        // The in-flight tick settled; nothing fired afterwards.
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }
}
