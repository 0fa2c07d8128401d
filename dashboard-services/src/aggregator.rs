//! Snapshot aggregator
//!
//! Polls a fixed set of independent data sources on a schedule, merges
//! the results into a single [`Snapshot`] with stale-value fallback,
//! and broadcasts each merged snapshot to registered subscribers. No
//! source failure is fatal: a failed fetch keeps the field's previous
//! value and only the snapshot timestamp advances.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use dashboard_core::{DataSource, FieldValue, Snapshot};

use crate::hub::{FeedHub, Subscription};
use crate::scheduler::Scheduler;

/// Configuration for the SnapshotAggregator
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    /// How often to poll all sources
    pub interval: Duration,
    /// Whether the aggregator should poll at all
    pub enabled: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            enabled: true,
        }
    }
}

/// Polls all data sources and distributes merged snapshots
pub struct SnapshotAggregator {
    config: AggregatorConfig,
    sources: Vec<Arc<dyn DataSource>>,
    hub: FeedHub<Snapshot>,
    scheduler: Scheduler,
}

impl SnapshotAggregator {
    /// Create a new aggregator over a fixed set of sources
    pub fn new(config: AggregatorConfig, sources: Vec<Arc<dyn DataSource>>) -> Self {
        info!(
            "Initializing SnapshotAggregator with {} sources, interval {:?}",
            sources.len(),
            config.interval
        );
        Self {
            config,
            sources,
            hub: FeedHub::new("snapshots", Snapshot::empty()),
            scheduler: Scheduler::new("aggregator"),
        }
    }

    /// Start scheduled polling
    ///
    /// Idempotent: calling `start` while running replaces the timer
    /// without doubling the tick rate. Does nothing when disabled by
    /// configuration.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            info!("[Aggregator] disabled by configuration; not starting");
            return;
        }

        let aggregator = Arc::clone(self);
        self.scheduler.start(self.config.interval, move || {
            let aggregator = Arc::clone(&aggregator);
            async move {
                aggregator.run_tick().await;
            }
        });
    }

    /// Stop scheduled polling. A tick already in flight settles and
    /// its snapshot is still delivered.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Whether the polling loop is active
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Execute one fetch-and-merge cycle
    ///
    /// Normally driven by the scheduler. All sources are fetched as
    /// one concurrent batch and the snapshot is published only after
    /// every fetch has settled.
    pub async fn run_tick(&self) {
        let fetches = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            async move {
                let name = source.name().to_string();
                let result = source.fetch().await;
                (name, result)
            }
        });

        let settled = join_all(fetches).await;

        let now = Utc::now();
        let mut snapshot = self.hub.current();
        let total = settled.len();
        let mut ok = 0;

        for (field, result) in settled {
            match result {
                Ok(value) => {
                    ok += 1;
                    snapshot.fields.insert(
                        field,
                        FieldValue {
                            value,
                            fetched_at: now,
                        },
                    );
                }
                Err(e) => {
                    // Keep the previous value for this field, if any.
                    warn!("[Aggregator] fetch failed for {}: {}", field, e);
                }
            }
        }

        snapshot.updated_at = now;
        snapshot.sources_ok = ok;
        snapshot.sources_total = total;

        debug!(
            "[Aggregator] tick complete: {}/{} sources succeeded, {} fields tracked",
            ok,
            total,
            snapshot.fields.len()
        );

        self.hub.publish(snapshot);
    }

    /// Register a snapshot consumer; the current snapshot is replayed
    /// immediately and synchronously.
    pub fn subscribe(
        &self,
        callback: impl FnMut(&Snapshot) + Send + 'static,
    ) -> Subscription<Snapshot> {
        self.hub.subscribe(callback)
    }

    /// Latest merged snapshot (empty before the first tick)
    pub fn current_snapshot(&self) -> Snapshot {
        self.hub.current()
    }

    /// Number of registered snapshot subscribers
    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

impl std::fmt::Debug for SnapshotAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotAggregator")
            .field("config", &self.config)
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashboard_core::{FeedError, FeedResult};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Source returning a scripted sequence of values, failing when
    /// told to.
    struct ScriptedSource {
        name: String,
        value: Mutex<serde_json::Value>,
        failing: AtomicBool,
    }

    impl ScriptedSource {
        fn new(name: &str, value: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                value: Mutex::new(value),
                failing: AtomicBool::new(false),
            })
        }

        fn set_value(&self, value: serde_json::Value) {
            *self.value.lock() = value;
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self) -> FeedResult<serde_json::Value> {
            if self.failing.load(Ordering::SeqCst) {
                Err(FeedError::fetch(&self.name, "scripted failure"))
            } else {
                Ok(self.value.lock().clone())
            }
        }
    }

    fn aggregator_over(sources: Vec<Arc<dyn DataSource>>) -> Arc<SnapshotAggregator> {
        Arc::new(SnapshotAggregator::new(AggregatorConfig::default(), sources))
    }

    #[tokio::test]
    async fn merges_all_sources_into_snapshot() {
        let a = ScriptedSource::new("eth_price", json!(1750.0));
        let b = ScriptedSource::new("gas_price", json!(20.0));
        let aggregator = aggregator_over(vec![a as Arc<dyn DataSource>, b as Arc<dyn DataSource>]);

        aggregator.run_tick().await;

        let snapshot = aggregator.current_snapshot();
        assert_eq!(snapshot.get("eth_price"), Some(&json!(1750.0)));
        assert_eq!(snapshot.get("gas_price"), Some(&json!(20.0)));
        assert_eq!(snapshot.success_ratio(), Some(1.0));
    }

    #[tokio::test]
    async fn partial_failure_retains_previous_value() {
        let a = ScriptedSource::new("a", json!(1));
        let b = ScriptedSource::new("b", json!(10));
        let c = ScriptedSource::new("c", json!(100));
        let aggregator = aggregator_over(vec![
            a.clone() as Arc<dyn DataSource>,
            b.clone() as Arc<dyn DataSource>,
            c.clone() as Arc<dyn DataSource>,
        ]);

        // Tick 1: all succeed.
        aggregator.run_tick().await;

        // Tick 2: b fails, a and c advance.
        a.set_value(json!(2));
        b.set_failing(true);
        b.set_value(json!(20));
        c.set_value(json!(200));
        aggregator.run_tick().await;

        let snapshot = aggregator.current_snapshot();
        assert_eq!(snapshot.get("a"), Some(&json!(2)));
        assert_eq!(snapshot.get("b"), Some(&json!(10)), "stale value retained");
        assert_eq!(snapshot.get("c"), Some(&json!(200)));
        assert_eq!(snapshot.sources_ok, 2);
        assert_eq!(snapshot.sources_total, 3);
    }

    #[tokio::test]
    async fn updated_at_advances_even_when_every_source_fails() {
        let a = ScriptedSource::new("a", json!(1));
        let aggregator = aggregator_over(vec![a.clone() as Arc<dyn DataSource>]);

        aggregator.run_tick().await;
        let first = aggregator.current_snapshot();

        a.set_failing(true);
        tokio::time::sleep(Duration::from_millis(5)).await;
        aggregator.run_tick().await;
        let second = aggregator.current_snapshot();

        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.get("a"), Some(&json!(1)));
        assert_eq!(second.success_ratio(), Some(0.0));
    }

    #[tokio::test]
    async fn updated_at_is_non_decreasing_across_mixed_ticks() {
        let a = ScriptedSource::new("a", json!(1));
        let aggregator = aggregator_over(vec![a.clone() as Arc<dyn DataSource>]);

        let mut last = aggregator.current_snapshot().updated_at;
        for i in 0..6 {
            a.set_failing(i % 2 == 0);
            aggregator.run_tick().await;
            let stamped = aggregator.current_snapshot().updated_at;
            assert!(stamped >= last);
            last = stamped;
        }
    }

    #[tokio::test]
    async fn subscribe_before_start_replays_empty_snapshot() {
        let aggregator =
            aggregator_over(vec![ScriptedSource::new("a", json!(1)) as Arc<dyn DataSource>]);

        let seen: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _sub = aggregator.subscribe(move |s: &Snapshot| seen_clone.lock().push(s.clone()));

        let replayed = seen.lock();
        assert_eq!(replayed.len(), 1, "initial state delivered synchronously");
        assert!(replayed[0].fields.is_empty());
        assert_eq!(replayed[0].success_ratio(), None);
    }

    #[tokio::test]
    async fn broadcast_delivered_after_all_fetches_settle() {
        let a = ScriptedSource::new("a", json!(1));
        let b = ScriptedSource::new("b", json!(2));
        let aggregator = aggregator_over(vec![a as Arc<dyn DataSource>, b as Arc<dyn DataSource>]);

        let seen: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _sub = aggregator.subscribe(move |s: &Snapshot| seen_clone.lock().push(s.clone()));

        aggregator.run_tick().await;

        let broadcasts = seen.lock();
        // Initial replay plus exactly one complete snapshot; never a
        // partial mid-tick emission.
        assert_eq!(broadcasts.len(), 2);
        assert_eq!(broadcasts[1].fields.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_polling_respects_enabled_flag() {
        let config = AggregatorConfig {
            interval: Duration::from_secs(1),
            enabled: false,
        };
        let aggregator = Arc::new(SnapshotAggregator::new(
            config,
            vec![ScriptedSource::new("a", json!(1)) as Arc<dyn DataSource>],
        ));

        aggregator.start();
        assert!(!aggregator.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_polling_ticks_on_interval() {
        let a = ScriptedSource::new("a", json!(1));
        let config = AggregatorConfig {
            interval: Duration::from_secs(1),
            enabled: true,
        };
        let aggregator = Arc::new(SnapshotAggregator::new(config, vec![a as Arc<dyn DataSource>]));

        aggregator.start();
        tokio::task::yield_now().await;

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }

        let snapshot = aggregator.current_snapshot();
        assert!(snapshot.has_field("a"));

        aggregator.stop();
        assert!(!aggregator.is_running());
    }
}
