//! Stochastic price simulator
//!
//! Manufactures a basket of correlated synthetic prices on a fixed
//! cadence for instruments without a live feed. One anchor instrument
//! drives a multiplicative random walk; correlated instruments follow
//! the anchor's move scaled by a fresh per-tick correlation plus an
//! independent component; pegged instruments are reset near their peg
//! every tick so drift stays permanently bounded.
//!
//! Distribution uses the same subscribe/broadcast contract as the
//! snapshot aggregator and runs on its own scheduler, independent of
//! the aggregator's cadence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use dashboard_core::{InstrumentKind, InstrumentPrice, PriceMap};

use crate::hub::{FeedHub, Subscription};
use crate::scheduler::Scheduler;

/// One instrument in the simulated basket
#[derive(Debug, Clone)]
pub struct InstrumentSpec {
    /// Instrument symbol (e.g. "ETH")
    pub symbol: String,
    /// Fixed classification
    pub kind: InstrumentKind,
    /// Starting price; for pegged instruments this is the peg value
    pub initial_price: f64,
}

impl InstrumentSpec {
    pub fn anchor(symbol: &str, initial_price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: InstrumentKind::Anchor,
            initial_price,
        }
    }

    pub fn correlated(symbol: &str, initial_price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: InstrumentKind::Correlated,
            initial_price,
        }
    }

    pub fn pegged(symbol: &str, peg: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: InstrumentKind::Pegged,
            initial_price: peg,
        }
    }
}

/// Configuration for the PriceSimulator
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// How often to advance the walk
    pub interval: Duration,
    /// Whether the simulator should run at all
    pub enabled: bool,
    /// Per-tick volatility of the anchor walk (e.g. 0.02 = 2%)
    pub volatility: f64,
    /// Per-tick drift of the anchor walk (e.g. 0.001 = 0.1%)
    pub trend: f64,
    /// The simulated basket
    pub instruments: Vec<InstrumentSpec>,
}

impl SimulatorConfig {
    /// Default basket of dashboard tokens: ETH anchors the walk,
    /// the majors follow it, stablecoins hold their peg.
    pub fn default_basket() -> Vec<InstrumentSpec> {
        vec![
            InstrumentSpec::anchor("ETH", 1750.0),
            InstrumentSpec::correlated("WBTC", 28_000.0),
            InstrumentSpec::correlated("MATIC", 0.85),
            InstrumentSpec::correlated("ARB", 1.20),
            InstrumentSpec::correlated("UNI", 6.50),
            InstrumentSpec::pegged("USDC", 1.0),
            InstrumentSpec::pegged("DAI", 1.0),
        ]
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            enabled: true,
            volatility: 0.02,
            trend: 0.001,
            instruments: Self::default_basket(),
        }
    }
}

/// Generates and distributes the simulated price basket
pub struct PriceSimulator {
    config: SimulatorConfig,
    hub: FeedHub<PriceMap>,
    scheduler: Scheduler,
    rng: Mutex<StdRng>,
}

impl PriceSimulator {
    /// Create a simulator with an entropy-seeded RNG
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a simulator with an explicit RNG (deterministic tests)
    pub fn with_rng(config: SimulatorConfig, rng: StdRng) -> Self {
        info!(
            "Initializing PriceSimulator with {} instruments, interval {:?}",
            config.instruments.len(),
            config.interval
        );

        let initial = Self::initial_prices(&config);
        Self {
            config,
            hub: FeedHub::new("prices", initial),
            scheduler: Scheduler::new("simulator"),
            rng: Mutex::new(rng),
        }
    }

    fn initial_prices(config: &SimulatorConfig) -> PriceMap {
        let mut map = PriceMap::empty();
        for spec in &config.instruments {
            map.prices.insert(
                spec.symbol.clone(),
                InstrumentPrice {
                    price: spec.initial_price,
                    kind: spec.kind,
                },
            );
        }
        map
    }

    /// Start scheduled simulation ticks
    ///
    /// Same idempotency rules as the aggregator: a second `start`
    /// replaces the timer, and a disabled simulator never starts.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            info!("[Simulator] disabled by configuration; not starting");
            return;
        }

        let simulator = Arc::clone(self);
        self.scheduler.start(self.config.interval, move || {
            let simulator = Arc::clone(&simulator);
            async move {
                simulator.run_tick();
            }
        });
    }

    /// Stop scheduled simulation. A tick in progress completes and
    /// its basket is still delivered.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Whether the simulation loop is active
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Advance the walk one step and broadcast the updated basket
    ///
    /// Normally driven by the scheduler. The whole update is
    /// synchronous: no suspension between drawing the walk and
    /// publishing the map.
    pub fn run_tick(&self) {
        let volatility = self.config.volatility;
        let mut map = self.hub.current();

        {
            let mut rng = self.rng.lock();

            // One shared walk delta per tick drives the whole basket.
            let delta = rng.random_range(-0.5..0.5) * volatility + self.config.trend;

            for spec in &self.config.instruments {
                let entry = map
                    .prices
                    .entry(spec.symbol.clone())
                    .or_insert(InstrumentPrice {
                        price: spec.initial_price,
                        kind: spec.kind,
                    });

                entry.price = match spec.kind {
                    InstrumentKind::Anchor => anchor_step(entry.price, delta),
                    InstrumentKind::Correlated => {
                        let correlation = rng.random_range(0.3..=1.0);
                        let independent = rng.random_range(-0.5..0.5) * volatility * 0.5;
                        correlated_step(entry.price, delta, correlation, independent)
                    }
                    InstrumentKind::Pegged => {
                        let jitter = rng.random_range(-0.001..0.001);
                        pegged_step(spec.initial_price, jitter)
                    }
                };
            }
        }

        map.updated_at = Utc::now();
        debug!(
            "[Simulator] tick complete: {} instruments updated",
            map.prices.len()
        );
        self.hub.publish(map);
    }

    /// Register a price consumer; the current basket is replayed
    /// immediately and synchronously.
    pub fn subscribe(
        &self,
        callback: impl FnMut(&PriceMap) + Send + 'static,
    ) -> Subscription<PriceMap> {
        self.hub.subscribe(callback)
    }

    /// Latest simulated basket (initial prices before the first tick)
    pub fn current_prices(&self) -> PriceMap {
        self.hub.current()
    }

    /// Number of registered price subscribers
    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

impl std::fmt::Debug for PriceSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceSimulator")
            .field("config", &self.config)
            .finish()
    }
}

/// Multiplicative anchor update: the price can shrink but never cross
/// zero.
fn anchor_step(price: f64, delta: f64) -> f64 {
    price * (1.0 + delta)
}

/// Correlated update: the anchor's delta scaled by the per-tick
/// correlation, plus an independent component.
fn correlated_step(price: f64, anchor_delta: f64, correlation: f64, independent: f64) -> f64 {
    price * (1.0 + anchor_delta * correlation + independent)
}

/// Pegged update: reset near the peg instead of compounding, so drift
/// never accumulates.
fn pegged_step(peg: f64, jitter: f64) -> f64 {
    peg + jitter * peg
}
