//! Real-time data distribution services for the DeFi Dashboard
//!
//! This crate provides the polling and fan-out layer of the dashboard
//! backend: a replaceable interval scheduler, a snapshot aggregator
//! that tolerates partial source failure, a subscriber hub that
//! broadcasts merged state to registered consumers, and a stochastic
//! price simulator for instruments without a live feed.

pub mod aggregator;
pub mod hub;
pub mod scheduler;
pub mod simulator;

pub use aggregator::{AggregatorConfig, SnapshotAggregator};
pub use hub::{FeedHub, Subscription};
pub use scheduler::Scheduler;
pub use simulator::{InstrumentSpec, PriceSimulator, SimulatorConfig};
