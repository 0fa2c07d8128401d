//! Core types for the DeFi Dashboard feed
//!
//! This crate defines the shared data structures used across the
//! dashboard backend: merged market snapshots, simulated instrument
//! prices, the data source abstraction, and the feed-wide error type.

pub mod error;
pub mod instrument;
pub mod snapshot;
pub mod source;

pub use error::{FeedError, FeedResult};
pub use instrument::{InstrumentKind, InstrumentPrice, PriceMap};
pub use snapshot::{FieldValue, Snapshot};
pub use source::DataSource;
