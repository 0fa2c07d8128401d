//! DeFi data source adapters for the DeFi Dashboard
//!
//! This crate provides the concrete [`DataSource`] implementations the
//! aggregator polls: chain state via JSON-RPC (gas price, block
//! height) and market/protocol data via REST (spot price, protocol
//! stats).
//!
//! [`DataSource`]: dashboard_core::DataSource

pub mod client;
pub mod sources;
pub mod types;

pub use client::{DefiClient, DefiClientConfig};
pub use sources::{BlockHeightSource, GasPriceSource, ProtocolStatsSource, SpotPriceSource};
pub use types::{ChainStatus, GasInfo, ProtocolStats};
