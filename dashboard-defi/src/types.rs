//! Response payloads produced by the DeFi adapters

use serde::{Deserialize, Serialize};

/// Default public Ethereum JSON-RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://eth.llamarpc.com";

/// Default base URL for the spot price REST API
pub const DEFAULT_PRICE_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Default base URL for the protocol stats REST API
pub const DEFAULT_STATS_API_BASE: &str = "http://127.0.0.1:3000/api/v1/defi";

/// Current gas price information, in gwei
///
/// Fast and slow tiers are derived from the network price at 120% and
/// 80% respectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasInfo {
    pub gas_price_gwei: f64,
    pub fast_gas_price_gwei: f64,
    pub slow_gas_price_gwei: f64,
}

impl GasInfo {
    /// Derive the full tier set from the current network gas price
    pub fn from_network_gwei(gas_price_gwei: f64) -> Self {
        Self {
            gas_price_gwei,
            fast_gas_price_gwei: gas_price_gwei * 1.2,
            slow_gas_price_gwei: gas_price_gwei * 0.8,
        }
    }
}

/// Basic chain liveness data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStatus {
    pub chain_id: u64,
    pub block_height: u64,
}

/// Lending protocol statistics as served by the stats backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolStats {
    pub name: String,
    pub tvl_usd: f64,
    pub total_borrowed_usd: f64,
    pub total_supplied_usd: f64,
    pub utilization_rate: f64,
    pub average_supply_apy: f64,
    pub average_borrow_apy: f64,
}
