//! HTTP client for DeFi data endpoints
//!
//! Wraps a single `reqwest::Client` with a bounded timeout and exposes
//! the typed fetch operations the source adapters are built from:
//! JSON-RPC reads against an Ethereum node and REST reads against the
//! price and protocol stats APIs.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use dashboard_core::{FeedError, FeedResult};

use crate::types::{
    GasInfo, ProtocolStats, DEFAULT_PRICE_API_BASE, DEFAULT_RPC_URL, DEFAULT_STATS_API_BASE,
};

/// Request timeout applied to every fetch
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the DefiClient
#[derive(Debug, Clone)]
pub struct DefiClientConfig {
    /// Ethereum JSON-RPC endpoint
    pub rpc_url: String,
    /// Base URL of the spot price API
    pub price_api_base: String,
    /// Base URL of the protocol stats API
    pub stats_api_base: String,
}

impl Default for DefiClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            price_api_base: DEFAULT_PRICE_API_BASE.to_string(),
            stats_api_base: DEFAULT_STATS_API_BASE.to_string(),
        }
    }
}

/// Shared HTTP client for all DeFi source adapters
#[derive(Debug, Clone)]
pub struct DefiClient {
    http: Client,
    config: DefiClientConfig,
}

impl DefiClient {
    pub fn new(config: DefiClientConfig) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    /// Issue a parameterless JSON-RPC call and return the hex-encoded
    /// result field
    async fn rpc_call(&self, method: &str) -> FeedResult<String> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": [],
            "id": 1,
        });

        debug!("JSON-RPC call {} -> {}", method, self.config.rpc_url);

        let response: Value = self
            .http
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| FeedError::network(format!("{}: {}", method, e)))?
            .json()
            .await
            .map_err(|e| FeedError::parse(format!("{}: {}", method, e)))?;

        if let Some(error) = response.get("error") {
            return Err(FeedError::network(format!("{}: {}", method, error)));
        }

        response
            .get("result")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FeedError::parse(format!("{}: missing result field", method)))
    }

    /// Current network gas price with derived fast/slow tiers
    pub async fn gas_price(&self) -> FeedResult<GasInfo> {
        let hex = self.rpc_call("eth_gasPrice").await?;
        let wei = parse_hex_quantity(&hex)?;
        Ok(GasInfo::from_network_gwei(wei as f64 / 1e9))
    }

    /// Current chain head block number
    pub async fn block_height(&self) -> FeedResult<u64> {
        let hex = self.rpc_call("eth_blockNumber").await?;
        let height = parse_hex_quantity(&hex)?;
        Ok(height as u64)
    }

    /// USD spot price for a coin id (e.g. "ethereum")
    pub async fn spot_price_usd(&self, coin_id: &str) -> FeedResult<f64> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.config.price_api_base, coin_id
        );

        let response: Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::network(format!("spot price {}: {}", coin_id, e)))?
            .json()
            .await
            .map_err(|e| FeedError::parse(format!("spot price {}: {}", coin_id, e)))?;

        response
            .get(coin_id)
            .and_then(|coin| coin.get("usd"))
            .and_then(Value::as_f64)
            .ok_or_else(|| FeedError::parse(format!("spot price {}: missing usd field", coin_id)))
    }

    /// Statistics for one lending protocol
    pub async fn protocol_stats(&self, protocol: &str) -> FeedResult<ProtocolStats> {
        let url = format!("{}/protocols/{}/stats", self.config.stats_api_base, protocol);

        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::network(format!("protocol stats {}: {}", protocol, e)))?
            .json()
            .await
            .map_err(|e| FeedError::parse(format!("protocol stats {}: {}", protocol, e)))
    }
}

/// Parse a 0x-prefixed JSON-RPC quantity
fn parse_hex_quantity(hex: &str) -> FeedResult<u128> {
    let digits = hex.trim_start_matches("0x");
    u128::from_str_radix(digits, 16)
        .map_err(|e| FeedError::parse(format!("invalid hex quantity {:?}: {}", hex, e)))
}
