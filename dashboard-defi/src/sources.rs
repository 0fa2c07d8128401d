//! DataSource adapters over the DefiClient
//!
//! Each adapter feeds exactly one snapshot field and is independently
//! pollable; the aggregator fans them out as one concurrent batch.

use async_trait::async_trait;
use serde_json::json;

use dashboard_core::{DataSource, FeedError, FeedResult};

use crate::client::DefiClient;

/// USD spot price for one coin (field e.g. "eth_price")
pub struct SpotPriceSource {
    client: DefiClient,
    coin_id: String,
    field: String,
}

impl SpotPriceSource {
    pub fn new(client: DefiClient, coin_id: &str, field: &str) -> Self {
        Self {
            client,
            coin_id: coin_id.to_string(),
            field: field.to_string(),
        }
    }
}

#[async_trait]
impl DataSource for SpotPriceSource {
    fn name(&self) -> &str {
        &self.field
    }

    async fn fetch(&self) -> FeedResult<serde_json::Value> {
        let price = self.client.spot_price_usd(&self.coin_id).await?;
        Ok(json!(price))
    }
}

/// Network gas price with fast/slow tiers (field "gas")
pub struct GasPriceSource {
    client: DefiClient,
}

impl GasPriceSource {
    pub fn new(client: DefiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for GasPriceSource {
    fn name(&self) -> &str {
        "gas"
    }

    async fn fetch(&self) -> FeedResult<serde_json::Value> {
        let gas = self.client.gas_price().await?;
        serde_json::to_value(gas).map_err(|e| FeedError::parse(e.to_string()))
    }
}

/// Chain head block number (field "block_height")
pub struct BlockHeightSource {
    client: DefiClient,
}

impl BlockHeightSource {
    pub fn new(client: DefiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for BlockHeightSource {
    fn name(&self) -> &str {
        "block_height"
    }

    async fn fetch(&self) -> FeedResult<serde_json::Value> {
        let height = self.client.block_height().await?;
        Ok(json!(height))
    }
}

/// Lending protocol statistics (field e.g. "aave_stats")
pub struct ProtocolStatsSource {
    client: DefiClient,
    protocol: String,
    field: String,
}

impl ProtocolStatsSource {
    pub fn new(client: DefiClient, protocol: &str) -> Self {
        Self {
            client,
            protocol: protocol.to_string(),
            field: format!("{}_stats", protocol),
        }
    }
}

#[async_trait]
impl DataSource for ProtocolStatsSource {
    fn name(&self) -> &str {
        &self.field
    }

    async fn fetch(&self) -> FeedResult<serde_json::Value> {
        let stats = self.client.protocol_stats(&self.protocol).await?;
        serde_json::to_value(stats).map_err(|e| FeedError::parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DefiClientConfig;

    fn client() -> DefiClient {
        DefiClient::new(DefiClientConfig::default())
    }

    #[test]
    fn sources_feed_distinct_fields() {
        let spot = SpotPriceSource::new(client(), "ethereum", "eth_price");
        let gas = GasPriceSource::new(client());
        let blocks = BlockHeightSource::new(client());
        let aave = ProtocolStatsSource::new(client(), "aave");

        let names = [spot.name(), gas.name(), blocks.name(), aave.name()];
        assert_eq!(names, ["eth_price", "gas", "block_height", "aave_stats"]);
    }
}
