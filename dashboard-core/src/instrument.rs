//! Simulated instrument definitions
//!
//! The price simulator manufactures a basket of correlated synthetic
//! prices. Each instrument carries a fixed classification describing
//! how its price evolves per tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How an instrument's simulated price evolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    /// Primary random-walk driver the rest of the basket follows
    Anchor,
    /// Follows the anchor's move scaled by a per-tick correlation,
    /// plus an independent component
    Correlated,
    /// Reset near a fixed target each tick instead of compounding
    Pegged,
}

impl InstrumentKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            InstrumentKind::Anchor => "Anchor",
            InstrumentKind::Correlated => "Correlated",
            InstrumentKind::Pegged => "Pegged",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Current simulated price for a single instrument
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstrumentPrice {
    /// Current price, always strictly positive
    pub price: f64,

    /// Fixed classification of the instrument
    pub kind: InstrumentKind,
}

/// Full basket of simulated prices produced by one simulator tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceMap {
    /// Instrument symbol to current price
    pub prices: HashMap<String, InstrumentPrice>,

    /// When this basket was generated
    pub updated_at: DateTime<Utc>,
}

impl PriceMap {
    /// Empty basket stamped with the current time
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Look up an instrument's current price
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).map(|p| p.price)
    }
}

impl Default for PriceMap {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display() {
        assert_eq!(InstrumentKind::Anchor.to_string(), "Anchor");
        assert_eq!(InstrumentKind::Pegged.to_string(), "Pegged");
    }

    #[test]
    fn price_lookup() {
        let mut map = PriceMap::empty();
        map.prices.insert(
            "ETH".to_string(),
            InstrumentPrice {
                price: 1750.0,
                kind: InstrumentKind::Anchor,
            },
        );

        assert_eq!(map.price("ETH"), Some(1750.0));
        assert_eq!(map.price("WBTC"), None);
    }
}
