//! Merged market data snapshots
//!
//! A [`Snapshot`] is the aggregator's unified view of every tracked
//! field after a poll cycle. A field appears in the map once its source
//! has succeeded at least once and is never removed afterwards; a
//! failed fetch leaves the previous value in place (stale-value
//! retention).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The last successfully fetched value for a single field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValue {
    /// Source payload, kept as JSON so heterogeneous sources compose
    pub value: serde_json::Value,

    /// When this particular value was fetched (may lag the snapshot's
    /// `updated_at` when the source has been failing)
    pub fetched_at: DateTime<Utc>,
}

/// Merged, timestamped view of all tracked fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Field name to last-known value. Absence means the field has
    /// never been fetched successfully.
    pub fields: HashMap<String, FieldValue>,

    /// When the snapshot was last stamped. Advances on every tick,
    /// even a fully failed one, to signal "attempted, but stale".
    pub updated_at: DateTime<Utc>,

    /// Sources that succeeded on the most recent tick
    pub sources_ok: usize,

    /// Sources attempted on the most recent tick
    pub sources_total: usize,
}

impl Snapshot {
    /// Empty snapshot stamped with the current time
    pub fn empty() -> Self {
        Self {
            fields: HashMap::new(),
            updated_at: Utc::now(),
            sources_ok: 0,
            sources_total: 0,
        }
    }

    /// Look up a field's current value
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field).map(|f| &f.value)
    }

    /// Whether a field has ever been fetched successfully
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Fraction of sources that succeeded on the most recent tick,
    /// or `None` before the first tick
    pub fn success_ratio(&self) -> Option<f64> {
        if self.sources_total == 0 {
            None
        } else {
            Some(self.sources_ok as f64 / self.sources_total as f64)
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
