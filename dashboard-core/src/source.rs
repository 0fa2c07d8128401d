//! Data source abstraction
//!
//! A [`DataSource`] is one independently callable fetch operation
//! feeding a single snapshot field. Sources are expected to resolve or
//! fail within a bounded timeout and to be side-effect-free beyond
//! returning data; the aggregator treats every failure as non-fatal.

use crate::error::FeedResult;
use async_trait::async_trait;

/// One independently pollable source of dashboard data
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Name of the snapshot field this source feeds
    fn name(&self) -> &str;

    /// Fetch the current value once. Failure of one source must never
    /// prevent the others from being invoked or settling.
    async fn fetch(&self) -> FeedResult<serde_json::Value>;
}
