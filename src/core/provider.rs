//! Market-data provider abstraction.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::period::Period;
use crate::core::series::CloseSeries;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The upstream data source could not be reached at all. Instrument-level
    /// gaps are never reported here; they surface as absence from the result.
    #[error("market data provider unreachable: {0}")]
    Unavailable(String),
}

/// Fetches daily close history for a set of instruments over one period.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Returns one cleaned series per symbol that yielded data. Symbols with
    /// no usable rows are absent from the map; only total unreachability of
    /// the provider is an error.
    async fn fetch_history(
        &self,
        symbols: &[String],
        period: Period,
    ) -> Result<HashMap<String, CloseSeries>, ProviderError>;
}
