//! The fetch → align → summarize pipeline behind the presentation boundary.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::align::{self, AlignedMatrix};
use crate::core::cache::RefreshCache;
use crate::core::config::AppConfig;
use crate::core::period::Period;
use crate::core::provider::{HistoryProvider, ProviderError};
use crate::core::summary::{self, CategorySummary};

/// Owns the configured universe, the provider, and the period cache.
///
/// `summarize` is the synchronous-feeling entry point presentation layers
/// call per request; everything upstream of it is memoized per period for
/// the configured TTL.
pub struct Dashboard {
    config: AppConfig,
    provider: Arc<dyn HistoryProvider>,
    cache: RefreshCache,
    symbols: Vec<String>,
}

impl Dashboard {
    pub fn new(config: AppConfig, provider: Arc<dyn HistoryProvider>) -> Self {
        let cache = RefreshCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.capacity,
        );
        let symbols = config.symbols();
        Self {
            config,
            provider,
            cache,
            symbols,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    async fn aligned(&self, period: Period) -> Result<Arc<AlignedMatrix>, ProviderError> {
        let provider = Arc::clone(&self.provider);
        let symbols = &self.symbols;
        self.cache
            .get_or_build(period, || async move {
                debug!(%period, instruments = symbols.len(), "Rebuilding aligned matrix");
                let series = provider.fetch_history(symbols, period).await?;
                Ok(align::align(&series))
            })
            .await
    }

    /// Builds every category's summary for `period`.
    ///
    /// Only total provider unreachability is an error; instruments or whole
    /// categories without data are simply absent from the result.
    pub async fn summarize(
        &self,
        period: Period,
    ) -> Result<Vec<CategorySummary>, ProviderError> {
        let matrix = self.aligned(period).await?;

        // The average daily return always looks at one month of history,
        // independent of the selected display period.
        let daily = if period == Period::OneMonth {
            Arc::clone(&matrix)
        } else {
            match self.aligned(Period::OneMonth).await {
                Ok(matrix) => matrix,
                Err(error) => {
                    warn!(%error, "Daily-return fetch failed; omitting the statistic");
                    Arc::new(AlignedMatrix::empty())
                }
            }
        };

        Ok(summary::summarize_categories(
            &self.config.categories,
            &matrix,
            &daily,
        ))
    }

    /// The nested `category -> symbol -> date -> value` projection of the
    /// normalized matrices, for JSON serialization.
    pub async fn flat_view(
        &self,
        period: Period,
    ) -> Result<BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>, ProviderError> {
        let summaries = self.summarize(period).await?;
        Ok(summary::flat_view(&summaries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::CloseSeries;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        series: HashMap<String, CloseSeries>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(series: HashMap<String, CloseSeries>) -> Self {
            Self {
                series,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HistoryProvider for ScriptedProvider {
        async fn fetch_history(
            &self,
            symbols: &[String],
            _period: Period,
        ) -> Result<HashMap<String, CloseSeries>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .series
                .iter()
                .filter(|(symbol, _)| symbols.contains(symbol))
                .map(|(symbol, series)| (symbol.clone(), series.clone()))
                .collect())
        }
    }

    struct DownProvider;

    #[async_trait]
    impl HistoryProvider for DownProvider {
        async fn fetch_history(
            &self,
            _symbols: &[String],
            _period: Period,
        ) -> Result<HashMap<String, CloseSeries>, ProviderError> {
            Err(ProviderError::Unavailable("connection refused".to_string()))
        }
    }

    fn date(d: u32) -> NaiveDate {
        // 2024-01-01 is a Monday.
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn config(yaml: &str) -> AppConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn two_instrument_config() -> AppConfig {
        config(
            r#"
categories:
  - name: "X"
    instruments:
      - symbol: "A"
        name: "Alpha Index"
      - symbol: "B"
        name: "Beta Index"
"#,
        )
    }

    fn rising_series() -> CloseSeries {
        CloseSeries::from_rows(
            [100.0, 102.5, 105.0, 107.5, 110.0]
                .iter()
                .enumerate()
                .map(|(i, price)| (date(i as u32 + 1), Some(*price))),
        )
    }

    #[tokio::test]
    async fn test_summarize_drops_no_data_instrument_and_keeps_the_rest() {
        let mut series = HashMap::new();
        series.insert("A".to_string(), rising_series());
        // B never appears in the provider response.
        let provider = Arc::new(ScriptedProvider::new(series));
        let dashboard = Dashboard::new(two_instrument_config(), provider);

        let summaries = dashboard.summarize(Period::FiveDays).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "X");
        assert_eq!(summaries[0].rows.len(), 1);

        let row = &summaries[0].rows[0];
        assert_eq!(row.symbol, "A");
        assert_eq!(row.name, "Alpha Index");
        assert_eq!(row.last_price, 110.0);
        assert_eq!(row.change_pct, Some(10.0));
        assert!((row.normalized.first().unwrap().1 - 100.0).abs() < 1e-9);
        assert!((row.normalized.last().unwrap().1 - 110.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_summarize_with_no_data_at_all_yields_no_categories() {
        let provider = Arc::new(ScriptedProvider::new(HashMap::new()));
        let dashboard = Dashboard::new(two_instrument_config(), provider);

        let summaries = dashboard.summarize(Period::OneMonth).await.unwrap();
        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn test_provider_unavailability_propagates() {
        let dashboard = Dashboard::new(two_instrument_config(), Arc::new(DownProvider));

        let result = dashboard.summarize(Period::OneMonth).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_repeat_summarize_within_ttl_reuses_fetches() {
        let mut series = HashMap::new();
        series.insert("A".to_string(), rising_series());
        let provider = Arc::new(ScriptedProvider::new(series));
        let dashboard = Dashboard::new(
            two_instrument_config(),
            Arc::clone(&provider) as Arc<dyn HistoryProvider>,
        );

        // One fetch for the display period, one for the daily-return month.
        dashboard.summarize(Period::FiveDays).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        dashboard.summarize(Period::FiveDays).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        // The one-month matrix is already cached for the next period too.
        dashboard.summarize(Period::OneMonth).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_flat_view_projection() {
        let mut series = HashMap::new();
        series.insert("A".to_string(), rising_series());
        let provider = Arc::new(ScriptedProvider::new(series));
        let dashboard = Dashboard::new(two_instrument_config(), provider);

        let flat = dashboard.flat_view(Period::FiveDays).await.unwrap();
        let instrument = &flat["X"]["A"];
        assert_eq!(instrument.len(), 5);
        assert_eq!(instrument["2024-01-01"], 100.0);
        assert_eq!(instrument["2024-01-05"], 110.0);
    }
}
