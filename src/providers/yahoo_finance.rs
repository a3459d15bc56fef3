use async_trait::async_trait;
use chrono::DateTime;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::config::YahooProviderConfig;
use crate::core::period::Period;
use crate::core::provider::{HistoryProvider, ProviderError};
use crate::core::series::CloseSeries;
use crate::providers::util::with_retry;

/// Close-price field candidates, consulted in priority order. A field whose
/// values are all null counts as absent.
const FIELD_CANDIDATES: &[RawField] = &[RawField::Close, RawField::AdjClose];

const SEND_RETRIES: usize = 1;
const RETRY_DELAY_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawField {
    Close,
    AdjClose,
}

/// One instrument's raw provider rows: a timestamp array plus one price
/// array per field the provider happened to include.
#[derive(Debug, Default)]
struct RawObservations {
    timestamps: Vec<i64>,
    close: Option<Vec<Option<f64>>>,
    adjclose: Option<Vec<Option<f64>>>,
}

impl RawObservations {
    fn field(&self, field: RawField) -> Option<&Vec<Option<f64>>> {
        match field {
            RawField::Close => self.close.as_ref(),
            RawField::AdjClose => self.adjclose.as_ref(),
        }
    }

    /// Resolves the field policy and drops rows without a usable price.
    /// `None` when no candidate field carries data.
    fn into_series(self) -> Option<CloseSeries> {
        let prices = FIELD_CANDIDATES
            .iter()
            .filter_map(|field| self.field(*field))
            .find(|values| values.iter().any(Option::is_some))?;

        let series = CloseSeries::from_rows(
            self.timestamps
                .iter()
                .zip(prices.iter())
                .filter_map(|(ts, price)| {
                    DateTime::from_timestamp(*ts, 0).map(|dt| (dt.date_naive(), *price))
                }),
        );

        if series.is_empty() { None } else { Some(series) }
    }
}

/// The two provider response shapes, resolved once at this boundary.
/// Downstream code only ever sees per-symbol [`CloseSeries`].
enum RawTable {
    Single(RawObservations),
    Multi(HashMap<String, RawObservations>),
}

impl RawTable {
    fn into_series_map(self, single_symbol: &str) -> HashMap<String, CloseSeries> {
        match self {
            RawTable::Single(observations) => observations
                .into_series()
                .map(|series| HashMap::from([(single_symbol.to_string(), series)]))
                .unwrap_or_default(),
            RawTable::Multi(by_symbol) => by_symbol
                .into_iter()
                .filter_map(|(symbol, observations)| {
                    observations.into_series().map(|series| (symbol, series))
                })
                .collect(),
        }
    }
}

// Chart endpoint: one instrument per request.

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Option<Vec<Quote>>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    adjclose: Option<Vec<Option<f64>>>,
}

impl From<ChartItem> for RawObservations {
    fn from(item: ChartItem) -> Self {
        let (close, adjclose) = match item.indicators {
            Some(indicators) => (
                indicators
                    .quote
                    .and_then(|mut quotes| quotes.drain(..).next())
                    .and_then(|quote| quote.close),
                indicators
                    .adjclose
                    .and_then(|mut adj| adj.drain(..).next())
                    .and_then(|adj| adj.adjclose),
            ),
            None => (None, None),
        };
        RawObservations {
            timestamps: item.timestamp.unwrap_or_default(),
            close,
            adjclose,
        }
    }
}

// Spark endpoint: the whole universe in one request. The provider has served
// two layouts for this payload over time; both are accepted.

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum SparkPayload {
    Enveloped { spark: SparkResult },
    Keyed(HashMap<String, SparkSeries>),
}

#[derive(Deserialize, Debug)]
struct SparkResult {
    result: Option<Vec<SparkEntry>>,
}

#[derive(Deserialize, Debug)]
struct SparkEntry {
    symbol: String,
    response: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct SparkSeries {
    timestamp: Option<Vec<i64>>,
    close: Option<Vec<Option<f64>>>,
}

impl From<SparkPayload> for RawTable {
    fn from(payload: SparkPayload) -> Self {
        match payload {
            SparkPayload::Enveloped { spark } => RawTable::Multi(
                spark
                    .result
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|entry| {
                        let item = entry.response?.into_iter().next()?;
                        Some((entry.symbol, RawObservations::from(item)))
                    })
                    .collect(),
            ),
            SparkPayload::Keyed(by_symbol) => RawTable::Multi(
                by_symbol
                    .into_iter()
                    .map(|(symbol, series)| {
                        (
                            symbol,
                            RawObservations {
                                timestamps: series.timestamp.unwrap_or_default(),
                                close: series.close,
                                adjclose: None,
                            },
                        )
                    })
                    .collect(),
            ),
        }
    }
}

enum FetchOutcome {
    Data(CloseSeries),
    NoData,
    Transport(String),
}

// YahooFinanceProvider implementation for HistoryProvider
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    batch_spark: bool,
}

impl YahooFinanceProvider {
    pub fn new(config: &YahooProviderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().user_agent("gmd/0.2").build()?;
        Ok(YahooFinanceProvider {
            base_url: config.base_url.clone(),
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            batch_spark: config.batch_spark,
        })
    }

    /// One chart request for one symbol. `Ok(None)` means the provider
    /// answered but had nothing usable; `Err` is a transport failure.
    async fn fetch_chart(
        &self,
        symbol: &str,
        range: &str,
    ) -> Result<Option<CloseSeries>, reqwest::Error> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range={}",
            self.base_url, symbol, range
        );
        debug!("Requesting price history from {}", url);

        let response = with_retry(|| self.client.get(&url).send(), SEND_RETRIES, RETRY_DELAY_MS)
            .await?;

        if !response.status().is_success() {
            debug!(symbol, status = %response.status(), "Provider error status; treating as no data");
            return Ok(None);
        }

        let data = match response.json::<ChartResponse>().await {
            Ok(data) => data,
            Err(error) => {
                warn!(symbol, %error, "Unparseable chart response; treating as no data");
                return Ok(None);
            }
        };

        let table = match data.chart.result.and_then(|items| items.into_iter().next()) {
            Some(item) => RawTable::Single(RawObservations::from(item)),
            None => return Ok(None),
        };

        Ok(table.into_series_map(symbol).remove(symbol))
    }

    /// One spark request for the whole symbol list. Any failure here is a
    /// failure of the batch, not of an individual instrument.
    async fn fetch_spark(
        &self,
        symbols: &[String],
        range: &str,
    ) -> Result<HashMap<String, CloseSeries>, ProviderError> {
        let url = format!(
            "{}/v8/finance/spark?symbols={}&interval=1d&range={}",
            self.base_url,
            symbols.join(","),
            range
        );
        debug!("Requesting batched price history from {}", url);

        let send = with_retry(|| self.client.get(&url).send(), SEND_RETRIES, RETRY_DELAY_MS);
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| {
                ProviderError::Unavailable(format!(
                    "spark request timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|error| ProviderError::Unavailable(error.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "spark request failed with HTTP {}",
                response.status()
            )));
        }

        let payload = response
            .json::<SparkPayload>()
            .await
            .map_err(|error| ProviderError::Unavailable(error.to_string()))?;

        Ok(RawTable::from(payload).into_series_map(""))
    }

    async fn fetch_each(
        &self,
        symbols: &[String],
        range: &str,
    ) -> Result<HashMap<String, CloseSeries>, ProviderError> {
        let futures = symbols.iter().map(|symbol| async move {
            let outcome =
                match tokio::time::timeout(self.timeout, self.fetch_chart(symbol, range)).await {
                    Ok(Ok(Some(series))) => FetchOutcome::Data(series),
                    Ok(Ok(None)) => FetchOutcome::NoData,
                    Ok(Err(error)) => FetchOutcome::Transport(error.to_string()),
                    Err(_) => {
                        warn!(%symbol, "Provider call timed out; skipping instrument");
                        FetchOutcome::NoData
                    }
                };
            (symbol.clone(), outcome)
        });

        let mut fetched = HashMap::new();
        let mut transport_errors = Vec::new();
        for (symbol, outcome) in join_all(futures).await {
            match outcome {
                FetchOutcome::Data(series) => {
                    fetched.insert(symbol, series);
                }
                FetchOutcome::NoData => {
                    debug!(%symbol, "No data for instrument");
                }
                FetchOutcome::Transport(error) => {
                    warn!(%symbol, %error, "Instrument fetch failed");
                    transport_errors.push(error);
                }
            }
        }

        // Reachability is judged per batch: only when every single call died
        // in transport is the provider considered down.
        if !transport_errors.is_empty() && transport_errors.len() == symbols.len() {
            return Err(ProviderError::Unavailable(transport_errors.swap_remove(0)));
        }

        Ok(fetched)
    }
}

#[async_trait]
impl HistoryProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooHistoryFetch",
        skip(self, symbols),
        fields(instruments = symbols.len(), period = %period)
    )]
    async fn fetch_history(
        &self,
        symbols: &[String],
        period: Period,
    ) -> Result<HashMap<String, CloseSeries>, ProviderError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let range = period.fetch_range();
        let mut fetched = if self.batch_spark && symbols.len() > 1 {
            self.fetch_spark(symbols, range).await?
        } else {
            self.fetch_each(symbols, range).await?
        };

        if period == Period::OneDay {
            // The 2d range came back; keep the previous close and the latest.
            for series in fetched.values_mut() {
                series.truncate_to_last(2);
            }
        }

        debug!(fetched = fetched.len(), "Provider fetch complete");
        Ok(fetched)
    }
}
