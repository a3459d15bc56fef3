use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::{debug, warn};

use crate::core::period::Period;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Category {
    pub name: String,
    pub instruments: Vec<Instrument>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Fetch the whole universe in one spark request instead of one chart
    /// request per symbol.
    #[serde(default)]
    pub batch_spark: bool,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: default_timeout_secs(),
            batch_spark: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig::default()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// Seconds an aligned matrix stays fresh before a refetch.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_capacity() -> usize {
    32
}

fn default_periods() -> Vec<Period> {
    Period::all()
}

fn default_period() -> Period {
    Period::OneMonth
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub categories: Vec<Category>,
    #[serde(default = "default_periods")]
    pub periods: Vec<Period>,
    #[serde(default = "default_period")]
    pub default_period: Period,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "gmd", "gmd")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.periods.is_empty() {
            bail!("At least one period must be enabled");
        }
        if !self.periods.contains(&self.default_period) {
            bail!(
                "Default period '{}' is not in the enabled period list",
                self.default_period
            );
        }
        for category in &self.categories {
            let mut seen = HashSet::new();
            for instrument in &category.instruments {
                if !seen.insert(instrument.symbol.as_str()) {
                    bail!(
                        "Category '{}' lists symbol '{}' more than once",
                        category.name,
                        instrument.symbol
                    );
                }
            }
        }
        Ok(())
    }

    /// Every configured symbol, in category order, without duplicates.
    pub fn symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .flat_map(|category| &category.instruments)
            .filter(|instrument| seen.insert(instrument.symbol.as_str()))
            .map(|instrument| instrument.symbol.clone())
            .collect()
    }

    /// Parses a user-supplied period token, falling back to the configured
    /// default on an unknown or disabled token.
    pub fn resolve_period(&self, token: Option<&str>) -> Period {
        let Some(token) = token else {
            return self.default_period;
        };
        match token.parse::<Period>() {
            Ok(period) if self.periods.contains(&period) => period,
            Ok(period) => {
                warn!(%period, "Period not enabled; using default");
                self.default_period
            }
            Err(_) => {
                warn!(token, "Unknown period token; using default");
                self.default_period
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: "Global Equity"
    instruments:
      - symbol: "^GSPC"
        name: "S&P 500"
      - symbol: "^N225"
        name: "Nikkei 225"
  - name: "Currency"
    instruments:
      - symbol: "JPY=X"
        name: "USD/JPY"
default_period: "1mo"
periods: ["1d", "5d", "1mo", "1y"]
cache:
  ttl_secs: 600
  capacity: 8
"#;

    #[test]
    fn test_config_deserialization() {
        let config: AppConfig = serde_yaml::from_str(SAMPLE).expect("Failed to deserialize");
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0].name, "Global Equity");
        assert_eq!(config.categories[0].instruments[0].symbol, "^GSPC");
        assert_eq!(config.categories[0].instruments[0].name, "S&P 500");
        assert_eq!(config.default_period, Period::OneMonth);
        assert_eq!(config.periods.len(), 4);
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.cache.capacity, 8);
        // Provider section falls back to the public endpoint.
        let yahoo = config.providers.yahoo.unwrap();
        assert_eq!(yahoo.base_url, "https://query1.finance.yahoo.com");
        assert_eq!(yahoo.timeout_secs, 10);
        assert!(!yahoo.batch_spark);
    }

    #[test]
    fn test_defaults_applied_when_sections_missing() {
        let yaml = r#"
categories:
  - name: "X"
    instruments:
      - symbol: "A"
        name: "A"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.periods, Period::all());
        assert_eq!(config.default_period, Period::OneMonth);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.cache.capacity, 32);
    }

    #[test]
    fn test_duplicate_symbol_in_category_is_rejected() {
        let yaml = r#"
categories:
  - name: "X"
    instruments:
      - symbol: "A"
        name: "First"
      - symbol: "A"
        name: "Again"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("more than once"));
    }

    #[test]
    fn test_default_period_must_be_enabled() {
        let yaml = r#"
categories:
  - name: "X"
    instruments:
      - symbol: "A"
        name: "A"
periods: ["1d"]
default_period: "1y"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_symbols_preserve_order_without_duplicates() {
        let config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.symbols(), vec!["^GSPC", "^N225", "JPY=X"]);
    }

    #[test]
    fn test_resolve_period_falls_back_to_default() {
        let config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.resolve_period(None), Period::OneMonth);
        assert_eq!(config.resolve_period(Some("5d")), Period::FiveDays);
        // Valid token, but not enabled in this config.
        assert_eq!(config.resolve_period(Some("max")), Period::OneMonth);
        assert_eq!(config.resolve_period(Some("bogus")), Period::OneMonth);
    }
}
