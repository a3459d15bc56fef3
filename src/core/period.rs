use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A lookback window selecting how much history to request from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub fn all() -> Vec<Period> {
        vec![
            Period::OneDay,
            Period::FiveDays,
            Period::OneMonth,
            Period::SixMonths,
            Period::OneYear,
            Period::YearToDate,
            Period::FiveYears,
            Period::Max,
        ]
    }

    pub fn token(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::YearToDate => "ytd",
            Period::FiveYears => "5y",
            Period::Max => "max",
        }
    }

    /// Range token sent to the provider. A one-day view requests two days of
    /// history so a previous close is always available for the change figure.
    pub fn fetch_range(&self) -> &'static str {
        match self {
            Period::OneDay => "2d",
            other => other.token(),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1d" => Ok(Period::OneDay),
            "5d" => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "ytd" => Ok(Period::YearToDate),
            "5y" => Ok(Period::FiveYears),
            "max" => Ok(Period::Max),
            _ => Err(anyhow::anyhow!("Invalid period: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        for period in Period::all() {
            let parsed: Period = period.token().parse().unwrap();
            assert_eq!(parsed, period);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("YTD".parse::<Period>().unwrap(), Period::YearToDate);
        assert_eq!("1Mo".parse::<Period>().unwrap(), Period::OneMonth);
    }

    #[test]
    fn test_parse_rejects_unknown_token() {
        assert!("2w".parse::<Period>().is_err());
    }

    #[test]
    fn test_one_day_fetches_two_day_range() {
        assert_eq!(Period::OneDay.fetch_range(), "2d");
        assert_eq!(Period::FiveDays.fetch_range(), "5d");
        assert_eq!(Period::Max.fetch_range(), "max");
    }

    #[test]
    fn test_yaml_representation_uses_tokens() {
        let periods: Vec<Period> = serde_yaml::from_str("[1d, 1mo, ytd]").unwrap();
        assert_eq!(
            periods,
            vec![Period::OneDay, Period::OneMonth, Period::YearToDate]
        );
    }
}
