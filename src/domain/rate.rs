//! Resolved USD rates and their provenance.

use crate::domain::{Asset, Decimal, TimeMs};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a rate came from.
///
/// `Fixed` and `Fallback` signal reduced accuracy to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RateSource {
    /// Hard-wired 1:1 (USD itself, external resolution disabled, or last resort).
    Fixed,
    /// Static approximation table.
    Fallback,
    /// A named external provider.
    Provider(String),
}

impl RateSource {
    pub fn as_str(&self) -> &str {
        match self {
            RateSource::Fixed => "FIXED",
            RateSource::Fallback => "FALLBACK",
            RateSource::Provider(tag) => tag,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, RateSource::Provider(_))
    }
}

impl From<String> for RateSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "FIXED" => RateSource::Fixed,
            "FALLBACK" => RateSource::Fallback,
            _ => RateSource::Provider(value),
        }
    }
}

impl From<RateSource> for String {
    fn from(value: RateSource) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// USD price of one unit of `asset` on `day`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub asset: Asset,
    #[serde(rename = "rateUSD")]
    pub rate_usd: Decimal,
    pub day: NaiveDate,
    pub source: RateSource,
}

impl Rate {
    pub fn new(asset: Asset, rate_usd: Decimal, day: NaiveDate, source: RateSource) -> Self {
        Self {
            asset,
            rate_usd,
            day,
            source,
        }
    }

    pub fn fixed(asset: Asset, day: NaiveDate) -> Self {
        Self::new(asset, Decimal::one(), day, RateSource::Fixed)
    }

    pub fn cache_key(&self) -> String {
        rate_cache_key(&self.asset, self.day)
    }

    /// USD value of `amount` units.
    pub fn value_of(&self, amount: Decimal) -> Decimal {
        amount * self.rate_usd
    }
}

/// Cache key for an asset-day: `TYPE:SYMBOL:YYYY-MM-DD`.
pub fn rate_cache_key(asset: &Asset, day: NaiveDate) -> String {
    format!("{}:{}", asset.key(), day.format("%Y-%m-%d"))
}

/// Requested point in time for a rate lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateQuery {
    Current,
    Historical(TimeMs),
}

impl RateQuery {
    /// `None` or a timestamp at/after `now` means current.
    pub fn classify(at: Option<TimeMs>, now: TimeMs) -> Self {
        match at {
            Some(t) if t < now => RateQuery::Historical(t),
            _ => RateQuery::Current,
        }
    }

    pub fn day(&self, now: TimeMs) -> NaiveDate {
        match self {
            RateQuery::Current => now.day(),
            RateQuery::Historical(t) => t.day(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_per_day() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(rate_cache_key(&Asset::crypto("btc"), day), "CRYPTO:BTC:2024-06-01");
    }

    #[test]
    fn test_rate_source_string_roundtrip() {
        assert_eq!(RateSource::from("FIXED".to_string()), RateSource::Fixed);
        assert_eq!(RateSource::from("FALLBACK".to_string()), RateSource::Fallback);
        assert_eq!(
            RateSource::from("COINGECKO".to_string()),
            RateSource::Provider("COINGECKO".to_string())
        );
        assert_eq!(
            serde_json::to_value(RateSource::Fallback).unwrap(),
            serde_json::json!("FALLBACK")
        );
        assert!(RateSource::Fixed.is_degraded());
        assert!(!RateSource::Provider("X".into()).is_degraded());
    }

    #[test]
    fn test_rate_query_classify() {
        let now = TimeMs::new(10_000);
        assert_eq!(RateQuery::classify(None, now), RateQuery::Current);
        assert_eq!(RateQuery::classify(Some(TimeMs::new(10_000)), now), RateQuery::Current);
        assert_eq!(RateQuery::classify(Some(TimeMs::new(20_000)), now), RateQuery::Current);
        assert_eq!(
            RateQuery::classify(Some(TimeMs::new(5_000)), now),
            RateQuery::Historical(TimeMs::new(5_000))
        );
    }
}
