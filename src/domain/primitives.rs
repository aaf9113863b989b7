//! Domain primitives: TimeMs, AssetType, Asset.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MS_PER_DAY: i64 = 86_400_000;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Like `new`, but `None` for instants outside the calendar range.
    pub fn checked(ms: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(ms).single().map(|_| TimeMs(ms))
    }

    pub fn now() -> Self {
        TimeMs(Utc::now().timestamp_millis())
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        TimeMs(dt.timestamp_millis())
    }

    /// Midnight UTC of the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        let dt = date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or_default();
        TimeMs::from_datetime(dt)
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or_default()
    }

    /// Calendar day (UTC) containing this instant.
    pub fn day(&self) -> NaiveDate {
        self.to_datetime().date_naive()
    }

    pub fn as_secs(&self) -> i64 {
        self.0.div_euclid(1000)
    }

    /// Fractional days elapsed from `earlier` to `self`.
    pub fn days_since(&self, earlier: TimeMs) -> f64 {
        (self.0 - earlier.0) as f64 / MS_PER_DAY as f64
    }

    /// Parse either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
    pub fn parse_iso(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(TimeMs::from_datetime(dt.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .map(TimeMs::from_date)
    }
}

impl fmt::Display for TimeMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}

/// Asset class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Fiat,
    Crypto,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Fiat => "FIAT",
            AssetType::Crypto => "CRYPTO",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = AssetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIAT" => Ok(AssetType::Fiat),
            "CRYPTO" => Ok(AssetType::Crypto),
            other => Err(AssetParseError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetParseError {
    #[error("unknown asset type: {0}")]
    UnknownType(String),
    #[error("empty asset symbol")]
    EmptySymbol,
    #[error("asset key must look like TYPE:SYMBOL, got {0}")]
    Malformed(String),
}

/// A priced instrument. Symbols are stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub symbol: String,
}

impl Asset {
    pub fn new(asset_type: AssetType, symbol: &str) -> Self {
        Asset {
            asset_type,
            symbol: symbol.trim().to_ascii_uppercase(),
        }
    }

    pub fn fiat(symbol: &str) -> Self {
        Asset::new(AssetType::Fiat, symbol)
    }

    pub fn crypto(symbol: &str) -> Self {
        Asset::new(AssetType::Crypto, symbol)
    }

    /// Identity key `TYPE:SYMBOL`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.asset_type, self.symbol)
    }

    pub fn is_usd(&self) -> bool {
        self.asset_type == AssetType::Fiat && self.symbol == "USD"
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asset_type, self.symbol)
    }
}

impl FromStr for Asset {
    type Err = AssetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, symbol) = s
            .split_once(':')
            .ok_or_else(|| AssetParseError::Malformed(s.to_string()))?;
        if symbol.trim().is_empty() {
            return Err(AssetParseError::EmptySymbol);
        }
        Ok(Asset::new(ty.parse()?, symbol))
    }
}
