//! Fiat conversion providers, tried in order by the resolver.

use super::http::positive_number;
use super::{ProviderError, ProviderHttp, RateProvider};
use crate::domain::{Asset, AssetType, Decimal, RateQuery};
use async_trait::async_trait;
use tracing::debug;

pub const ER_API_URL: &str = "https://open.er-api.com/v6";
pub const FRANKFURTER_API_URL: &str = "https://api.frankfurter.app";
pub const CURRENCY_API_URL: &str = "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api";

fn is_foreign_fiat(asset: &Asset) -> bool {
    asset.asset_type == AssetType::Fiat && !asset.is_usd()
}

fn to_decimal(value: f64, symbol: &str) -> Result<Decimal, ProviderError> {
    Decimal::from_f64(value).ok_or_else(|| ProviderError::NoRate(symbol.to_string()))
}

/// Primary aggregator. Quotes everything against USD; current rates only.
#[derive(Debug, Clone)]
pub struct ErApiProvider {
    http: ProviderHttp,
    base_url: String,
}

impl ErApiProvider {
    pub fn new(http: ProviderHttp, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RateProvider for ErApiProvider {
    fn id(&self) -> &'static str {
        "ER_API"
    }

    fn supports(&self, asset: &Asset) -> bool {
        is_foreign_fiat(asset)
    }

    async fn try_resolve(&self, asset: &Asset, query: RateQuery) -> Result<Decimal, ProviderError> {
        if let RateQuery::Historical(_) = query {
            return Err(ProviderError::Unsupported("historical rates".to_string()));
        }

        let url = format!("{}/latest/USD", self.base_url);
        let body = self.http.get_json(&url, &[], None).await?;
        let units_per_usd = parse_er_api(&body, &asset.symbol)?;
        debug!("ER_API {} per USD = {}", asset.symbol, units_per_usd);
        to_decimal(1.0 / units_per_usd, &asset.symbol)
    }
}

fn parse_er_api(body: &serde_json::Value, symbol: &str) -> Result<f64, ProviderError> {
    if let Some(result) = body.get("result").and_then(|v| v.as_str()) {
        if result != "success" {
            return Err(ProviderError::Parse(format!("result = {}", result)));
        }
    }
    body.get("rates")
        .and_then(|rates| rates.get(symbol))
        .and_then(positive_number)
        .ok_or_else(|| ProviderError::NoRate(symbol.to_string()))
}

/// ECB-backed alternate with daily history.
#[derive(Debug, Clone)]
pub struct FrankfurterProvider {
    http: ProviderHttp,
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new(http: ProviderHttp, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RateProvider for FrankfurterProvider {
    fn id(&self) -> &'static str {
        "FRANKFURTER"
    }

    fn supports(&self, asset: &Asset) -> bool {
        is_foreign_fiat(asset)
    }

    async fn try_resolve(&self, asset: &Asset, query: RateQuery) -> Result<Decimal, ProviderError> {
        let path = match query {
            RateQuery::Current => "latest".to_string(),
            RateQuery::Historical(at) => at.day().format("%Y-%m-%d").to_string(),
        };
        let url = format!("{}/{}?from={}&to=USD", self.base_url, path, asset.symbol);
        let body = self.http.get_json(&url, &[], None).await?;
        let rate = body
            .get("rates")
            .and_then(|rates| rates.get("USD"))
            .and_then(positive_number)
            .ok_or_else(|| ProviderError::NoRate(asset.symbol.clone()))?;
        to_decimal(rate, &asset.symbol)
    }
}

/// CDN-hosted currency dataset, second alternate.
#[derive(Debug, Clone)]
pub struct CurrencyApiProvider {
    http: ProviderHttp,
    base_url: String,
}

impl CurrencyApiProvider {
    pub fn new(http: ProviderHttp, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RateProvider for CurrencyApiProvider {
    fn id(&self) -> &'static str {
        "CURRENCY_API"
    }

    fn supports(&self, asset: &Asset) -> bool {
        is_foreign_fiat(asset)
    }

    async fn try_resolve(&self, asset: &Asset, query: RateQuery) -> Result<Decimal, ProviderError> {
        let version = match query {
            RateQuery::Current => "latest".to_string(),
            RateQuery::Historical(at) => at.day().format("%Y-%m-%d").to_string(),
        };
        let code = asset.symbol.to_ascii_lowercase();
        let url = format!("{}@{}/v1/currencies/{}.json", self.base_url, version, code);
        let body = self.http.get_json(&url, &[], None).await?;
        let rate = body
            .get(&code)
            .and_then(|quotes| quotes.get("usd"))
            .and_then(positive_number)
            .ok_or_else(|| ProviderError::NoRate(asset.symbol.clone()))?;
        to_decimal(rate, &asset.symbol)
    }
}
