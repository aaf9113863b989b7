//! CoinGecko market data provider for crypto assets.

use super::http::positive_number;
use super::{ProviderError, ProviderHttp, RateProvider};
use crate::domain::{Asset, AssetType, Decimal, RateQuery, TimeMs};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Half-width of the time-series window fetched around a historical instant.
const HISTORY_WINDOW_SECS: i64 = 86_400;

/// Symbol -> CoinGecko coin id. Unlisted symbols fall back to the lowercase
/// symbol, which matches many smaller coins.
const COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("USDT", "tether"),
    ("USDC", "usd-coin"),
    ("DAI", "dai"),
    ("BNB", "binancecoin"),
    ("XRP", "ripple"),
    ("ADA", "cardano"),
    ("DOGE", "dogecoin"),
    ("DOT", "polkadot"),
    ("AVAX", "avalanche-2"),
    ("LINK", "chainlink"),
    ("MATIC", "matic-network"),
    ("POL", "polygon-ecosystem-token"),
    ("TON", "the-open-network"),
    ("TRX", "tron"),
    ("LTC", "litecoin"),
    ("ATOM", "cosmos"),
    ("ARB", "arbitrum"),
    ("OP", "optimism"),
    ("HYPE", "hyperliquid"),
    ("SUI", "sui"),
    ("NEAR", "near"),
];

pub fn coin_id(symbol: &str) -> String {
    let upper = symbol.to_ascii_uppercase();
    COIN_IDS
        .iter()
        .find(|(s, _)| *s == upper)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| symbol.to_ascii_lowercase())
}

/// CoinGecko is the most aggressively rate-limited provider, so every call
/// waits `warmup` inside the queue slot before going out.
#[derive(Debug, Clone)]
pub struct CoinGeckoProvider {
    http: ProviderHttp,
    base_url: String,
    api_key: Option<String>,
    warmup: Duration,
}

impl CoinGeckoProvider {
    pub fn new(http: ProviderHttp, base_url: String, api_key: Option<String>, warmup: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            warmup,
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        self.api_key
            .iter()
            .map(|key| ("x-cg-demo-api-key", key.clone()))
            .collect()
    }

    async fn current_price(&self, id: &str) -> Result<f64, ProviderError> {
        let url = format!("{}/simple/price?ids={}&vs_currencies=usd", self.base_url, id);
        let body = self
            .http
            .get_json(&url, &self.headers(), Some(self.warmup))
            .await?;
        body.get(id)
            .and_then(|quote| quote.get("usd"))
            .and_then(positive_number)
            .ok_or_else(|| ProviderError::NoRate(id.to_string()))
    }

    async fn historical_price(&self, id: &str, at: TimeMs) -> Result<f64, ProviderError> {
        let center = at.as_secs();
        let to = (center + HISTORY_WINDOW_SECS).min(TimeMs::now().as_secs());
        let from = center - HISTORY_WINDOW_SECS;
        let url = format!(
            "{}/coins/{}/market_chart/range?vs_currency=usd&from={}&to={}",
            self.base_url, id, from, to
        );
        let body = self
            .http
            .get_json(&url, &self.headers(), Some(self.warmup))
            .await?;
        let samples = parse_price_series(&body)?;
        closest_sample(&samples, at.as_ms()).ok_or_else(|| ProviderError::NoRate(id.to_string()))
    }
}

#[async_trait]
impl RateProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        "COINGECKO"
    }

    fn supports(&self, asset: &Asset) -> bool {
        asset.asset_type == AssetType::Crypto
    }

    async fn try_resolve(&self, asset: &Asset, query: RateQuery) -> Result<Decimal, ProviderError> {
        let id = coin_id(&asset.symbol);
        let price = match query {
            RateQuery::Current => self.current_price(&id).await?,
            RateQuery::Historical(at) => self.historical_price(&id, at).await?,
        };
        debug!("COINGECKO {} = {} USD", id, price);
        Decimal::from_f64(price).ok_or_else(|| ProviderError::NoRate(asset.symbol.clone()))
    }
}

/// Parse `{"prices": [[ms, price], ...]}`, skipping malformed samples.
fn parse_price_series(body: &serde_json::Value) -> Result<Vec<(i64, f64)>, ProviderError> {
    let prices = body
        .get("prices")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderError::Parse("missing prices array".to_string()))?;

    Ok(prices
        .iter()
        .filter_map(|sample| {
            let pair = sample.as_array()?;
            let ts = pair.first()?.as_f64()? as i64;
            let price = positive_number(pair.get(1)?)?;
            Some((ts, price))
        })
        .collect())
}

/// Price of the sample nearest to `target_ms`. Earlier samples win ties.
pub fn closest_sample(samples: &[(i64, f64)], target_ms: i64) -> Option<f64> {
    let mut best: Option<(i64, f64)> = None;
    for &(ts, price) in samples {
        let delta = (ts - target_ms).abs();
        match best {
            Some((best_delta, _)) if best_delta <= delta => {}
            _ => best = Some((delta, price)),
        }
    }
    best.map(|(_, price)| price)
}
