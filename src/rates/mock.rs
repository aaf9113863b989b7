//! Scripted provider for testing the resolver without network calls.

use super::{ProviderError, RateProvider};
use crate::domain::{Asset, AssetType, Decimal, RateQuery};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Provider returning fixed prices per symbol and counting calls.
#[derive(Debug, Clone)]
pub struct MockRateProvider {
    id: &'static str,
    asset_type: AssetType,
    prices: HashMap<String, Decimal>,
    failure: Option<ProviderError>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockRateProvider {
    pub fn new(id: &'static str, asset_type: AssetType) -> Self {
        Self {
            id,
            asset_type,
            prices: HashMap::new(),
            failure: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_ascii_uppercase(), price);
        self
    }

    /// Make every call fail with `err`.
    pub fn failing(mut self, err: ProviderError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Sleep before answering, to widen race windows in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter; clones observe the same count.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for MockRateProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn supports(&self, asset: &Asset) -> bool {
        asset.asset_type == self.asset_type
    }

    async fn try_resolve(&self, asset: &Asset, _query: RateQuery) -> Result<Decimal, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.prices
            .get(&asset.symbol)
            .copied()
            .ok_or_else(|| ProviderError::NoRate(asset.symbol.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_calls_across_clones() {
        let mock = MockRateProvider::new("MOCK", AssetType::Crypto)
            .with_price("btc", Decimal::from_i64(60_000));
        let clone = mock.clone();

        let price = clone
            .try_resolve(&Asset::crypto("BTC"), RateQuery::Current)
            .await
            .unwrap();
        assert_eq!(price, Decimal::from_i64(60_000));
        assert_eq!(mock.calls(), 1);
        assert!(clone
            .try_resolve(&Asset::crypto("ETH"), RateQuery::Current)
            .await
            .is_err());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockRateProvider::new("MOCK", AssetType::Fiat).failing(ProviderError::Timeout);
        assert!(!mock.supports(&Asset::crypto("BTC")));
        assert_eq!(
            mock.try_resolve(&Asset::fiat("EUR"), RateQuery::Current).await,
            Err(ProviderError::Timeout)
        );
    }
}
