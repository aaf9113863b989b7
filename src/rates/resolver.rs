//! The rate resolver: cache lookup, provider fallback chain, static fallback.

use super::{
    CoinGeckoProvider, CurrencyApiProvider, ErApiProvider, FallbackTable, FrankfurterProvider,
    ProviderHttp, RateCache, RateProvider, RequestQueue, RetryPolicy,
};
use crate::config::Config;
use crate::domain::{rate_cache_key, Asset, AssetType, Decimal, Rate, RateQuery, RateSource, TimeMs};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves USD rates for assets at points in time.
///
/// Lookups never fail: when every provider is unavailable the result degrades
/// to the static fallback table and finally to a fixed 1:1 rate, tagged
/// accordingly in `Rate::source`.
#[derive(Debug, Clone)]
pub struct RateResolver {
    cache: Arc<RateCache>,
    fiat_providers: Vec<Arc<dyn RateProvider>>,
    crypto_providers: Vec<Arc<dyn RateProvider>>,
    fallback: FallbackTable,
    external_disabled: bool,
}

impl RateResolver {
    /// Resolver with no providers; add them with the `with_*` builders.
    pub fn new(cache: Arc<RateCache>, fallback: FallbackTable) -> Self {
        Self {
            cache,
            fiat_providers: Vec::new(),
            crypto_providers: Vec::new(),
            fallback,
            external_disabled: false,
        }
    }

    /// Production wiring: the three FX providers and CoinGecko, all sharing
    /// one request queue.
    pub fn from_config(config: &Config, cache: Arc<RateCache>) -> Self {
        let queue = Arc::new(RequestQueue::new());
        let policy = RetryPolicy::default().with_max_attempts(config.rate_limit_max_attempts);
        let http = ProviderHttp::new(queue, policy, config.provider_timeout);

        Self::new(cache, config.fiat_fallback_rates.clone())
            .with_fiat_provider(Arc::new(ErApiProvider::new(
                http.clone(),
                config.er_api_url.clone(),
            )))
            .with_fiat_provider(Arc::new(FrankfurterProvider::new(
                http.clone(),
                config.frankfurter_api_url.clone(),
            )))
            .with_fiat_provider(Arc::new(CurrencyApiProvider::new(
                http.clone(),
                config.currency_api_url.clone(),
            )))
            .with_crypto_provider(Arc::new(CoinGeckoProvider::new(
                http,
                config.coingecko_api_url.clone(),
                config.coingecko_api_key.clone(),
                config.coingecko_warmup,
            )))
            .with_external_disabled(config.disable_external_rates)
    }

    pub fn with_fiat_provider(mut self, provider: Arc<dyn RateProvider>) -> Self {
        self.fiat_providers.push(provider);
        self
    }

    pub fn with_crypto_provider(mut self, provider: Arc<dyn RateProvider>) -> Self {
        self.crypto_providers.push(provider);
        self
    }

    /// Skip every provider and answer from the fallback table or FIXED.
    pub fn with_external_disabled(mut self, disabled: bool) -> Self {
        self.external_disabled = disabled;
        self
    }

    pub fn cache(&self) -> &Arc<RateCache> {
        &self.cache
    }

    /// USD rate of `asset` at `at`, or the current rate when `at` is `None`
    /// or not in the past.
    pub async fn get_rate_usd(&self, asset: &Asset, at: Option<TimeMs>) -> Rate {
        let now = TimeMs::now();
        let query = RateQuery::classify(at, now);
        let day = query.day(now);

        if asset.is_usd() {
            return Rate::fixed(asset.clone(), day);
        }

        let key = rate_cache_key(asset, day);
        if let Some(hit) = self.cache.get(&key).await {
            debug!("Rate cache hit for {}", key);
            return hit;
        }

        let _guard = self.cache.lock_key(&key).await;
        // another caller may have resolved it while we waited
        if let Some(hit) = self.cache.get(&key).await {
            debug!("Rate cache hit for {} after wait", key);
            return hit;
        }

        let rate = self.resolve_uncached(asset, query, day).await;
        self.cache.put(&rate).await;
        rate
    }

    /// Current rate shorthand.
    pub async fn current_rate_usd(&self, asset: &Asset) -> Rate {
        self.get_rate_usd(asset, None).await
    }

    async fn resolve_uncached(&self, asset: &Asset, query: RateQuery, day: NaiveDate) -> Rate {
        if !self.external_disabled {
            let chain = match asset.asset_type {
                AssetType::Fiat => &self.fiat_providers,
                AssetType::Crypto => &self.crypto_providers,
            };

            for provider in chain.iter().filter(|p| p.supports(asset)) {
                match provider.try_resolve(asset, query).await {
                    Ok(rate) if rate.is_positive() => {
                        info!("Resolved {} on {} via {}: {}", asset, day, provider.id(), rate);
                        return Rate::new(
                            asset.clone(),
                            rate,
                            day,
                            RateSource::Provider(provider.id().to_string()),
                        );
                    }
                    Ok(rate) => {
                        warn!("{} returned non-positive rate {} for {}", provider.id(), rate, asset);
                    }
                    Err(e) => {
                        warn!("{} failed for {} on {}: {}", provider.id(), asset, day, e);
                    }
                }
            }
        }

        if let Some(rate) = self.fallback.get(&asset.symbol) {
            warn!("Using fallback rate for {} on {}: {}", asset, day, rate);
            return Rate::new(asset.clone(), rate, day, RateSource::Fallback);
        }

        warn!("No rate available for {} on {}, using FIXED 1", asset, day);
        Rate::fixed(asset.clone(), day)
    }
}

/// Convenience for callers that only need the current value of a holding.
pub async fn value_now(resolver: &RateResolver, asset: &Asset, amount: Decimal) -> Decimal {
    resolver.current_rate_usd(asset).await.value_of(amount)
}
