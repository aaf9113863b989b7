//! USD rate resolution: provider abstraction, request queue, retry policy,
//! caching and the fallback chain.

use crate::domain::{Asset, Decimal, RateQuery};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod cache;
pub mod coingecko;
pub mod fallback;
pub mod fx;
pub mod http;
pub mod mock;
pub mod queue;
pub mod resolver;
pub mod retry;

pub use cache::RateCache;
pub use coingecko::CoinGeckoProvider;
pub use fallback::FallbackTable;
pub use fx::{CurrencyApiProvider, ErApiProvider, FrankfurterProvider};
pub use http::ProviderHttp;
pub use mock::MockRateProvider;
pub use queue::RequestQueue;
pub use resolver::RateResolver;
pub use retry::RetryPolicy;

/// One external source of USD prices.
///
/// Implementations return the USD price of one unit of `asset`, or an error
/// that makes the resolver move on to the next provider in the chain.
#[async_trait]
pub trait RateProvider: Send + Sync + fmt::Debug {
    /// Tag recorded as the `source` of rates produced by this provider.
    fn id(&self) -> &'static str;

    /// Whether this provider can price `asset` at all.
    fn supports(&self, asset: &Asset) -> bool;

    async fn try_resolve(&self, asset: &Asset, query: RateQuery) -> Result<Decimal, ProviderError>;
}

/// Error type for provider calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP error {status}")]
    Http { status: u16 },
    #[error("Rate limited")]
    RateLimited,
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("No rate for {0}")]
    NoRate(String),
    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Only rate limiting is retried in place; everything else fails the provider.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited)
    }
}
