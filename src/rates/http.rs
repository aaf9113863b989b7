//! Shared HTTP plumbing for price providers.

use super::{ProviderError, RequestQueue, RetryPolicy};
use backoff::future::retry_notify;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP GET helper that routes every request through the global queue and
/// retries rate-limited responses according to the retry policy.
#[derive(Debug, Clone)]
pub struct ProviderHttp {
    client: Client,
    queue: Arc<RequestQueue>,
    policy: RetryPolicy,
}

impl ProviderHttp {
    /// `timeout` bounds each attempt end to end, body included.
    pub fn new(queue: Arc<RequestQueue>, policy: RetryPolicy, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("finledger/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self {
            client,
            queue,
            policy,
        }
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    /// Fetch `url` and decode the body as JSON.
    pub async fn get_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        warmup: Option<Duration>,
    ) -> Result<serde_json::Value, ProviderError> {
        self.queue
            .run(warmup, move || async move {
                retry_notify(
                    self.policy.clone(),
                    move || async move {
                        self.get_once(url, headers)
                            .await
                            .map_err(|e| self.policy.classify(e))
                    },
                    move |err: ProviderError, wait: Duration| {
                        warn!("GET {} failed ({}), retrying in {:?}", url, err, wait);
                    },
                )
                .await
            })
            .await
    }

    async fn get_once(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
    ) -> Result<serde_json::Value, ProviderError> {
        debug!("GET {}", url);
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
            });
        }

        response.json::<serde_json::Value>().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Parse(e.to_string())
            }
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Extract a strictly positive number from a JSON value that may be a number
/// or a numeric string.
pub(crate) fn positive_number(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (n.is_finite() && n > 0.0).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positive_number() {
        assert_eq!(positive_number(&json!(1.5)), Some(1.5));
        assert_eq!(positive_number(&json!("0.92")), Some(0.92));
        assert_eq!(positive_number(&json!(0)), None);
        assert_eq!(positive_number(&json!(-3.0)), None);
        assert_eq!(positive_number(&json!("abc")), None);
        assert_eq!(positive_number(&json!(null)), None);
    }
}
