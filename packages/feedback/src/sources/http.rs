//! Shared HTTP machinery for source clients.
//!
//! Every source client owns one [`SourceHttpClient`], which carries the
//! ambient fetch behavior:
//!
//! - in-memory response cache with TTL; hits bypass the network entirely
//! - exponential-backoff retry on 429 and 5xx; other non-2xx fail fast
//! - governor-paced spacing between requests to the same source
//!
//! Each client instance owns its private cache, so concurrent runs for
//! different products do not interfere.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use futures::future::join_all;
use governor::{Quota, RateLimiter};
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::types::config::ClientConfig;
use crate::types::item::RawItem;

type SourceRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Cache key: endpoint path plus serialized query parameters.
type CacheKey = (String, String);

struct CacheEntry {
    fetched_at: Instant,
    body: serde_json::Value,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() <= ttl
    }
}

/// Backoff delay for the given attempt: `base * 2^attempt`.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt)
}

/// HTTP client with caching, retry, and pacing for one source.
pub struct SourceHttpClient {
    client: reqwest::Client,
    config: ClientConfig,
    limiter: Option<SourceRateLimiter>,
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl SourceHttpClient {
    /// Create a client for the given source config.
    pub fn new(config: ClientConfig) -> Self {
        let limiter = Quota::with_period(config.request_delay).map(RateLimiter::direct);

        Self {
            client: reqwest::Client::new(),
            config,
            limiter,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// GET a JSON endpoint, going through cache, pacing, and retry.
    pub async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, SourceError> {
        let key = cache_key(endpoint, params);

        if let Some(body) = self.cache_get(&key) {
            debug!(endpoint = %endpoint, "cache hit");
            return Ok(body);
        }

        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut attempt: u32 = 0;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            let response = self
                .client
                .get(&url)
                .query(params)
                .header("User-Agent", &self.config.user_agent)
                .send()
                .await?;

            let status = response.status().as_u16();

            if response.status().is_success() {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| SourceError::Decode(e.to_string()))?;
                self.cache_put(key, body.clone());
                return Ok(body);
            }

            if !SourceError::status_is_retryable(status) {
                return Err(SourceError::Http {
                    status,
                    retryable: false,
                });
            }

            if attempt >= self.config.max_retries {
                return Err(SourceError::Exhausted {
                    status,
                    attempts: attempt + 1,
                });
            }

            let delay = backoff_delay(self.config.retry_delay, attempt);
            warn!(
                endpoint = %endpoint,
                status,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retryable source error, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn cache_get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let cache = self.cache.read().expect("cache lock poisoned");
        cache
            .get(key)
            .filter(|entry| entry.is_fresh(self.config.cache_ttl))
            .map(|entry| entry.body.clone())
    }

    fn cache_put(&self, key: CacheKey, body: serde_json::Value) {
        let mut cache = self.cache.write().expect("cache lock poisoned");
        cache.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                body,
            },
        );
    }

}

fn cache_key(endpoint: &str, params: &[(&str, String)]) -> CacheKey {
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    (endpoint.to_string(), query)
}

/// Fetch children for a set of parents in groups of three, isolating
/// failures: a failed child fetch contributes an empty list for that parent
/// rather than failing the batch.
pub async fn fetch_children_batched<F, Fut>(parent_ids: &[String], fetch: F) -> Vec<RawItem>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<RawItem>, SourceError>>,
{
    const CHILD_BATCH: usize = 3;

    let mut children = Vec::new();
    for chunk in parent_ids.chunks(CHILD_BATCH) {
        let results = join_all(chunk.iter().cloned().map(&fetch)).await;
        for (parent, result) in chunk.iter().zip(results) {
            match result {
                Ok(items) => children.extend(items),
                Err(e) => {
                    warn!(parent = %parent, error = %e, "child fetch failed, skipping parent");
                }
            }
        }
    }
    children
}
