//! HTTP GET with an on-disk response cache in front and bounded retry behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::{ResponseCache, signature};
use crate::error::FetchError;
use crate::retry::{RetryPolicy, is_retryable_error, is_retryable_status};

pub const USER_AGENT: &str = concat!("forecast-dash/", env!("CARGO_PKG_VERSION"));

/// Source of "now" for cache freshness decisions.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Clone)]
pub struct CachedClient {
    http: reqwest::Client,
    cache: Option<ResponseCache>,
    retry: RetryPolicy,
    clock: Clock,
}

impl std::fmt::Debug for CachedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedClient")
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl CachedClient {
    /// `cache: None` disables caching; every call goes to the network.
    pub fn new(
        cache: Option<ResponseCache>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self {
            http,
            cache,
            retry,
            clock: system_clock(),
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch `url`, serving a fresh cache entry when one exists.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let sig = signature("GET", url);
        let now = (self.clock)();

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lookup(&sig, now) {
                return Ok(hit.body);
            }
        }

        let body = self.fetch_with_retry(url).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&sig, url, &body, (self.clock)()) {
                warn!("failed to cache response for {url}: {e}");
            }
        }
        Ok(body)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut last = String::from("no attempt made");

        for attempt in 0..self.retry.max_attempts() {
            if attempt > 0 {
                let delay = self.retry.delay_for_retry(attempt - 1);
                info!(
                    "retry {} of {} for {url} in {:?}",
                    attempt, self.retry.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }

            debug!("GET {url} (attempt {})", attempt + 1);
            let resp = match self.http.get(url).send().await {
                Ok(r) => r,
                Err(e) if is_retryable_error(&e) => {
                    warn!("network error on attempt {}: {e}", attempt + 1);
                    last = format!("network error: {e}");
                    continue;
                }
                Err(e) => return Err(FetchError::Request(e.to_string())),
            };

            let status = resp.status();
            if status.is_success() {
                match resp.bytes().await {
                    Ok(bytes) => return Ok(bytes.to_vec()),
                    Err(e) => {
                        warn!("body read failed on attempt {}: {e}", attempt + 1);
                        last = format!("body read error: {e}");
                        continue;
                    }
                }
            }
            if is_retryable_status(status) {
                warn!("status {status} on attempt {}", attempt + 1);
                last = format!("status {status}");
                continue;
            }
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.retry.max_attempts(),
            last,
        })
    }
}
