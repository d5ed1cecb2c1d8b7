//! Per-target fetch engine
//!
//! `FetchEngine::fetch` runs one target's attempt loop:
//!
//! 1. Acquire a concurrency slot
//! 2. Check robots.txt (when enabled); a disallowed target makes no attempts
//! 3. For each attempt: take a rate-limiter token, sleep a random jitter,
//!    pick the active proxy, build headers, send the GET
//! 4. On a response: harvest cookies, let the proxy pool react to the status,
//!    return the result
//! 5. On a network failure: back off exponentially and try again until the
//!    retry budget is spent
//!
//! `fetch` never returns an error; every failure is encoded in the result.

use crate::config::{duration_from_secs, validate, Config};
use crate::fetch::client::{build_robots_client, ClientPool};
use crate::fetch::headers::HeaderBuilder;
use crate::fetch::limiter::RateLimiter;
use crate::fetch::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::proxy::ProxyPool;
use crate::robots::RobotsPolicyCache;
use crate::scan::ScanResult;
use crate::session::SessionStore;
use crate::ScanError;
use rand::Rng;
use reqwest::header::HeaderMap;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// A response that was received and fully read
#[derive(Debug)]
struct RawResponse {
    status_code: u16,
    final_url: String,
    headers: BTreeMap<String, String>,
    cookies: Vec<(String, String)>,
    content_length: u64,
}

/// Rate-limited, proxy-aware HTTP fetcher with bounded retries
pub struct FetchEngine {
    session: Arc<SessionStore>,
    proxies: Arc<ProxyPool>,
    robots: Option<Arc<RobotsPolicyCache>>,
    limiter: Arc<RateLimiter>,
    clients: ClientPool,
    slots: Arc<Semaphore>,
    retry: RetryPolicy,
    headers: HeaderBuilder,
    jitter: RangeInclusive<f64>,
    sleeper: Arc<dyn Sleeper>,
}

impl FetchEngine {
    /// Creates an engine for a run
    ///
    /// # Arguments
    ///
    /// * `config` - The validated scan configuration
    /// * `session` - The run's shared session store
    /// * `proxies` - The run's shared proxy pool
    ///
    /// # Returns
    ///
    /// * `Ok(FetchEngine)` - Ready to fetch
    /// * `Err(ScanError)` - The configuration is invalid or the robots.txt
    ///   client could not be built
    pub fn new(
        config: &Config,
        session: Arc<SessionStore>,
        proxies: Arc<ProxyPool>,
    ) -> Result<Self, ScanError> {
        validate(config)?;

        let robots = if config.obey_robots_txt {
            let client = build_robots_client(duration_from_secs(config.robots_timeout_seconds))?;
            Some(Arc::new(RobotsPolicyCache::new(client)))
        } else {
            None
        };

        Ok(Self {
            session,
            proxies,
            robots,
            limiter: Arc::new(RateLimiter::new(config.requests_per_second)),
            clients: ClientPool::new(duration_from_secs(config.timeout_seconds)),
            slots: Arc::new(Semaphore::new(config.concurrency.max(1) as usize)),
            retry: RetryPolicy::from(&config.retry),
            headers: HeaderBuilder::from_config(config),
            jitter: config.jitter_min_seconds..=config.jitter_max_seconds,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replaces the sleeper used for jitter and backoff delays
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn proxies(&self) -> &Arc<ProxyPool> {
        &self.proxies
    }

    pub fn robots(&self) -> Option<&Arc<RobotsPolicyCache>> {
        self.robots.as_ref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetches a URL with retry, backoff and proxy rotation
    pub async fn fetch(&self, url: &str) -> ScanResult {
        // The semaphore is never closed, so acquisition only fails on misuse
        let Ok(_permit) = self.slots.acquire().await else {
            return ScanResult::failed(url, "Fetch engine is shut down");
        };

        if let Some(robots) = &self.robots {
            let sample_agent = self.headers.random_user_agent();
            if !robots.can_fetch(url, &sample_agent).await {
                tracing::info!(url, "robots_blocked");
                return ScanResult::blocked_by_robots(url);
            }
        }

        let mut attempt = 1;
        loop {
            self.limiter.acquire().await;
            self.sleeper.sleep(self.jitter_delay()).await;

            let proxy = self.proxies.current_or_next();
            let headers = self.headers.build(&self.session).await;
            let start = Instant::now();

            match self.attempt(url, proxy.as_deref(), headers).await {
                Ok(response) => {
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

                    self.session.merge_cookies(response.cookies).await;
                    self.proxies.handle_blocking_status(response.status_code);

                    tracing::info!(
                        url,
                        status = response.status_code,
                        attempt,
                        proxy = proxy.as_deref().unwrap_or("direct"),
                        elapsed_ms = (elapsed_ms * 100.0).round() / 100.0,
                        "http_fetch"
                    );

                    let mut result = ScanResult::new(url);
                    result.status_code = Some(response.status_code);
                    result.content_length = Some(response.content_length);
                    result.response_time_ms = elapsed_ms;
                    result.final_url = Some(response.final_url);
                    result.headers = response.headers;
                    return result;
                }
                Err(e) => {
                    let backoff = self.retry.backoff(attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        error = %e,
                        next_backoff = backoff.as_secs_f64(),
                        "http_fetch_error"
                    );

                    if !self.retry.should_retry(attempt) {
                        return ScanResult::exhausted(url, e.to_string(), attempt);
                    }

                    self.sleeper.sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Sends one GET and reads the whole response
    async fn attempt(
        &self,
        url: &str,
        proxy: Option<&str>,
        headers: HeaderMap,
    ) -> Result<RawResponse, reqwest::Error> {
        let client = self.clients.client(proxy)?;
        let response = client.get(url).headers(headers).send().await?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let headers = flatten_headers(response.headers());
        let body = response.bytes().await?;

        Ok(RawResponse {
            status_code,
            final_url,
            headers,
            cookies,
            content_length: body.len() as u64,
        })
    }

    fn jitter_delay(&self) -> Duration {
        let (min, max) = (*self.jitter.start(), *self.jitter.end());
        if max <= min {
            return duration_from_secs(min);
        }
        duration_from_secs(rand::thread_rng().gen_range(min..=max))
    }
}

/// Flattens a header map, comma-joining repeated values
///
/// Values that are not valid UTF-8 are decoded lossily.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}
