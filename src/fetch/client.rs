//! HTTP client construction
//!
//! reqwest binds proxies at client build time, so one client is kept per
//! proxy (plus one for direct connections) and reused across attempts.

use reqwest::{redirect::Policy, Client, Proxy};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Maximum redirect hops followed for a single request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client for scanning
///
/// # Arguments
///
/// * `timeout` - Bound on a single request, including redirects and body
/// * `proxy` - Proxy URI to route through, or `None` for direct connections
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - The proxy URI was rejected or the TLS backend failed to initialize
pub fn build_http_client(timeout: Duration, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Builds the short-timeout client used for robots.txt lookups
pub fn build_robots_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .build()
}

/// Lazily built clients keyed by proxy
#[derive(Debug)]
pub struct ClientPool {
    timeout: Duration,
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl ClientPool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the client for a proxy, building it on first use
    pub fn client(&self, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let key = proxy.map(str::to_string);
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = build_http_client(self.timeout, proxy)?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    /// Returns the number of clients built so far
    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
