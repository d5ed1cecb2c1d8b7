//! Robots.txt policy cache
//!
//! One entry per origin for the lifetime of a run. Each origin has its own
//! `OnceCell`, so concurrent first lookups share a single robots.txt fetch.

use crate::robots::{fetch_robots, origin_of, ParsedRobots};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Cached robots.txt data for an origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self { content }
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.content.is_allowed(url, user_agent)
    }
}

/// Per-origin, fail-open robots.txt cache with single-flight fetching
#[derive(Debug)]
pub struct RobotsPolicyCache {
    client: Client,
    entries: Mutex<HashMap<String, Arc<OnceCell<CachedRobots>>>>,
}

impl RobotsPolicyCache {
    /// Creates a cache that fetches robots.txt with the given client
    ///
    /// The client should carry the (short) robots timeout.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether `user_agent` may fetch `url`
    ///
    /// The first call for an origin fetches `/robots.txt`; any failure to
    /// fetch it fails open and the permissive policy is cached for the run.
    /// A URL with no usable origin is allowed; the fetch itself reports it.
    pub async fn can_fetch(&self, url: &str, user_agent: &str) -> bool {
        let Some(origin) = origin_of(url) else {
            return true;
        };

        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(origin.clone()).or_default().clone()
        };

        let cached = cell
            .get_or_init(|| async {
                let parsed = match fetch_robots(&self.client, &origin).await {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        tracing::warn!(origin = %origin, error = %e, "robots.txt unavailable, failing open");
                        ParsedRobots::allow_all()
                    }
                };
                CachedRobots::new(parsed)
            })
            .await;

        cached.is_allowed(url, user_agent)
    }

    /// Returns the cached entry for an origin, if it has been resolved
    pub fn get(&self, origin: &str) -> Option<CachedRobots> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(origin).and_then(|cell| cell.get().cloned())
    }

    /// Returns the number of origins with a resolved policy
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
