//! Request header construction
//!
//! Every attempt gets a fresh header set: configured static headers, a
//! randomly chosen User-Agent, the session's bearer token and cookies, and
//! optionally a random Referer / Origin.

use crate::config::Config;
use crate::session::SessionStore;
use rand::seq::SliceRandom;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE, ORIGIN, REFERER, USER_AGENT,
};

/// Desktop browser User-Agents used when the config does not supply a pool
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Builds per-attempt request headers
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    static_headers: HeaderMap,
    user_agents: Vec<String>,
    referers: Vec<String>,
    origins: Vec<String>,
}

impl HeaderBuilder {
    /// Creates a builder from the configured headers and header pools
    ///
    /// Static headers whose name or value is not a valid HTTP header are
    /// skipped with a warning.
    pub fn from_config(config: &Config) -> Self {
        let mut static_headers = HeaderMap::new();
        for (name, value) in &config.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    static_headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid configured header"),
            }
        }

        let user_agents = if config.user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
        } else {
            config.user_agents.clone()
        };

        Self {
            static_headers,
            user_agents,
            referers: config.referers.clone(),
            origins: config.origins.clone(),
        }
    }

    /// Picks a User-Agent from the pool
    pub fn random_user_agent(&self) -> String {
        pick(&self.user_agents).unwrap_or(DEFAULT_USER_AGENTS[0]).to_string()
    }

    /// Builds the header set for one attempt
    pub async fn build(&self, session: &SessionStore) -> HeaderMap {
        let (user_agent, referer, origin) = self.pick_randomized();

        let mut headers = self.static_headers.clone();
        insert(&mut headers, USER_AGENT, &user_agent);

        if let Some(token) = session.auth_token().await {
            insert(&mut headers, AUTHORIZATION, &format!("Bearer {}", token));
        }
        if let Some(cookie) = session.cookie_header().await {
            insert(&mut headers, COOKIE, &cookie);
        }
        if let Some(referer) = referer {
            insert(&mut headers, REFERER, &referer);
        }
        if let Some(origin) = origin {
            insert(&mut headers, ORIGIN, &origin);
        }

        headers
    }

    fn pick_randomized(&self) -> (String, Option<String>, Option<String>) {
        (
            self.random_user_agent(),
            pick(&self.referers).map(str::to_string),
            pick(&self.origins).map(str::to_string),
        )
    }
}

fn pick(pool: &[String]) -> Option<&str> {
    pool.choose(&mut rand::thread_rng()).map(String::as_str)
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "dropping header with invalid value"),
    }
}
