//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Policies are keyed by origin (`scheme://host[:port]`) and fail open.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsPolicyCache};
pub use parser::ParsedRobots;

use crate::ScanError;
use reqwest::Client;
use url::Url;

/// Returns the origin (`scheme://host[:port]`) of a URL
///
/// Default ports are omitted. Returns `None` for unparseable URLs and for
/// URLs without a host.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Fetches and parses robots.txt for an origin
///
/// A non-success status yields the permissive policy rather than an error,
/// since servers commonly answer a missing robots.txt with an HTML page.
///
/// # Returns
///
/// * `Ok(ParsedRobots)` - Parsed policy (or allow-all for non-success statuses)
/// * `Err(ScanError)` - The request or body read failed
pub async fn fetch_robots(client: &Client, origin: &str) -> Result<ParsedRobots, ScanError> {
    let robots_url = Url::parse(origin)?.join("/robots.txt")?;
    tracing::debug!(url = %robots_url, "fetching robots.txt");

    let response = client.get(robots_url).send().await?;
    if !response.status().is_success() {
        tracing::debug!(origin, status = response.status().as_u16(), "no robots.txt, allowing all");
        return Ok(ParsedRobots::allow_all());
    }

    let body = response.text().await?;
    Ok(ParsedRobots::from_content(&body))
}
