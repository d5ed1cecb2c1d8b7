//! Scan result record
//!
//! Exactly one `ScanResult` is produced per configured target, whatever
//! happens to it. `errors` is non-empty iff the fetch did not complete
//! normally; escalation details live in `metadata`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Error recorded when robots.txt disallows a target
pub const ROBOTS_BLOCKED_ERROR: &str = "Blocked by robots.txt policy";

/// Error recorded when the run is cancelled before a target finishes
pub const CANCELLED_ERROR: &str = "Scan cancelled before completion";

/// Outcome of scanning a single target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    /// The target URL as configured
    pub url: String,

    /// HTTP status of the final response, if one was received
    pub status_code: Option<u16>,

    /// Body length in bytes
    pub content_length: Option<u64>,

    /// Elapsed time of the successful attempt
    pub response_time_ms: f64,

    /// URL after following redirects
    pub final_url: Option<String>,

    /// Response headers sorted by name (lowercase names, repeated values comma-joined)
    pub headers: BTreeMap<String, String>,

    pub errors: Vec<String>,

    /// Attempt counts and escalation outcomes
    pub metadata: Map<String, Value>,
}

impl ScanResult {
    /// Creates an empty result for a URL with no response recorded
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status_code: None,
            content_length: None,
            response_time_ms: 0.0,
            final_url: None,
            headers: BTreeMap::new(),
            errors: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Result for a target that robots.txt disallows (no attempts made)
    pub fn blocked_by_robots(url: impl Into<String>) -> Self {
        Self::failed(url, ROBOTS_BLOCKED_ERROR)
    }

    /// Result for a target that could not be processed at all
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new(url);
        result.errors.push(error.into());
        result
    }

    /// Result for a target whose every attempt failed
    pub fn exhausted(url: impl Into<String>, error: impl Into<String>, attempts: u32) -> Self {
        let mut result = Self::failed(url, error);
        result.set_metadata("attempts", attempts);
        result
    }

    /// Result for a target the run stopped waiting for
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::failed(url, CANCELLED_ERROR)
    }

    /// Returns true if a response was received and nothing went wrong
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.status_code.is_some()
    }

    pub fn set_metadata(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn metadata_bool(&self, key: &str) -> Option<bool> {
        self.metadata.get(key).and_then(Value::as_bool)
    }

    pub fn metadata_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(Value::as_u64)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}
