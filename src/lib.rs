//! Sumi-Sentinel: a polite, resilient URL scanner
//!
//! This crate scans a configured set of URLs under bounded concurrency,
//! respecting robots.txt and a global request rate, rotating proxies when a
//! target starts blocking, and escalating to a rendering or challenge-solving
//! collaborator when plain fetching is refused.
//!
//! Intended strictly for auditing resources you own or are explicitly
//! authorized to test.

pub mod config;
pub mod escalation;
pub mod fetch;
pub mod output;
pub mod proxy;
pub mod robots;
pub mod scan;
pub mod session;

use thiserror::Error;

/// Main error type for Sumi-Sentinel operations
///
/// Only run-level failures are represented here. Anything that goes wrong
/// while scanning an individual target is recorded on its `ScanResult`.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Set disclaimer_acknowledged = true in the config to confirm authorized usage")]
    DisclaimerNotAcknowledged,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Sumi-Sentinel operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use escalation::{ChallengeSolver, ManualChallengeSolver, RenderOutput, Renderer};
pub use scan::{run_scan, ScanOrchestrator, ScanResult};
pub use session::{SessionState, SessionStore};
