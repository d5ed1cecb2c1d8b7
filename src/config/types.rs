use serde::Deserialize;

/// Main configuration structure for Sumi-Sentinel
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Must be explicitly set to true before any scan is run
    #[serde(default)]
    pub disclaimer_acknowledged: bool,

    /// URLs to scan, in output order
    pub targets: Vec<String>,

    /// Maximum number of in-flight fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Global ceiling on outbound requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Timeout for a single HTTP attempt
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,

    #[serde(default = "default_true")]
    pub obey_robots_txt: bool,

    /// Timeout for fetching a robots.txt document
    #[serde(default = "default_robots_timeout_seconds")]
    pub robots_timeout_seconds: f64,

    /// Escalate 401/403 responses to the rendering collaborator
    #[serde(default = "default_true")]
    pub use_browser_fallback: bool,

    /// CSS selector the renderer waits for instead of network idle
    #[serde(default)]
    pub browser_wait_selector: Option<String>,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Proxy URIs, rotated round-robin (empty means direct connections)
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Static headers sent with every request
    #[serde(default)]
    pub headers: std::collections::BTreeMap<String, String>,

    /// Bearer token sent as `Authorization`
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default)]
    pub referers: Vec<String>,

    #[serde(default)]
    pub origins: Vec<String>,

    /// User-Agent pool (empty means the built-in browser pool)
    #[serde(default)]
    pub user_agents: Vec<String>,

    /// Lower bound of the pre-request jitter
    #[serde(default = "default_jitter_min_seconds")]
    pub jitter_min_seconds: f64,

    /// Upper bound of the pre-request jitter
    #[serde(default = "default_jitter_max_seconds")]
    pub jitter_max_seconds: f64,

    /// Overall deadline for the whole run
    #[serde(default)]
    pub run_timeout_seconds: Option<f64>,
}

/// Retry behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff_seconds")]
    pub base_backoff_seconds: f64,

    #[serde(default = "default_max_backoff_seconds")]
    pub max_backoff_seconds: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_seconds: default_base_backoff_seconds(),
            max_backoff_seconds: default_max_backoff_seconds(),
        }
    }
}

impl Config {
    /// Creates a configuration for the given targets with every other option
    /// at its default value
    ///
    /// The disclaimer is left unacknowledged.
    pub fn with_targets(targets: Vec<String>) -> Self {
        Self {
            disclaimer_acknowledged: false,
            targets,
            concurrency: default_concurrency(),
            requests_per_second: default_requests_per_second(),
            timeout_seconds: default_timeout_seconds(),
            obey_robots_txt: true,
            robots_timeout_seconds: default_robots_timeout_seconds(),
            use_browser_fallback: true,
            browser_wait_selector: None,
            retry: RetryConfig::default(),
            proxies: Vec::new(),
            headers: Default::default(),
            auth_token: None,
            referers: Vec::new(),
            origins: Vec::new(),
            user_agents: Vec::new(),
            jitter_min_seconds: default_jitter_min_seconds(),
            jitter_max_seconds: default_jitter_max_seconds(),
            run_timeout_seconds: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> u32 {
    5
}

fn default_requests_per_second() -> f64 {
    2.0
}

fn default_timeout_seconds() -> f64 {
    20.0
}

fn default_robots_timeout_seconds() -> f64 {
    10.0
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_backoff_seconds() -> f64 {
    0.5
}

fn default_max_backoff_seconds() -> f64 {
    8.0
}

fn default_jitter_min_seconds() -> f64 {
    0.15
}

fn default_jitter_max_seconds() -> f64 {
    0.8
}
