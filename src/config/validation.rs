use crate::config::types::{Config, RetryConfig};
use crate::ConfigError;
use std::time::Duration;
use url::Url;

/// Upper bound for every duration-valued option, in seconds (one day)
pub const MAX_DURATION_SECONDS: f64 = 86_400.0;

/// Validates the entire configuration
///
/// The authorized-use acknowledgement is deliberately not checked here: a
/// config without it is well-formed, it just may not be run.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_targets(&config.targets)?;
    validate_limits(config)?;
    validate_retry(&config.retry)?;
    validate_proxies(&config.proxies)?;
    validate_jitter(config.jitter_min_seconds, config.jitter_max_seconds)?;
    Ok(())
}

/// Validates that every target is an absolute http(s) URL
fn validate_targets(targets: &[String]) -> Result<(), ConfigError> {
    if targets.is_empty() {
        return Err(ConfigError::Validation(
            "targets must contain at least one URL".to_string(),
        ));
    }

    for target in targets {
        let url = Url::parse(target).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid target URL '{}': {}", target, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Target URL '{}' must use http or https",
                target
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Target URL '{}' has no host",
                target
            )));
        }
    }

    Ok(())
}

fn validate_limits(config: &Config) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if !(config.requests_per_second > 0.0) || !config.requests_per_second.is_finite() {
        return Err(ConfigError::Validation(format!(
            "requests_per_second must be > 0, got {}",
            config.requests_per_second
        )));
    }

    validate_seconds("timeout_seconds", config.timeout_seconds, false)?;
    validate_seconds("robots_timeout_seconds", config.robots_timeout_seconds, false)?;
    if let Some(deadline) = config.run_timeout_seconds {
        validate_seconds("run_timeout_seconds", deadline, false)?;
    }

    Ok(())
}

fn validate_retry(retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry.max_attempts must be >= 1, got {}",
            retry.max_attempts
        )));
    }

    validate_seconds("retry.base_backoff_seconds", retry.base_backoff_seconds, true)?;
    validate_seconds("retry.max_backoff_seconds", retry.max_backoff_seconds, true)?;

    if retry.base_backoff_seconds > retry.max_backoff_seconds {
        return Err(ConfigError::Validation(format!(
            "retry.base_backoff_seconds ({}) cannot exceed retry.max_backoff_seconds ({})",
            retry.base_backoff_seconds, retry.max_backoff_seconds
        )));
    }

    Ok(())
}

fn validate_proxies(proxies: &[String]) -> Result<(), ConfigError> {
    for proxy in proxies {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }
    Ok(())
}

fn validate_jitter(min: f64, max: f64) -> Result<(), ConfigError> {
    validate_seconds("jitter_min_seconds", min, true)?;
    validate_seconds("jitter_max_seconds", max, true)?;
    if max < min {
        return Err(ConfigError::Validation(format!(
            "jitter bounds must satisfy 0 <= jitter_min_seconds <= jitter_max_seconds, got {}..{}",
            min, max
        )));
    }
    Ok(())
}

/// Converts a seconds option to a `Duration`, clamped to `0..=MAX_DURATION_SECONDS`
///
/// Validated configs never hit the clamp; this only keeps direct library
/// callers from panicking on out-of-range values. NaN maps to zero.
pub fn duration_from_secs(seconds: f64) -> Duration {
    if seconds.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(seconds.clamp(0.0, MAX_DURATION_SECONDS))
}

/// Checks that a duration option is finite and within `MAX_DURATION_SECONDS`
///
/// Zero is accepted only when `allow_zero` is set.
fn validate_seconds(name: &str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !lower_ok || !(value <= MAX_DURATION_SECONDS) {
        let bound = if allow_zero { ">= 0" } else { "> 0" };
        return Err(ConfigError::Validation(format!(
            "{} must be {} and at most {} seconds, got {}",
            name, bound, MAX_DURATION_SECONDS, value
        )));
    }
    Ok(())
}
