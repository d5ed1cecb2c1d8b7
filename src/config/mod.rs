//! Configuration module for Sumi-Sentinel
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_sentinel::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scan.toml")).unwrap();
//! println!("Scanning {} targets", config.targets.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, RetryConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{duration_from_secs, validate, MAX_DURATION_SECONDS};
