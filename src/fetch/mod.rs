//! Fetch module for single-target HTTP scanning
//!
//! This module contains the per-target fetch logic, including:
//! - Building HTTP clients per proxy
//! - Randomized request headers with session cookies and auth
//! - Global rate limiting
//! - Retry with exponential backoff behind a sleep abstraction
//! - The `FetchEngine` attempt loop itself

mod client;
mod engine;
mod headers;
mod limiter;
mod retry;

pub use client::{build_http_client, build_robots_client, ClientPool};
pub use engine::FetchEngine;
pub use headers::{HeaderBuilder, DEFAULT_USER_AGENTS};
pub use limiter::RateLimiter;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
