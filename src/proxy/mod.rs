//! Proxy rotation module
//!
//! Provides the round-robin `ProxyPool` used by the fetch engine. Rotation is
//! triggered by responses that usually mean the current exit IP is blocked.

mod pool;

pub use pool::{is_blocking_status, ProxyPool, BLOCKING_STATUSES};
