//! Session module for state shared across concurrent scans
//!
//! # Components
//!
//! - `SessionState`: Plain cookies / local storage / auth token data
//! - `SessionStore`: The synchronized owner every task and the renderer go through

mod state;
mod store;

pub use state::SessionState;
pub use store::SessionStore;
