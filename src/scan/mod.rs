//! Scan module
//!
//! Run-level orchestration and the per-target result record.

mod orchestrator;
mod result;

pub use orchestrator::{run_scan, ScanOrchestrator, TASK_ABORTED_ERROR};
pub use result::{ScanResult, CANCELLED_ERROR, ROBOTS_BLOCKED_ERROR};
