//! Statistics reporting module
//!
//! Summarizes a finished run's results for display.

use crate::escalation::META_RENDERED_HTML_LENGTH;
use crate::scan::ScanResult;

/// Run statistics structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStatistics {
    /// Total number of targets
    pub total: usize,

    /// Targets answered with a 2xx or 3xx status and no errors
    pub succeeded: usize,

    /// Targets answered with 401, 403 or 429
    pub blocked: usize,

    /// Targets with at least one recorded error
    pub failed: usize,

    /// Targets that were handed to the renderer successfully
    pub escalated: usize,
}

impl ScanStatistics {
    pub fn from_results(results: &[ScanResult]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            if !result.errors.is_empty() {
                stats.failed += 1;
            } else if matches!(result.status_code, Some(200..=399)) {
                stats.succeeded += 1;
            }

            if matches!(result.status_code, Some(401 | 403 | 429)) {
                stats.blocked += 1;
            }

            if result.metadata.contains_key(META_RENDERED_HTML_LENGTH) {
                stats.escalated += 1;
            }
        }

        stats
    }

    /// Percentage of targets that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.total as f64) * 100.0
    }
}

/// Prints statistics to stderr in a human-readable format
///
/// Stdout is reserved for the JSON report.
pub fn print_statistics(stats: &ScanStatistics) {
    eprintln!("=== Scan Statistics ===\n");

    eprintln!("Overview:");
    eprintln!("  Targets: {}", stats.total);
    eprintln!("  Succeeded: {}", stats.succeeded);
    eprintln!("  Blocked (401/403/429): {}", stats.blocked);
    eprintln!("  Failed: {}", stats.failed);
    eprintln!("  Escalated to browser: {}", stats.escalated);
    eprintln!();

    eprintln!(
        "Success Rate: {:.1}% ({} / {} targets)",
        stats.success_rate(),
        stats.succeeded,
        stats.total
    );
}
