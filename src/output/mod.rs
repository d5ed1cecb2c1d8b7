//! Output module for scan reports
//!
//! This module handles:
//! - Writing the JSON report of all scan results
//! - Summarizing and printing run statistics

pub mod stats;

pub use stats::{print_statistics, ScanStatistics};

use crate::scan::ScanResult;
use crate::ScanError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes results as a pretty-printed JSON array followed by a newline
///
/// # Arguments
///
/// * `results` - The scan results, in target order
/// * `writer` - Destination for the report
///
/// # Returns
///
/// * `Ok(())` - Report written and flushed
/// * `Err(ScanError)` - Serialization or I/O failed
pub fn write_json_report<W: Write>(results: &[ScanResult], mut writer: W) -> Result<(), ScanError> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes the JSON report to a file, replacing any existing content
pub fn write_json_report_to_path(results: &[ScanResult], path: &Path) -> Result<(), ScanError> {
    let file = File::create(path)?;
    write_json_report(results, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_results() -> Vec<ScanResult> {
        let mut ok = ScanResult::new("https://example.com/");
        ok.status_code = Some(200);
        ok.content_length = Some(512);
        vec![ok, ScanResult::blocked_by_robots("https://example.com/admin")]
    }

    #[test]
    fn test_write_json_report_is_ordered_array() {
        let mut buffer = Vec::new();
        write_json_report(&sample_results(), &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.ends_with("]\n"));

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["url"], "https://example.com/");
        assert_eq!(entries[0]["status_code"], 200);
        assert_eq!(entries[1]["errors"][0], "Blocked by robots.txt policy");
    }

    #[test]
    fn test_write_json_report_to_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");

        write_json_report_to_path(&sample_results(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_empty_results_write_empty_array() {
        let mut buffer = Vec::new();
        write_json_report(&[], &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "[]\n");
    }
}
