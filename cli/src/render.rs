//! Plain-text rendering of engine results for the terminal.

use std::time::Duration;
use twinsync_engine::{DiffResult, DirectoryEntry, ItemState, SyncReport};

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// One line per entry; directories carry a trailing slash.
pub fn listing(entries: &[DirectoryEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            if entry.is_dir && !entry.is_parent() {
                format!("{}/", entry.name)
            } else {
                entry.name.clone()
            }
        })
        .collect()
}

pub fn report(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} -> {}",
        report.mode,
        report.source.describe(),
        report.destination.describe()
    )];

    let elapsed = report
        .finished_at
        .and_then(|end| end.duration_since(report.started_at).ok())
        .unwrap_or_default();
    lines.push(format!(
        "Summary: {} transferred, {} skipped, {} failed",
        report.transferred_count(),
        report.skipped_count(),
        report.failed_count()
    ));
    lines.push(format!("Bytes transferred: {}", format_bytes(report.bytes_transferred)));
    lines.push(format!("Elapsed: {}", format_duration(elapsed)));

    if report.has_failures() {
        lines.push("Failed items:".to_string());
        for item in report.items.iter().filter(|i| i.state == ItemState::Failed) {
            lines.push(format!(
                "  {}: {}",
                item.source,
                item.error_message.as_deref().unwrap_or("(unknown error)")
            ));
        }
    }
    lines
}

pub fn diff(result: &DiffResult) -> Vec<String> {
    let mut lines = Vec::new();
    let sections = [
        ("Only local", &result.only_source),
        ("Only remote", &result.only_dest),
        ("Differing", &result.differing),
        ("Identical", &result.identical),
    ];
    for (title, names) in sections {
        lines.push(format!("{} ({}):", title, names.len()));
        lines.extend(names.iter().map(|name| format!("  {}", name)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_listing_marks_directories() {
        let entries = vec![
            DirectoryEntry::parent(),
            DirectoryEntry::new("docs", true),
            DirectoryEntry::new("a.txt", false),
        ];
        assert_eq!(listing(&entries), vec!["..", "docs/", "a.txt"]);
    }

    #[test]
    fn test_diff_sections() {
        let mut result = DiffResult::default();
        result.only_source.insert("x.txt".to_string());
        result.differing.insert("y.txt".to_string());
        result.identical.insert("z.txt".to_string());
        assert_eq!(
            diff(&result),
            vec![
                "Only local (1):",
                "  x.txt",
                "Only remote (0):",
                "Differing (1):",
                "  y.txt",
                "Identical (1):",
                "  z.txt",
            ]
        );
    }
}
