use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};

use crate::model::FoundEntry;

/// What one matched entry turns into on the output line. A closed set:
/// the match sink picks the branch, nothing is dispatched dynamically.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PrintFormat {
    /// Full path only.
    Name,
    /// Modification time, size, full path.
    Long,
    /// Creation, modification and access times, size, full path.
    Full,
    /// Tab-separated machine format with epoch timestamps and the root and
    /// relative path split into their own columns.
    Tsv,
}

pub fn format_entry(entry: &FoundEntry, format: PrintFormat) -> String {
    match format {
        PrintFormat::Name => entry.full_path().display().to_string(),
        PrintFormat::Long => format!(
            "{}\t{:>12}\t{}",
            format_time(entry.modified),
            entry.size,
            entry.full_path().display()
        ),
        PrintFormat::Full => format!(
            "{}\t{}\t{}\t{:>12}\t{}",
            format_time(entry.created),
            format_time(entry.modified),
            format_time(entry.accessed),
            entry.size,
            entry.full_path().display()
        ),
        PrintFormat::Tsv => format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            entry.size,
            epoch_seconds(entry.created),
            epoch_seconds(entry.modified),
            epoch_seconds(entry.accessed),
            entry.root.display(),
            entry.rel_path().display()
        ),
    }
}

fn format_time(time: Option<SystemTime>) -> String {
    match time {
        Some(time) => DateTime::<Local>::from(time)
            .format("%Y.%m.%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}

fn epoch_seconds(time: Option<SystemTime>) -> i64 {
    match time {
        Some(time) => match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        },
        None => -1,
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
