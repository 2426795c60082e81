use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::output::format_bytes;
use crate::stats::StatsSnapshot;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Samples the shared counters and forwards one formatted line to the
/// progress sink, at most once per interval no matter how often the
/// polling loop calls `tick`.
pub struct ProgressReporter {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl ProgressReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    pub fn tick(
        &mut self,
        snapshot: &StatsSnapshot,
        pending: u64,
        running: u64,
        queued: u64,
        sink: &mut dyn FnMut(&str),
    ) {
        if self
            .last_emit
            .is_some_and(|last| last.elapsed() < self.interval)
        {
            return;
        }
        self.last_emit = Some(Instant::now());
        sink(&format_line(snapshot, pending, running, queued));
    }
}

fn format_line(snapshot: &StatsSnapshot, pending: u64, running: u64, queued: u64) -> String {
    format!(
        "enumerations pending/running/queued: {pending}/{running}/{queued} | files seen: {} ({}) | files matched: {} ({})",
        snapshot.all_files,
        format_bytes(snapshot.all_bytes),
        snapshot.matched_files,
        format_bytes(snapshot.matched_bytes),
    )
}

/// Single-line stderr status display: rewrites the same line with `\r` and
/// blank-pads when the new text is shorter than the previous one.
#[derive(Default)]
pub struct StatusLine {
    prev_len: usize,
}

impl StatusLine {
    pub fn set(&mut self, text: &str) {
        let mut stderr = io::stderr().lock();
        let pad = self.prev_len.saturating_sub(text.len());
        let _ = write!(stderr, "\r{text}{}", " ".repeat(pad));
        let _ = stderr.flush();
        self.prev_len = text.len();
    }

    pub fn clear(&mut self) {
        if self.prev_len > 0 {
            let mut stderr = io::stderr().lock();
            let _ = write!(stderr, "\r{}\r", " ".repeat(self.prev_len));
            let _ = stderr.flush();
            self.prev_len = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot {
            all_bytes: 2048,
            all_files: 3,
            all_dirs: 2,
            matched_files: 1,
            matched_bytes: 1024,
            longest_name: None,
        }
    }

    #[test]
    fn line_carries_all_counters() {
        let line = format_line(&snapshot(), 5, 2, 3);
        assert_eq!(
            line,
            "enumerations pending/running/queued: 5/2/3 | files seen: 3 (2.0 KB) | files matched: 1 (1.0 KB)"
        );
    }

    #[test]
    fn ticks_are_rate_limited() {
        let mut reporter = ProgressReporter::new(Duration::from_secs(60));
        let mut lines = Vec::new();
        let mut sink = |text: &str| lines.push(text.to_string());
        reporter.tick(&snapshot(), 1, 1, 0, &mut sink);
        reporter.tick(&snapshot(), 2, 2, 0, &mut sink);
        reporter.tick(&snapshot(), 3, 3, 0, &mut sink);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn zero_interval_emits_every_tick() {
        let mut reporter = ProgressReporter::new(Duration::ZERO);
        let mut count = 0;
        let mut sink = |_: &str| count += 1;
        reporter.tick(&snapshot(), 1, 1, 0, &mut sink);
        reporter.tick(&snapshot(), 1, 1, 0, &mut sink);
        assert_eq!(count, 2);
    }
}
