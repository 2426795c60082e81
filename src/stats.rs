use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Shared scan counters, mutated only through atomic operations.
///
/// Readable at any time for progress display; authoritative only once the
/// executor has reported completion.
#[derive(Debug, Default)]
pub struct ScanStats {
    all_bytes: AtomicU64,
    all_files: AtomicU64,
    all_dirs: AtomicU64,
    matched_files: AtomicU64,
    matched_bytes: AtomicU64,
    longest_name: Mutex<Option<LongestName>>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LongestName {
    pub name: String,
    pub length: usize,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, size: u64) {
        self.all_files.fetch_add(1, Ordering::Relaxed);
        self.all_bytes.fetch_add(size, Ordering::Relaxed);
    }

    pub fn add_dir(&self) {
        self.all_dirs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_match(&self, size: u64) {
        self.matched_files.fetch_add(1, Ordering::Relaxed);
        self.matched_bytes.fetch_add(size, Ordering::Relaxed);
    }

    /// Compare-and-maybe-replace on the longest filename seen so far.
    /// Concurrent updates race benignly; the lock only makes each
    /// replacement itself whole.
    pub fn record_name(&self, name: &str) {
        let length = name.chars().count();
        let mut longest = self.longest_name.lock();
        let replace = longest.as_ref().is_none_or(|current| length > current.length);
        if replace {
            *longest = Some(LongestName {
                name: name.to_string(),
                length,
            });
        }
    }

    /// Shallow copy of all counters. Not atomic across fields: a reader may
    /// see `all_files` slightly ahead of `all_bytes` mid-scan.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            all_bytes: self.all_bytes.load(Ordering::Relaxed),
            all_files: self.all_files.load(Ordering::Relaxed),
            all_dirs: self.all_dirs.load(Ordering::Relaxed),
            matched_files: self.matched_files.load(Ordering::Relaxed),
            matched_bytes: self.matched_bytes.load(Ordering::Relaxed),
            longest_name: self.longest_name.lock().clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub all_bytes: u64,
    pub all_files: u64,
    pub all_dirs: u64,
    pub matched_files: u64,
    pub matched_bytes: u64,
    pub longest_name: Option<LongestName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = ScanStats::new();
        stats.add_dir();
        stats.add_file(10);
        stats.add_file(5);
        stats.add_match(10);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.all_dirs, 1);
        assert_eq!(snapshot.all_files, 2);
        assert_eq!(snapshot.all_bytes, 15);
        assert_eq!(snapshot.matched_files, 1);
        assert_eq!(snapshot.matched_bytes, 10);
    }

    #[test]
    fn longest_name_keeps_the_record() {
        let stats = ScanStats::new();
        stats.record_name("short");
        stats.record_name("much-longer-name.txt");
        stats.record_name("mid.txt");

        let longest = stats.snapshot().longest_name.expect("record");
        assert_eq!(longest.name, "much-longer-name.txt");
        assert_eq!(longest.length, 20);
    }

    #[test]
    fn parallel_updates_do_not_lose_counts() {
        use std::sync::Arc;

        let stats = Arc::new(ScanStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.add_file(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker");
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.all_files, 8000);
        assert_eq!(snapshot.all_bytes, 8000);
    }
}
