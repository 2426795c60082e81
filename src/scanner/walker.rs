use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;

use crate::executor::Submitter;
use crate::model::{EntryKind, FoundEntry, ScanEvent, ScanOptions, WorkItem, error_code};
use crate::stats::ScanStats;

/// Turns one work item (a directory) into stat updates, match events and
/// zero or more child work items. All concurrency lives in the executor;
/// this type only ever runs inside a worker's `process` call.
pub struct Walker {
    options: ScanOptions,
    stats: Arc<ScanStats>,
    events: Sender<ScanEvent>,
    cancel: Arc<AtomicBool>,
}

impl Walker {
    pub fn new(
        options: ScanOptions,
        stats: Arc<ScanStats>,
        events: Sender<ScanEvent>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            options,
            stats,
            events,
            cancel,
        }
    }

    pub fn process(&self, item: WorkItem, submitter: &Submitter<'_, WorkItem>) {
        if self.cancelled() {
            return;
        }

        let dir = item.dir_path();
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(error) => {
                // Terminal for this subtree only; siblings keep going.
                self.report_error(&dir, &error);
                return;
            }
        };

        for entry_result in read_dir {
            if self.cancelled() {
                return;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(error) => {
                    self.report_error(&dir, &error);
                    continue;
                }
            };
            self.handle_entry(&item, &entry, submitter);
        }
    }

    fn handle_entry(
        &self,
        item: &WorkItem,
        entry: &fs::DirEntry,
        submitter: &Submitter<'_, WorkItem>,
    ) {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(error) => {
                self.report_error(&path, &error);
                return;
            }
        };

        // Symlinks get one extra stat to learn whether the target is a
        // directory; broken links fall back to the link's own metadata and
        // count as files.
        let is_symlink = file_type.is_symlink();
        let metadata = if is_symlink {
            fs::metadata(&path).or_else(|_| entry.metadata())
        } else {
            entry.metadata()
        };
        let metadata = match metadata {
            Ok(metadata) => metadata,
            Err(error) => {
                self.report_error(&path, &error);
                return;
            }
        };

        if metadata.is_dir() {
            self.stats.add_dir();
            if self.enter_dir(item.depth, is_symlink) && !self.cancelled() {
                if let Err(error) = submitter.submit(item.child(&entry.file_name())) {
                    // Contract violation; the panic is caught at the worker
                    // loop and surfaced to the caller as an executor fault.
                    panic!("{error}");
                }
            }
            self.emit_if_matched(item, entry, EntryKind::Dir, &metadata);
        } else {
            let size = metadata.len();
            self.stats.add_file(size);
            if self.options.track_longest_name {
                self.stats.record_name(&entry.file_name().to_string_lossy());
            }
            self.emit_if_matched(item, entry, EntryKind::File, &metadata);
        }
    }

    /// Descend decision, independent of the emission decision.
    fn enter_dir(&self, current_depth: usize, is_symlink: bool) -> bool {
        if let Some(max_depth) = self.options.max_depth {
            if current_depth + 1 > max_depth {
                return false;
            }
        }
        if is_symlink && !self.options.follow_junctions {
            return false;
        }
        true
    }

    fn emit_if_matched(
        &self,
        item: &WorkItem,
        entry: &fs::DirEntry,
        kind: EntryKind,
        metadata: &fs::Metadata,
    ) {
        if !self.options.emit.includes(kind) {
            return;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if !self.options.name_matches(&name) {
            return;
        }
        let modified = metadata.modified().ok();
        if !self.options.mtime_matches(modified) {
            return;
        }

        // Directories contribute no bytes to the matched totals.
        let size = match kind {
            EntryKind::File => metadata.len(),
            EntryKind::Dir => 0,
        };
        self.stats.add_match(size);

        let found = FoundEntry {
            root: Arc::clone(&item.root),
            rel_dir: item.rel.clone(),
            name,
            kind,
            size: metadata.len(),
            modified,
            created: metadata.created().ok(),
            accessed: metadata.accessed().ok(),
        };
        let _ = self.events.send(ScanEvent::Found(found));
    }

    fn report_error(&self, path: &Path, error: &std::io::Error) {
        let _ = self.events.send(ScanEvent::ListError {
            code: error_code(error),
            path: path.to_path_buf(),
        });
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::unbounded;
    use tempfile::TempDir;

    use super::*;
    use crate::executor::Executor;

    #[test]
    fn depth_limit_and_symlinks_gate_descent() {
        let (tx, _rx) = unbounded();
        let options = ScanOptions {
            max_depth: Some(1),
            ..ScanOptions::default()
        };
        let walker = Walker::new(
            options,
            Arc::new(ScanStats::new()),
            tx,
            Arc::new(AtomicBool::new(false)),
        );

        assert!(walker.enter_dir(0, false));
        assert!(!walker.enter_dir(1, false), "depth limit");
        assert!(!walker.enter_dir(0, true), "junctions off by default");
    }

    #[test]
    fn missing_directory_reports_one_error_and_nothing_else() {
        let temp = TempDir::new().expect("temp dir");
        let missing = temp.path().join("gone");

        let (tx, rx) = unbounded();
        let stats = Arc::new(ScanStats::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let walker = Walker::new(
            ScanOptions::default(),
            Arc::clone(&stats),
            tx,
            Arc::clone(&cancel),
        );
        let executor = Executor::new(1, cancel, move |item, submitter| {
            walker.process(item, submitter)
        });

        executor
            .submit(WorkItem::for_root(missing.clone()))
            .expect("submit");
        executor.seed_done();
        assert!(executor.wait(Duration::from_secs(10)));
        assert!(!executor.join());

        let events: Vec<ScanEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ScanEvent::ListError { path, .. } if *path == missing
        ));
        assert_eq!(stats.snapshot().all_files, 0);
    }
}
