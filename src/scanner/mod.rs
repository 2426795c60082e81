pub mod walker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, bounded};
use tracing::debug;

use crate::errors::AppError;
use crate::executor::Executor;
use crate::model::{FoundEntry, ScanEvent, ScanOptions, WorkItem};
use crate::progress::ProgressReporter;
use crate::scanner::walker::Walker;
use crate::stats::{ScanStats, StatsSnapshot};

/// Bounded queue prevents unbounded RAM growth when a scan matches far
/// faster than the caller consumes.
const EVENT_QUEUE_CAPACITY: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub struct ScanSinks<'a> {
    pub on_match: &'a mut dyn FnMut(FoundEntry),
    pub on_error: &'a mut dyn FnMut(i32, &Path),
    pub on_progress: &'a mut dyn FnMut(&str),
}

/// Walks every root concurrently and blocks until the traversal has
/// drained. Matches and listing errors are forwarded to the sinks from the
/// calling thread, in no particular order; progress lines are emitted at
/// most once per second while the scan is still running.
pub fn scan(
    roots: Vec<PathBuf>,
    options: ScanOptions,
    cancel: Arc<AtomicBool>,
    sinks: &mut ScanSinks<'_>,
) -> Result<StatsSnapshot, AppError> {
    let stats = Arc::new(ScanStats::new());
    let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);

    let walker = Walker::new(
        options.clone(),
        Arc::clone(&stats),
        event_tx,
        Arc::clone(&cancel),
    );
    let executor = Executor::new(
        options.worker_count,
        Arc::clone(&cancel),
        move |item: WorkItem, submitter| walker.process(item, submitter),
    );

    debug!(roots = roots.len(), ?options, "scan started");
    for root in roots {
        executor
            .submit(WorkItem::for_root(root))
            .map_err(|error| AppError::Executor(error.to_string()))?;
    }
    executor.seed_done();

    let mut reporter = ProgressReporter::default();
    loop {
        match event_rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                dispatch(event, sinks);
                reporter.tick(
                    &stats.snapshot(),
                    executor.pending_count(),
                    executor.running_count(),
                    executor.queued_count(),
                    &mut *sinks.on_progress,
                );
            }
            Err(RecvTimeoutError::Timeout) => {
                if executor.wait(Duration::ZERO) {
                    break;
                }
                reporter.tick(
                    &stats.snapshot(),
                    executor.pending_count(),
                    executor.running_count(),
                    executor.queued_count(),
                    &mut *sinks.on_progress,
                );
            }
            // All workers exited, which implies completion was signalled.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Events can still sit in the queue when completion is observed first.
    for event in event_rx.try_iter() {
        dispatch(event, sinks);
    }

    let faulted = executor.join();
    let snapshot = stats.snapshot();
    debug!(
        files = snapshot.all_files,
        dirs = snapshot.all_dirs,
        matched = snapshot.matched_files,
        faulted,
        "scan finished"
    );
    if faulted {
        return Err(AppError::Executor(
            "a worker reported a contract fault during the scan".into(),
        ));
    }
    Ok(snapshot)
}

fn dispatch(event: ScanEvent, sinks: &mut ScanSinks<'_>) {
    match event {
        ScanEvent::Found(found) => (sinks.on_match)(found),
        ScanEvent::ListError { code, path } => (sinks.on_error)(code, &path),
    }
}

/// Convenience wrapper that buffers every match and error; used by tests
/// and by callers that do not stream.
pub fn scan_collect(
    roots: Vec<PathBuf>,
    options: ScanOptions,
) -> Result<(StatsSnapshot, Vec<FoundEntry>, Vec<(i32, PathBuf)>), AppError> {
    let mut found = Vec::new();
    let mut errors = Vec::new();
    let snapshot = scan(
        roots,
        options,
        Arc::new(AtomicBool::new(false)),
        &mut ScanSinks {
            on_match: &mut |entry| found.push(entry),
            on_error: &mut |code, path| errors.push((code, path.to_path_buf())),
            on_progress: &mut |_| {},
        },
    )?;
    Ok((snapshot, found, errors))
}
