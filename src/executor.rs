use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::error;

/// The work queue rejected a submission. The queue only closes once all
/// workers are gone, so hitting this means the executor contract was
/// violated by the caller.
#[derive(Debug, Error, Eq, PartialEq)]
#[error("work queue is closed")]
pub struct SubmitError;

/// Handle passed to the process function so workers can submit the work
/// items they discover while processing one.
pub struct Submitter<'a, T: Send + 'static> {
    shared: &'a Shared<T>,
}

impl<T: Send + 'static> Submitter<'_, T> {
    pub fn submit(&self, item: T) -> Result<(), SubmitError> {
        self.shared.submit(item)
    }
}

type ProcessFn<T> = dyn Fn(T, &Submitter<'_, T>) + Send + Sync;

enum Message<T> {
    Work(T),
    Stop,
}

/// Fixed-size worker pool over an MPMC queue that accepts new work while
/// running and detects global completion with a single pending counter.
///
/// The counter is incremented strictly before an item becomes visible to
/// any worker and decremented only after that item has been fully
/// processed, children included. It therefore reads zero exactly when no
/// work exists anywhere. One extra "setup" unit, taken at construction and
/// returned through [`Executor::seed_done`], keeps the counter positive
/// while the caller is still submitting the initial roots.
pub struct Executor<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared<T> {
    tx: Sender<Message<T>>,
    pending: AtomicU64,
    running: AtomicU64,
    cancel: Arc<AtomicBool>,
    fault: AtomicBool,
    worker_count: usize,
    done: Mutex<bool>,
    done_cv: Condvar,
}

impl<T: Send + 'static> Executor<T> {
    pub fn new<F>(worker_count: usize, cancel: Arc<AtomicBool>, process: F) -> Self
    where
        F: Fn(T, &Submitter<'_, T>) + Send + Sync + 'static,
    {
        let worker_count = worker_count.max(1);
        let (tx, rx) = unbounded();
        let shared = Arc::new(Shared {
            tx,
            // Seeded with the setup unit so a worker cannot observe a false
            // zero while roots are still being submitted.
            pending: AtomicU64::new(1),
            running: AtomicU64::new(0),
            cancel,
            fault: AtomicBool::new(false),
            worker_count,
            done: Mutex::new(false),
            done_cv: Condvar::new(),
        });
        let process: Arc<ProcessFn<T>> = Arc::new(process);

        let workers = (0..worker_count)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let rx = rx.clone();
                let process = Arc::clone(&process);
                thread::spawn(move || worker_loop(shared, rx, process))
            })
            .collect();

        Self { shared, workers }
    }

    pub fn submit(&self, item: T) -> Result<(), SubmitError> {
        self.shared.submit(item)
    }

    /// Returns the setup unit. Call exactly once, after every root has been
    /// submitted; with zero roots this completes the executor on the spot.
    pub fn seed_done(&self) {
        self.shared.finish_item();
    }

    /// Blocks until completion or until `timeout` elapses; returns whether
    /// completion was observed. A zero timeout is a pure poll.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut done = self.shared.done.lock();
        if !*done && !timeout.is_zero() {
            self.shared.done_cv.wait_for(&mut done, timeout);
        }
        *done
    }

    /// Submitted-but-not-finished items (includes the setup unit until
    /// `seed_done`). Best-effort, for progress display.
    pub fn pending_count(&self) -> u64 {
        self.shared.pending.load(Ordering::Relaxed)
    }

    pub fn running_count(&self) -> u64 {
        self.shared.running.load(Ordering::Relaxed)
    }

    pub fn queued_count(&self) -> u64 {
        self.shared.tx.len() as u64
    }

    /// Reaps the worker threads. Returns true if any worker recorded a
    /// fault while processing an item. Call after `wait` reported
    /// completion; joining earlier blocks until the scan drains.
    pub fn join(self) -> bool {
        for handle in self.workers {
            let _ = handle.join();
        }
        self.shared.fault.load(Ordering::Relaxed)
    }
}

impl<T> Shared<T> {
    fn submit(&self, item: T) -> Result<(), SubmitError> {
        // Count first: the item must never be visible while uncounted.
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Message::Work(item)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SubmitError);
        }
        Ok(())
    }

    fn finish_item(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            // This thread observed the last decrement; it alone completes.
            self.complete();
        }
    }

    fn complete(&self) {
        {
            let mut done = self.done.lock();
            *done = true;
        }
        self.done_cv.notify_all();
        // One stop marker per worker so nobody stays parked on the queue.
        for _ in 0..self.worker_count {
            let _ = self.tx.send(Message::Stop);
        }
    }
}

fn worker_loop<T: Send + 'static>(
    shared: Arc<Shared<T>>,
    rx: Receiver<Message<T>>,
    process: Arc<ProcessFn<T>>,
) {
    loop {
        let item = match rx.recv() {
            Ok(Message::Work(item)) => item,
            Ok(Message::Stop) | Err(_) => break,
        };

        shared.running.fetch_add(1, Ordering::Relaxed);
        if !shared.cancel.load(Ordering::Relaxed) {
            let submitter = Submitter { shared: &shared };
            if catch_unwind(AssertUnwindSafe(|| process(item, &submitter))).is_err() {
                // A fault in one item must not kill the pool or wedge wait().
                shared.fault.store(true, Ordering::Relaxed);
                error!("worker fault while processing a work item");
            }
        }
        shared.running.fetch_sub(1, Ordering::Relaxed);
        // Decrement only now, after any children were submitted and counted.
        shared.finish_item();
    }
}
