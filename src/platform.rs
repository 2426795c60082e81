use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::AtomicBool;

#[cfg(unix)]
use std::sync::atomic::Ordering;

static CANCEL: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Routes SIGINT into the shared cancel flag so an interrupted scan winds
/// down cooperatively and still prints the statistics gathered so far.
/// Only the first installed flag wins; later calls are ignored.
pub fn install_ctrl_c_handler(flag: Arc<AtomicBool>) {
    let _ = CANCEL.set(flag);

    #[cfg(unix)]
    // SAFETY: the handler only performs an atomic store, which is
    // async-signal-safe; `handle_signal` matches the expected signature.
    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
    }
}

#[cfg(unix)]
extern "C" fn handle_signal(_signal: libc::c_int) {
    if let Some(flag) = CANCEL.get() {
        flag.store(true, Ordering::Relaxed);
    }
}

/// Where listing errors are mirrored, next to the console output.
pub fn error_log_path() -> PathBuf {
    std::env::temp_dir().join("pfind.err.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_log_lives_in_the_temp_dir() {
        let path = error_log_path();
        assert!(path.starts_with(std::env::temp_dir()));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("pfind.err.txt"));
    }
}
