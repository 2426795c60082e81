use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid filename pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid duration {input:?}: {reason}")]
    Duration { input: String, reason: String },

    #[error("roots file not found: {0:?}")]
    RootsFile(PathBuf),

    #[error("executor error: {0}")]
    Executor(String),
}
