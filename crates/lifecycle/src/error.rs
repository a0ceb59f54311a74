//! Lifecycle error types.

use std::path::PathBuf;

/// Errors produced while preparing a local file selection.
///
/// Remote failures never appear here: the controller turns them into
/// notifications.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
}
