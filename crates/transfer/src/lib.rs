//! Byte-level progress tracking for a single upload.
//!
//! A [`ProgressScope`] owns the progress callback for exactly one
//! transmission. The callback is detached when the scope completes or is
//! dropped, so no percentage can be reported after the upload settles.

mod progress;
mod stream;

pub use progress::{ProgressCallback, ProgressScope, percent_of};
pub use stream::ProgressStream;

/// Chunk size used when streaming an upload body.
///
/// Small enough to give the progress bar a useful resolution on
/// typical image sizes.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
