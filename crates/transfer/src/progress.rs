use std::sync::{Arc, Mutex};

use tracing::trace;

/// Callback invoked with an integer percentage in `1..=100`.
pub type ProgressCallback = Box<dyn Fn(u8) + Send + Sync>;

/// Floor percentage of `transferred` over `total`.
///
/// Returns `None` when the total is unknown (zero); never yields a value
/// above 100.
pub fn percent_of(transferred: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let pct = (u128::from(transferred) * 100 / u128::from(total)).min(100);
    Some(pct as u8)
}

/// Highest percentage byte counting alone may report.
///
/// Bytes handed to the transport are not an accepted upload; 100 is
/// reserved for [`ProgressScope::complete`].
const STREAMED_CEILING: u8 = 99;

/// Progress state for one upload, shared with the body stream.
pub(crate) struct Shared {
    callback: Option<ProgressCallback>,
    total: u64,
    transferred: u64,
    last: u8,
}

impl Shared {
    /// Adds `bytes` and reports the new percentage, capped below 100, if
    /// it increased.
    ///
    /// The callback runs under the lock, so a concurrent detach either
    /// happens before (no event) or after (event already delivered).
    pub(crate) fn advance(&mut self, bytes: u64) {
        self.transferred = self.transferred.saturating_add(bytes);
        let Some(pct) = percent_of(self.transferred, self.total) else {
            return;
        };
        self.emit(pct.min(STREAMED_CEILING));
    }

    fn emit(&mut self, pct: u8) {
        if pct <= self.last {
            return;
        }
        if let Some(cb) = &self.callback {
            self.last = pct;
            trace!(percent = pct, "upload progress");
            cb(pct);
        }
    }
}

/// Scoped progress reporting for exactly one upload.
///
/// The callback stays attached until [`complete`](Self::complete),
/// [`detach`](Self::detach) or drop, whichever comes first.
pub struct ProgressScope {
    shared: Arc<Mutex<Shared>>,
}

impl ProgressScope {
    /// Attaches `callback` to a transmission of `total` bytes.
    ///
    /// With `total == 0` the size is treated as unknown and nothing is
    /// ever reported.
    pub fn attach(total: u64, callback: ProgressCallback) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                callback: Some(callback),
                total,
                transferred: 0,
                last: 0,
            })),
        }
    }

    /// Records `bytes` as transferred.
    pub fn record(&self, bytes: u64) {
        self.shared.lock().unwrap().advance(bytes);
    }

    /// Bytes recorded so far.
    pub fn transferred(&self) -> u64 {
        self.shared.lock().unwrap().transferred
    }

    /// Whether the callback is still attached.
    pub fn is_attached(&self) -> bool {
        self.shared.lock().unwrap().callback.is_some()
    }

    /// Reports 100% (once) when the size is known, then detaches.
    pub fn complete(self) {
        let mut shared = self.shared.lock().unwrap();
        if shared.total > 0 {
            shared.emit(100);
        }
        shared.callback = None;
    }

    /// Detaches the callback without reporting completion.
    pub fn detach(&self) {
        self.shared.lock().unwrap().callback = None;
    }

    pub(crate) fn shared(&self) -> Arc<Mutex<Shared>> {
        Arc::clone(&self.shared)
    }
}

impl Drop for ProgressScope {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.callback = None;
        }
    }
}
