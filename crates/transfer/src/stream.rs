use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_util::Stream;

use crate::progress::{ProgressScope, Shared};

/// Body stream that records every chunk handed to the transport.
///
/// Chunks count as transferred when the HTTP client pulls them, which is
/// the closest observable point to bytes leaving the process.
pub struct ProgressStream<S> {
    inner: S,
    shared: Arc<Mutex<Shared>>,
}

impl<S> ProgressStream<S> {
    /// Wraps `inner`, reporting into `scope`.
    pub fn new(inner: S, scope: &ProgressScope) -> Self {
        Self {
            inner,
            shared: scope.shared(),
        }
    }
}

impl<S, T, E> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    T: AsRef<[u8]>,
{
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                let len = chunk.as_ref().len() as u64;
                if let Ok(mut shared) = this.shared.lock() {
                    shared.advance(len);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
