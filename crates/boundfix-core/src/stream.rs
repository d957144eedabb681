// ── Reactive state stream ──
//
// Subscription handle for consuming store snapshots.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::state::StoreState;

/// A subscription to the store's state.
///
/// Provides both point-in-time snapshot access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct StateStream {
    current: StoreState,
    receiver: watch::Receiver<StoreState>,
}

impl StateStream {
    pub(crate) fn new(mut receiver: watch::Receiver<StoreState>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The snapshot seen at creation or by the last `changed()`.
    pub fn current(&self) -> &StoreState {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> StoreState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<StoreState> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Wait until a snapshot satisfies `predicate`, starting with the
    /// latest one. Returns `None` if the store has been dropped first.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&StoreState) -> bool,
    ) -> Option<StoreState> {
        let snap = self
            .receiver
            .wait_for(|state| predicate(state))
            .await
            .ok()?
            .clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The first item is the latest snapshot.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct StateWatchStream {
    inner: WatchStream<StoreState>,
}

impl Stream for StateWatchStream {
    type Item = StoreState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
