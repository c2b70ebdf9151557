use futures_util::task::AtomicWaker;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::Context;

const ACTIVE: u8 = 0;
const CANCELED: u8 = 1;
const COMPLETE: u8 = 2;

/// Cancels a registration in progress.
///
/// Handles are cheap to clone and may be moved to other tasks. Only the
/// first effective call to [`cancel`] does anything: once the registration
/// has been canceled or has completed, further calls are no-ops.
///
/// [`cancel`]: CancelHandle::cancel
#[derive(Clone, Debug)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    waker: AtomicWaker,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        CancelHandle {
            shared: Arc::new(Shared {
                state: AtomicU8::new(ACTIVE),
                waker: AtomicWaker::new(),
            }),
        }
    }

    /// Requests cancellation.
    ///
    /// Returns `true` if this call canceled the registration, in which case
    /// the registration resolves with [`Canceled`]. Returns `false` if the
    /// registration was already canceled or already had an outcome.
    ///
    /// [`Canceled`]: crate::error::Canceled
    pub fn cancel(&self) -> bool {
        let canceled = self
            .shared
            .state
            .compare_exchange(ACTIVE, CANCELED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if canceled {
            self.shared.waker.wake();
        }
        canceled
    }

    /// Returns `true` if the registration was canceled.
    pub fn is_canceled(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == CANCELED
    }

    /// Returns `true` once the registration has an outcome of any kind.
    pub fn is_finished(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) != ACTIVE
    }

    /// Registers the current task and checks for cancellation.
    pub(crate) fn poll_canceled(&self, cx: &mut Context<'_>) -> bool {
        self.shared.waker.register(cx.waker());
        self.is_canceled()
    }

    /// Claims the outcome for the registration itself.
    ///
    /// Returns `false` if a cancellation won the race, in which case the
    /// outcome must be [`Canceled`].
    ///
    /// [`Canceled`]: crate::error::Canceled
    pub(crate) fn complete(&self) -> bool {
        self.shared
            .state
            .compare_exchange(ACTIVE, COMPLETE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_idempotent() {
        let handle = CancelHandle::new();
        let clone = handle.clone();

        assert!(!handle.is_finished());
        assert!(clone.cancel());
        assert!(!handle.cancel());
        assert!(handle.is_canceled());
        assert!(!handle.complete());
    }

    #[test]
    fn cancel_after_completion_is_a_no_op() {
        let handle = CancelHandle::new();

        assert!(handle.complete());
        assert!(!handle.cancel());
        assert!(!handle.is_canceled());
        assert!(handle.is_finished());
    }
}
