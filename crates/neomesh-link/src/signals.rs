//! Line signals raised outside the poll loop.
//!
//! Interrupt handlers or line watchers only ever set these flags. The poll
//! loop owning the [`LinkContext`](crate::LinkContext) consumes them.

use std::sync::atomic::{AtomicBool, Ordering};

/// Pending edge notifications for one link.
#[derive(Debug, Default)]
pub struct LinkSignals {
    wake: AtomicBool,
    ready_to_send: AtomicBool,
    transmit_complete: AtomicBool,
}

impl LinkSignals {
    /// Create with no pending signals.
    pub fn new() -> Self {
        Self::default()
    }

    /// The module asserted nWU: realign the receive buffer.
    pub fn wake(&self) {
        self.wake.store(true, Ordering::Release);
    }

    /// The module asserted CTS: it will accept the next frame.
    pub fn ready_to_send(&self) {
        self.ready_to_send.store(true, Ordering::Release);
    }

    /// The transport finished writing a pending frame.
    pub fn transmit_complete(&self) {
        self.transmit_complete.store(true, Ordering::Release);
    }

    /// Consume a pending wake.
    pub fn take_wake(&self) -> bool {
        self.wake.swap(false, Ordering::AcqRel)
    }

    /// Consume a pending ready-to-send.
    pub fn take_ready_to_send(&self) -> bool {
        self.ready_to_send.swap(false, Ordering::AcqRel)
    }

    /// Consume a pending transmit completion.
    pub fn take_transmit_complete(&self) -> bool {
        self.transmit_complete.swap(false, Ordering::AcqRel)
    }

    /// Drop every pending signal.
    pub fn clear(&self) {
        self.wake.store(false, Ordering::Release);
        self.ready_to_send.store(false, Ordering::Release);
        self.transmit_complete.store(false, Ordering::Release);
    }
}
