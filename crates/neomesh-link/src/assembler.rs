//! Receive-side frame re-assembly.

use neomesh_protocol::{is_valid_frame, AAPI_HEADER_SIZE};
use tracing::{trace, warn};

/// What to do when a byte arrives and the receive buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum OverflowPolicy {
    /// Drop the partial frame and start over with the new byte.
    #[default]
    Reset,
    /// Drop the oldest buffered byte and keep going.
    ShiftOldest,
}

/// Accumulates received bytes until they form one valid frame.
///
/// Frames always start at offset 0 of the buffer. Nothing is accepted until
/// the first [`sync`](Self::sync): before that the assembler cannot know
/// where a frame begins.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    capacity: usize,
    synced: bool,
    policy: OverflowPolicy,
}

impl FrameAssembler {
    /// Create an unsynchronised assembler holding at most `capacity` bytes.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(AAPI_HEADER_SIZE);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            synced: false,
            policy,
        }
    }

    /// Mark the stream as aligned: the next byte starts a frame.
    pub fn sync(&mut self) {
        self.synced = true;
        self.buffer.clear();
    }

    /// Forget alignment and any buffered bytes.
    pub fn reset(&mut self) {
        self.synced = false;
        self.buffer.clear();
    }

    /// Whether [`sync`](Self::sync) has been called since construction or reset.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Buffered bytes.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard buffered bytes after a frame has been consumed.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Append one byte. Returns the frame length once the buffer starts with
    /// a complete, valid frame; read it from [`buffered`](Self::buffered) and
    /// then call [`clear`](Self::clear).
    pub fn push(&mut self, byte: u8) -> Option<usize> {
        if !self.synced {
            trace!("FrameAssembler: dropping 0x{:02X} before sync", byte);
            return None;
        }
        if self.buffer.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::Reset => {
                    warn!(
                        "FrameAssembler: receive buffer full ({} bytes), dropping partial frame",
                        self.capacity
                    );
                    self.buffer.clear();
                }
                OverflowPolicy::ShiftOldest => {
                    warn!("FrameAssembler: receive buffer full, dropping oldest byte");
                    self.buffer.remove(0);
                }
            }
        }
        self.buffer.push(byte);
        is_valid_frame(&self.buffer)
    }
}
