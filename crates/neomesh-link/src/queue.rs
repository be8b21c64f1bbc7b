//! Single-slot transmit queue.

use neomesh_protocol::{ApiError, ApiResult};

/// Caller context handed back with the write-completion notification.
/// The link never inspects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Token(pub u64);

/// Holds at most one encoded frame waiting for the module's CTS.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    buffer: Vec<u8>,
    capacity: usize,
    token: Token,
    transmitting: bool,
}

impl OutboundQueue {
    /// Create an empty queue for frames of at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            token: Token::default(),
            transmitting: false,
        }
    }

    /// Largest frame the slot accepts, in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the slot is free.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether the current frame has been handed to the transport but not
    /// yet reported complete.
    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    /// Token of the frame in the slot, if any.
    pub fn pending(&self) -> Option<Token> {
        (!self.buffer.is_empty()).then_some(self.token)
    }

    /// `Ok` when idle, [`ApiError::Busy`] while a frame occupies the slot.
    pub fn status(&self) -> ApiResult<()> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Busy)
        }
    }

    /// Place `frame` in the slot.
    pub fn enqueue(&mut self, frame: &[u8], token: Token) -> ApiResult<()> {
        if frame.is_empty() {
            return Err(ApiError::NoArguments);
        }
        if !self.buffer.is_empty() {
            return Err(ApiError::AlreadyEnqueued);
        }
        if frame.len() > self.capacity {
            return Err(ApiError::PayloadTooLarge {
                max: self.capacity,
                actual: frame.len(),
            });
        }
        self.buffer.extend_from_slice(frame);
        self.token = token;
        Ok(())
    }

    /// Empty the slot without notification. Refused once bytes have started
    /// flowing out.
    pub fn cancel(&mut self) -> ApiResult<()> {
        if self.transmitting {
            return Err(ApiError::TransmitPending);
        }
        self.buffer.clear();
        self.token = Token::default();
        Ok(())
    }

    /// The armed frame, if it is ready to go out and not already going.
    pub fn begin_transmit(&mut self) -> Option<&[u8]> {
        if self.buffer.is_empty() || self.transmitting {
            return None;
        }
        self.transmitting = true;
        Some(&self.buffer)
    }

    /// Release the slot after the transport finished, returning the token
    /// and the frame that was written.
    pub fn finish(&mut self) -> Option<(Token, Vec<u8>)> {
        if self.buffer.is_empty() {
            return None;
        }
        self.transmitting = false;
        let token = std::mem::take(&mut self.token);
        let frame = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.capacity));
        Some((token, frame))
    }

    /// Drop everything, including a frame in transmission.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.token = Token::default();
        self.transmitting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_enqueue_fails() {
        let mut queue = OutboundQueue::new(32);
        queue.enqueue(&[0x08, 0x00], Token(1)).unwrap();
        assert_eq!(queue.enqueue(&[0x09, 0x00], Token(2)), Err(ApiError::AlreadyEnqueued));
        assert_eq!(queue.status(), Err(ApiError::Busy));
    }

    #[test]
    fn test_cancel_frees_slot() {
        let mut queue = OutboundQueue::new(32);
        queue.enqueue(&[0x08, 0x00], Token(1)).unwrap();
        assert_eq!(queue.pending(), Some(Token(1)));
        queue.cancel().unwrap();
        assert_eq!(queue.pending(), None);
        assert!(queue.is_empty());
        assert_eq!(queue.status(), Ok(()));
        queue.enqueue(&[0x09, 0x00], Token(2)).unwrap();
    }

    #[test]
    fn test_cancel_refused_while_transmitting() {
        let mut queue = OutboundQueue::new(32);
        queue.enqueue(&[0x08, 0x00], Token(1)).unwrap();
        assert_eq!(queue.begin_transmit(), Some(&[0x08u8, 0x00][..]));
        assert_eq!(queue.begin_transmit(), None);
        assert_eq!(queue.cancel(), Err(ApiError::TransmitPending));
        assert_eq!(queue.finish(), Some((Token(1), vec![0x08, 0x00])));
        assert!(queue.is_empty());
        assert!(!queue.is_transmitting());
    }

    #[test]
    fn test_frame_larger_than_slot() {
        let mut queue = OutboundQueue::new(4);
        assert_eq!(
            queue.enqueue(&[0; 5], Token(0)),
            Err(ApiError::PayloadTooLarge { max: 4, actual: 5 })
        );
        assert_eq!(queue.enqueue(&[], Token(0)), Err(ApiError::NoArguments));
    }
}
