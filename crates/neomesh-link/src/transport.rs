//! The byte pipe to the module.

/// Outcome of handing a frame to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Every byte was written.
    Complete,
    /// Writing continues in the background; the transport raises
    /// [`LinkSignals::transmit_complete`](crate::LinkSignals::transmit_complete)
    /// (or the owner calls `on_send_complete`) when it is done.
    Pending,
}

/// A UART, serial port or test double connected to one module.
pub trait Transport {
    /// Start writing `frame`.
    fn transmit(&mut self, frame: &[u8]) -> TxStatus;

    /// Next received byte, if one is waiting.
    fn receive(&mut self) -> Option<u8>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transmit(&mut self, frame: &[u8]) -> TxStatus {
        (**self).transmit(frame)
    }

    fn receive(&mut self) -> Option<u8> {
        (**self).receive()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transmit(&mut self, frame: &[u8]) -> TxStatus {
        (**self).transmit(frame)
    }

    fn receive(&mut self) -> Option<u8> {
        (**self).receive()
    }
}
