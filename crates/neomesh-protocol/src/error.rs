//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding a frame into a typed message.
///
/// These never reach API callers: malformed inbound frames are dropped by the
/// link layer. They exist so decoders can refuse short input instead of
/// indexing out of bounds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short to hold the message.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Frame carries a different message type.
    #[error("unexpected message type: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedType {
        /// Type the decoder handles.
        expected: u8,
        /// Type found in the frame.
        actual: u8,
    },

    /// Declared length does not fit the message type.
    #[error("invalid length {length} for message type 0x{kind:02X}")]
    InvalidLength {
        /// Message type.
        kind: u8,
        /// Declared length.
        length: u8,
    },

    /// Configuration command data does not fit a SAPI frame.
    #[error("SAPI data too long: maximum {max} bytes, got {actual}")]
    SapiDataTooLong {
        /// Largest data section a frame can carry.
        max: usize,
        /// Requested data length.
        actual: usize,
    },
}

/// Errors returned synchronously by outbound API calls.
///
/// Validation errors leave the link untouched; contention errors mean the
/// single transmit slot is occupied and the caller has to wait for the
/// write-completion notification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Destination node id is 0.
    #[error("node id cannot be 0")]
    InvalidNodeId,

    /// Destination port is out of range.
    #[error("port {0} out of range (0..=4)")]
    InvalidPort(u8),

    /// Payload does not fit the transmit buffer.
    #[error("payload too large: maximum {max} bytes, got {actual}")]
    PayloadTooLarge {
        /// Largest payload this message type can carry.
        max: usize,
        /// Requested payload length.
        actual: usize,
    },

    /// A payload length was given without the payload bytes.
    #[error("payload length supplied but no payload")]
    NullPayload,

    /// A frame is already waiting to be written to the UART.
    #[error("a message is already enqueued")]
    AlreadyEnqueued,

    /// Nothing to send.
    #[error("no arguments")]
    NoArguments,

    /// The transmit slot is occupied.
    #[error("busy")]
    Busy,

    /// Bytes of the current frame are still being written.
    #[error("transmit pending")]
    TransmitPending,
}

impl ApiError {
    /// Numeric status code as used by the module vendor's host API.
    ///
    /// `0` is reserved for success and never returned here.
    pub fn code(&self) -> u8 {
        match self {
            ApiError::InvalidNodeId => 1,
            ApiError::InvalidPort(_) => 2,
            ApiError::PayloadTooLarge { .. } => 3,
            ApiError::AlreadyEnqueued => 4,
            ApiError::NullPayload => 5,
            ApiError::NoArguments => 6,
            ApiError::Busy => 7,
            ApiError::TransmitPending => 8,
        }
    }
}

/// Result type alias for outbound API calls.
pub type ApiResult<T> = Result<T, ApiError>;
