//! AAPI frame validation.
//!
//! Every application frame carries a two byte header followed by the body:
//!
//! ```text
//! +------+--------+-------------------+
//! | type | length | body[0..length]   |
//! +------+--------+-------------------+
//! ```
//!
//! `length` counts the bytes after itself. Frames are always assumed to
//! start at offset 0 of the receive buffer; there is no start marker to
//! resynchronise on, so the only defence against garbage is the table of
//! legal lengths per known message type.

use crate::constants::*;

/// Check whether `kind` may carry a body of `length` bytes.
///
/// Known inbound types are range checked. Any other type passes as long as
/// the length is nonzero, so unrecognised messages still reach the raw
/// handler.
pub fn declared_length_ok(kind: u8, length: u8) -> bool {
    if length == 0 {
        return false;
    }
    match kind {
        MSG_HOST_ACK | MSG_HOST_NACK => length == HOST_ACK_LENGTH,
        MSG_HOST_DATA => length > HOST_DATA_HEADER_SIZE,
        MSG_HOST_DATA_HAPA => length > HOST_DATA_HAPA_HEADER_SIZE,
        MSG_HOST_UAPP_DATA => length > HOST_UAPP_DATA_HEADER_SIZE,
        MSG_HOST_UAPP_DATA_HAPA => length > HOST_UAPP_DATA_HAPA_HEADER_SIZE,
        MSG_HOST_UAPP_SENT | MSG_HOST_UAPP_DROPPED => length == HOST_UAPP_STATUS_LENGTH,
        MSG_NODE_INFO_REPLY => length == NODE_INFO_REPLY_LENGTH,
        MSG_NEIGHBOR_LIST_REPLY => {
            length == NEIGHBOR_LIST_REPLY_LENGTH || length == NEIGHBOR_LIST_REPLY_EX_LENGTH
        }
        MSG_NET_CMD_REPLY => length >= NET_CMD_REPLY_HEADER_SIZE,
        MSG_ROUTE_INFO_REPLY => length == ROUTE_INFO_REPLY_LENGTH,
        MSG_WES_STATUS => length == WES_STATUS_LENGTH,
        MSG_WES_SETUP_REQUEST => length == WES_SETUP_REQUEST_LENGTH,
        _ => true,
    }
}

/// Determine whether `buffer` begins with one complete, valid frame.
///
/// Returns the total frame length (header included) when it does, or `None`
/// when the header is invalid or more bytes are needed. The assembler keeps
/// accumulating in both cases.
pub fn is_valid_frame(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < AAPI_HEADER_SIZE {
        return None;
    }
    let kind = buffer[0];
    let length = buffer[1];
    if !declared_length_ok(kind, length) {
        return None;
    }
    let total = usize::from(length) + AAPI_HEADER_SIZE;
    if total > buffer.len() {
        return None;
    }
    Some(total)
}

/// A validated frame borrowed from a receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Validate `buffer` and view its leading frame.
    pub fn parse(buffer: &'a [u8]) -> Option<Self> {
        let total = is_valid_frame(buffer)?;
        Some(Frame {
            bytes: &buffer[..total],
        })
    }

    /// Message type tag.
    pub fn kind(&self) -> u8 {
        self.bytes[0]
    }

    /// Declared length (bytes after the header).
    pub fn declared_len(&self) -> u8 {
        self.bytes[1]
    }

    /// Body after the two byte header.
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[AAPI_HEADER_SIZE..]
    }

    /// The whole frame including the header.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_two_bytes() {
        assert_eq!(is_valid_frame(&[]), None);
        assert_eq!(is_valid_frame(&[MSG_HOST_ACK]), None);
    }

    #[test]
    fn test_zero_length_always_invalid() {
        assert_eq!(is_valid_frame(&[0x77, 0x00]), None);
        assert_eq!(is_valid_frame(&[MSG_HOST_DATA, 0x00]), None);
    }

    #[test]
    fn test_host_ack_complete() {
        assert_eq!(is_valid_frame(&[MSG_HOST_ACK, 0x02, 0x00, 0x07]), Some(4));
    }

    #[test]
    fn test_incomplete_waits() {
        assert_eq!(is_valid_frame(&[MSG_HOST_ACK, 0x02, 0x00]), None);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        assert_eq!(is_valid_frame(&[MSG_WES_STATUS, 0x01, 0x02, 0xAA, 0xBB]), Some(3));
    }

    #[test]
    fn test_unknown_type_passes_through() {
        assert_eq!(is_valid_frame(&[0x7E, 0x03, 1, 2, 3]), Some(5));
        assert_eq!(is_valid_frame(&[0x7E, 0x03, 1, 2]), None);
    }

    #[test]
    fn test_wrong_length_for_every_known_type() {
        let cases: &[(u8, u8)] = &[
            (MSG_HOST_ACK, 3),
            (MSG_HOST_NACK, 1),
            (MSG_HOST_DATA, HOST_DATA_HEADER_SIZE),
            (MSG_HOST_DATA_HAPA, HOST_DATA_HAPA_HEADER_SIZE),
            (MSG_HOST_UAPP_DATA, HOST_UAPP_DATA_HEADER_SIZE),
            (MSG_HOST_UAPP_DATA_HAPA, HOST_UAPP_DATA_HAPA_HEADER_SIZE),
            (MSG_HOST_UAPP_SENT, 5),
            (MSG_HOST_UAPP_DROPPED, 3),
            (MSG_NODE_INFO_REPLY, 7),
            (MSG_NEIGHBOR_LIST_REPLY, 37),
            (MSG_NET_CMD_REPLY, 2),
            (MSG_ROUTE_INFO_REPLY, 15),
            (MSG_WES_STATUS, 2),
            (MSG_WES_SETUP_REQUEST, 5),
        ];
        for &(kind, length) in cases {
            // Plenty of bytes available, so only the length rule can reject.
            let mut buf = vec![kind, length];
            buf.resize(64, 0);
            assert_eq!(
                is_valid_frame(&buf),
                None,
                "type 0x{kind:02X} with length {length} should be rejected"
            );
        }
    }

    #[test]
    fn test_neighbor_list_accepts_both_lengths() {
        let mut short = vec![MSG_NEIGHBOR_LIST_REPLY, NEIGHBOR_LIST_REPLY_LENGTH];
        short.resize(2 + 36, 0xFF);
        assert_eq!(is_valid_frame(&short), Some(38));

        let mut long = vec![MSG_NEIGHBOR_LIST_REPLY, NEIGHBOR_LIST_REPLY_EX_LENGTH];
        long.resize(2 + 39, 0xFF);
        assert_eq!(is_valid_frame(&long), Some(41));
    }

    #[test]
    fn test_frame_view() {
        let buf = [MSG_HOST_ACK, 0x02, 0x12, 0x34, 0x99];
        let frame = Frame::parse(&buf).expect("valid frame");
        assert_eq!(frame.kind(), MSG_HOST_ACK);
        assert_eq!(frame.declared_len(), 2);
        assert_eq!(frame.body(), &[0x12, 0x34]);
        assert_eq!(frame.as_bytes().len(), 4);
    }
}
