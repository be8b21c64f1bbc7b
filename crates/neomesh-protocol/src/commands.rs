//! Commands the host sends to the module.
//!
//! Commands are validated in full before a single byte is produced, so a
//! rejected command never leaves a half-written frame behind.

use bytes::BufMut;

use crate::constants::*;
use crate::error::{ApiError, ApiResult};
use crate::types::*;

/// Commands that can be sent to the module.
///
/// Variable payloads mirror the module's host API: `payload_length` is the
/// declared length and `payload` the bytes behind it. Use the constructors
/// to keep the two consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Unacknowledged data to another node (0x02).
    SendUnacknowledged {
        /// Destination node, must be nonzero.
        dest_node_id: u16,
        /// Destination port, 0..=4.
        dest_port: u8,
        /// Application sequence number; only the low 12 bits are sent.
        app_seq_no: u16,
        /// Declared payload length.
        payload_length: u8,
        /// Payload bytes.
        payload: Option<&'a [u8]>,
    },

    /// Acknowledged data to another node (0x03).
    SendAcknowledged {
        /// Destination node, must be nonzero.
        dest_node_id: u16,
        /// Destination port, 0..=4.
        dest_port: u8,
        /// Declared payload length.
        payload_length: u8,
        /// Payload bytes.
        payload: Option<&'a [u8]>,
    },

    /// Ask the attached module for its node info (0x08).
    NodeInfoRequest,

    /// Ask the attached module for its neighbor list (0x09).
    NeighborListRequest,

    /// Network command to another node (0x0a).
    NetCmd {
        /// Destination node.
        dest_node_id: u16,
        /// Network command.
        cmd: NetCmd,
        /// Declared payload length.
        payload_length: u8,
        /// Payload bytes.
        payload: Option<&'a [u8]>,
    },

    /// Ask the attached module for its route bitmap (0x0c).
    RouteInfoRequest,

    /// Wireless Easy Setup command (0x10).
    WesCmd {
        /// Command.
        cmd: WesCmd,
    },

    /// Answer a WES setup request (0x11).
    WesResponse {
        /// UID of the module being configured.
        uid: Uid,
        /// Node id to assign.
        node_id: u16,
        /// Application settings handed to the new node.
        app_settings: [u8; WES_APP_SETTINGS_LENGTH],
    },

    /// Alternative mode command (0x20).
    AltCmd {
        /// Command.
        cmd: AltCmd,
    },

    /// A pre-framed byte sequence written as is.
    Raw {
        /// Frame bytes.
        bytes: &'a [u8],
    },
}

/// Declared length must fit under `max` and be backed by enough bytes.
fn checked_payload(length: u8, payload: Option<&[u8]>, max: usize) -> ApiResult<&[u8]> {
    let length = usize::from(length);
    if length > max {
        return Err(ApiError::PayloadTooLarge { max, actual: length });
    }
    if length == 0 {
        return Ok(&[]);
    }
    match payload {
        Some(bytes) if bytes.len() >= length => Ok(&bytes[..length]),
        _ => Err(ApiError::NullPayload),
    }
}

fn check_destination(dest_node_id: u16, dest_port: u8) -> ApiResult<()> {
    if dest_node_id == INVALID_NODE_ID {
        return Err(ApiError::InvalidNodeId);
    }
    if dest_port > MAX_PORT {
        return Err(ApiError::InvalidPort(dest_port));
    }
    Ok(())
}

/// Payload room left in a transmit buffer of `tx_capacity` bytes.
pub fn max_payload(tx_capacity: usize, preamble: u8) -> usize {
    tx_capacity
        .saturating_sub(AAPI_HEADER_SIZE + usize::from(preamble))
        .min(usize::from(u8::MAX - preamble))
}

fn declared(payload: &[u8]) -> u8 {
    u8::try_from(payload.len()).unwrap_or(u8::MAX)
}

impl<'a> Command<'a> {
    /// Acknowledged send of `payload`.
    pub fn send_acknowledged(dest_node_id: u16, dest_port: u8, payload: &'a [u8]) -> Self {
        Command::SendAcknowledged {
            dest_node_id,
            dest_port,
            payload_length: declared(payload),
            payload: Some(payload),
        }
    }

    /// Unacknowledged send of `payload`.
    pub fn send_unacknowledged(
        dest_node_id: u16,
        dest_port: u8,
        app_seq_no: u16,
        payload: &'a [u8],
    ) -> Self {
        Command::SendUnacknowledged {
            dest_node_id,
            dest_port,
            app_seq_no,
            payload_length: declared(payload),
            payload: Some(payload),
        }
    }

    /// Network command carrying `payload`.
    pub fn net_cmd(dest_node_id: u16, cmd: NetCmd, payload: &'a [u8]) -> Self {
        Command::NetCmd {
            dest_node_id,
            cmd,
            payload_length: declared(payload),
            payload: Some(payload),
        }
    }

    /// Get the message type of this command.
    pub fn code(&self) -> Option<u8> {
        match self {
            Command::SendUnacknowledged { .. } => Some(MSG_SEND_UNACKNOWLEDGED),
            Command::SendAcknowledged { .. } => Some(MSG_SEND_ACKNOWLEDGED),
            Command::NodeInfoRequest => Some(MSG_NODE_INFO_REQUEST),
            Command::NeighborListRequest => Some(MSG_NEIGHBOR_LIST_REQUEST),
            Command::NetCmd { .. } => Some(MSG_NET_CMD),
            Command::RouteInfoRequest => Some(MSG_ROUTE_INFO_REQUEST),
            Command::WesCmd { .. } => Some(MSG_WES_CMD),
            Command::WesResponse { .. } => Some(MSG_WES_RESPONSE),
            Command::AltCmd { .. } => Some(MSG_ALT_CMD),
            Command::Raw { .. } => None,
        }
    }

    /// Validate and encode the command for a transmit buffer of
    /// `tx_capacity` bytes.
    ///
    /// The capacity bounds variable-length payloads and raw frames; the fixed
    /// layouts are always produced whole.
    pub fn encode(&self, tx_capacity: usize) -> ApiResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(tx_capacity);

        match self {
            Command::SendUnacknowledged {
                dest_node_id,
                dest_port,
                app_seq_no,
                payload_length,
                payload,
            } => {
                check_destination(*dest_node_id, *dest_port)?;
                let max = max_payload(tx_capacity, SEND_UNACK_PREAMBLE);
                let payload = checked_payload(*payload_length, *payload, max)?;
                buf.put_u8(MSG_SEND_UNACKNOWLEDGED);
                buf.put_u8(SEND_UNACK_PREAMBLE + *payload_length);
                buf.put_u16(*dest_node_id);
                buf.put_u8(*dest_port);
                buf.put_u16(*app_seq_no & APP_SEQ_NO_MASK);
                buf.put_slice(payload);
            }

            Command::SendAcknowledged {
                dest_node_id,
                dest_port,
                payload_length,
                payload,
            } => {
                check_destination(*dest_node_id, *dest_port)?;
                let max = max_payload(tx_capacity, SEND_ACK_PREAMBLE);
                let payload = checked_payload(*payload_length, *payload, max)?;
                buf.put_u8(MSG_SEND_ACKNOWLEDGED);
                buf.put_u8(SEND_ACK_PREAMBLE + *payload_length);
                buf.put_u16(*dest_node_id);
                buf.put_u8(*dest_port);
                buf.put_slice(payload);
            }

            Command::NodeInfoRequest => {
                buf.put_u8(MSG_NODE_INFO_REQUEST);
                buf.put_u8(0);
            }

            Command::NeighborListRequest => {
                buf.put_u8(MSG_NEIGHBOR_LIST_REQUEST);
                buf.put_u8(0);
            }

            Command::NetCmd {
                dest_node_id,
                cmd,
                payload_length,
                payload,
            } => {
                let max = max_payload(tx_capacity, NET_CMD_PREAMBLE);
                let payload = checked_payload(*payload_length, *payload, max)?;
                buf.put_u8(MSG_NET_CMD);
                buf.put_u8(NET_CMD_PREAMBLE + *payload_length);
                buf.put_u16(*dest_node_id);
                buf.put_u8((*cmd).into());
                buf.put_slice(payload);
            }

            Command::RouteInfoRequest => {
                buf.put_u8(MSG_ROUTE_INFO_REQUEST);
                buf.put_u8(0);
            }

            Command::WesCmd { cmd } => {
                buf.put_u8(MSG_WES_CMD);
                buf.put_u8(WES_CMD_LENGTH);
                buf.put_u8(*cmd as u8);
            }

            Command::WesResponse {
                uid,
                node_id,
                app_settings,
            } => {
                buf.put_u8(MSG_WES_RESPONSE);
                buf.put_u8(WES_RESPONSE_LENGTH);
                buf.put_slice(uid.as_bytes());
                buf.put_u16(*node_id);
                buf.put_slice(app_settings);
            }

            Command::AltCmd { cmd } => {
                buf.put_u8(MSG_ALT_CMD);
                buf.put_u8(ALT_CMD_LENGTH);
                buf.put_u8(*cmd as u8);
            }

            Command::Raw { bytes } => {
                if bytes.is_empty() {
                    return Err(ApiError::NoArguments);
                }
                if bytes.len() > tx_capacity {
                    return Err(ApiError::PayloadTooLarge {
                        max: tx_capacity,
                        actual: bytes.len(),
                    });
                }
                buf.put_slice(bytes);
            }
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_acknowledged_layout() {
        let frame = Command::send_acknowledged(0x1234, 2, &[0xAA, 0xBB])
            .encode(DEFAULT_TX_BUFFER_SIZE)
            .unwrap();
        assert_eq!(frame, vec![0x03, 0x05, 0x12, 0x34, 0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn test_send_unacknowledged_masks_seq_no() {
        let frame = Command::send_unacknowledged(0x0001, 0, 0xF123, &[0x7F])
            .encode(DEFAULT_TX_BUFFER_SIZE)
            .unwrap();
        assert_eq!(frame, vec![0x02, 0x06, 0x00, 0x01, 0x00, 0x01, 0x23, 0x7F]);
    }

    #[test]
    fn test_node_id_zero_rejected() {
        let cmd = Command::send_acknowledged(0, 1, &[1]);
        assert_eq!(cmd.encode(DEFAULT_TX_BUFFER_SIZE), Err(ApiError::InvalidNodeId));
        let cmd = Command::send_unacknowledged(0, 1, 0, &[1]);
        assert_eq!(cmd.encode(DEFAULT_TX_BUFFER_SIZE), Err(ApiError::InvalidNodeId));
    }

    #[test]
    fn test_port_out_of_range() {
        let cmd = Command::send_acknowledged(5, 5, &[]);
        assert_eq!(cmd.encode(DEFAULT_TX_BUFFER_SIZE), Err(ApiError::InvalidPort(5)));
        assert!(Command::send_acknowledged(5, 4, &[]).encode(DEFAULT_TX_BUFFER_SIZE).is_ok());
    }

    #[test]
    fn test_payload_limit_per_type() {
        // 32 byte buffer: 27 bytes for acknowledged, 25 for unacknowledged.
        let payload = [0u8; 27];
        let ack = Command::send_acknowledged(1, 0, &payload).encode(32).unwrap();
        assert_eq!(ack.len(), 32);

        let err = Command::send_unacknowledged(1, 0, 0, &payload).encode(32);
        assert_eq!(err, Err(ApiError::PayloadTooLarge { max: 25, actual: 27 }));
        let ok = Command::send_unacknowledged(1, 0, 0, &payload[..25]).encode(32).unwrap();
        assert_eq!(ok.len(), 32);
    }

    #[test]
    fn test_null_payload() {
        let cmd = Command::SendAcknowledged {
            dest_node_id: 1,
            dest_port: 0,
            payload_length: 3,
            payload: None,
        };
        assert_eq!(cmd.encode(DEFAULT_TX_BUFFER_SIZE), Err(ApiError::NullPayload));

        let cmd = Command::NetCmd {
            dest_node_id: 1,
            cmd: NetCmd::Wake,
            payload_length: 4,
            payload: Some(&[1u8, 2][..]),
        };
        assert_eq!(cmd.encode(DEFAULT_TX_BUFFER_SIZE), Err(ApiError::NullPayload));
    }

    #[test]
    fn test_declared_length_selects_prefix() {
        let cmd = Command::SendAcknowledged {
            dest_node_id: 9,
            dest_port: 1,
            payload_length: 1,
            payload: Some(&[0x10u8, 0x20][..]),
        };
        assert_eq!(
            cmd.encode(DEFAULT_TX_BUFFER_SIZE).unwrap(),
            vec![0x03, 0x04, 0x00, 0x09, 0x01, 0x10]
        );
    }

    #[test]
    fn test_requests_have_empty_body() {
        for (cmd, code) in [
            (Command::NodeInfoRequest, MSG_NODE_INFO_REQUEST),
            (Command::NeighborListRequest, MSG_NEIGHBOR_LIST_REQUEST),
            (Command::RouteInfoRequest, MSG_ROUTE_INFO_REQUEST),
        ] {
            assert_eq!(cmd.encode(DEFAULT_TX_BUFFER_SIZE).unwrap(), vec![code, 0]);
            assert_eq!(cmd.code(), Some(code));
        }
    }

    #[test]
    fn test_net_cmd_layout() {
        let frame = Command::net_cmd(0x0203, NetCmd::Hibernate, &[])
            .encode(DEFAULT_TX_BUFFER_SIZE)
            .unwrap();
        assert_eq!(frame, vec![MSG_NET_CMD, 3, 0x02, 0x03, 2]);
    }

    #[test]
    fn test_wes_and_alt_commands() {
        let wes = Command::WesCmd { cmd: WesCmd::StartServer };
        assert_eq!(wes.encode(DEFAULT_TX_BUFFER_SIZE).unwrap(), vec![MSG_WES_CMD, 1, 1]);
        let alt = Command::AltCmd { cmd: AltCmd::Start };
        assert_eq!(alt.encode(DEFAULT_TX_BUFFER_SIZE).unwrap(), vec![MSG_ALT_CMD, 1, 1]);
    }

    #[test]
    fn test_wes_response_layout() {
        let mut app_settings = [0u8; WES_APP_SETTINGS_LENGTH];
        app_settings[0] = 0xA5;
        app_settings[23] = 0x5A;
        let frame = Command::WesResponse {
            uid: Uid::from_u64(0x01_0203_0405),
            node_id: 0x00FE,
            app_settings,
        }
        .encode(DEFAULT_TX_BUFFER_SIZE)
        .unwrap();
        assert_eq!(frame.len(), 2 + usize::from(WES_RESPONSE_LENGTH));
        assert_eq!(&frame[..9], &[MSG_WES_RESPONSE, 31, 1, 2, 3, 4, 5, 0x00, 0xFE]);
        assert_eq!(frame[9], 0xA5);
        assert_eq!(frame[32], 0x5A);
    }

    #[test]
    fn test_raw_frames() {
        assert_eq!(
            Command::Raw { bytes: &[] }.encode(DEFAULT_TX_BUFFER_SIZE),
            Err(ApiError::NoArguments)
        );
        assert_eq!(
            Command::Raw { bytes: &[SAPI_MODE_SWITCH] }.encode(DEFAULT_TX_BUFFER_SIZE),
            Ok(vec![SAPI_MODE_SWITCH])
        );
        let big = [0u8; 40];
        assert_eq!(
            Command::Raw { bytes: &big }.encode(32),
            Err(ApiError::PayloadTooLarge { max: 32, actual: 40 })
        );
    }
}
