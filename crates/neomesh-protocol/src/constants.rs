//! Protocol constants
//!
//! Message type tags, fixed lengths and limits of the AAPI (application) and
//! SAPI (system/configuration) protocols spoken by NeoCortec NeoMesh modules.

// ============================================================================
// AAPI Framing
// ============================================================================

/// Every AAPI frame starts with `{type, length}`.
pub const AAPI_HEADER_SIZE: usize = 2;

/// Default receive buffer size of a link.
pub const DEFAULT_RX_BUFFER_SIZE: usize = 255;
/// Default transmit buffer size of a link.
pub const DEFAULT_TX_BUFFER_SIZE: usize = 32;

// ============================================================================
// Outbound Message Types (host → module)
// ============================================================================

/// Unacknowledged packet.
pub const MSG_SEND_UNACKNOWLEDGED: u8 = 0x02;
/// Acknowledged packet.
pub const MSG_SEND_ACKNOWLEDGED: u8 = 0x03;
/// Node info request.
pub const MSG_NODE_INFO_REQUEST: u8 = 0x08;
/// Neighbor list request.
pub const MSG_NEIGHBOR_LIST_REQUEST: u8 = 0x09;
/// Network command.
pub const MSG_NET_CMD: u8 = 0x0a;
/// Route info request.
pub const MSG_ROUTE_INFO_REQUEST: u8 = 0x0c;
/// WES command.
pub const MSG_WES_CMD: u8 = 0x10;
/// WES setup response.
pub const MSG_WES_RESPONSE: u8 = 0x11;
/// ALT command.
pub const MSG_ALT_CMD: u8 = 0x20;

// ============================================================================
// Inbound Message Types (module → host)
// ============================================================================

/// Acknowledge for a previously sent packet.
pub const MSG_HOST_ACK: u8 = 0x50;
/// Non-acknowledge for a previously sent packet.
pub const MSG_HOST_NACK: u8 = 0x51;
/// Host data.
pub const MSG_HOST_DATA: u8 = 0x52;
/// Host data with high precision packet age.
pub const MSG_HOST_DATA_HAPA: u8 = 0x53;
/// Unacknowledged host data.
pub const MSG_HOST_UAPP_DATA: u8 = 0x54;
/// Unacknowledged host data with high precision packet age.
pub const MSG_HOST_UAPP_DATA_HAPA: u8 = 0x55;
/// Unacknowledged packet was sent.
pub const MSG_HOST_UAPP_SENT: u8 = 0x56;
/// Unacknowledged packet was dropped.
pub const MSG_HOST_UAPP_DROPPED: u8 = 0x57;
/// Node info reply.
pub const MSG_NODE_INFO_REPLY: u8 = 0x58;
/// Neighbor list reply.
pub const MSG_NEIGHBOR_LIST_REPLY: u8 = 0x59;
/// Network command reply.
pub const MSG_NET_CMD_REPLY: u8 = 0x5a;
/// Route info request reply.
pub const MSG_ROUTE_INFO_REPLY: u8 = 0x5c;
/// WES status.
pub const MSG_WES_STATUS: u8 = 0x60;
/// WES setup request.
pub const MSG_WES_SETUP_REQUEST: u8 = 0x61;

// ============================================================================
// Declared Lengths (bytes after the length byte)
// ============================================================================

/// HostAck / HostNack: originId.
pub const HOST_ACK_LENGTH: u8 = 2;
/// Uapp sent/dropped: originId + appSeqNo.
pub const HOST_UAPP_STATUS_LENGTH: u8 = 4;
/// HostData: originId + age16 + port.
pub const HOST_DATA_HEADER_SIZE: u8 = 5;
/// HostDataHapa: originId + age32 + port.
pub const HOST_DATA_HAPA_HEADER_SIZE: u8 = 7;
/// HostUappData: originId + age16 + port + appSeqNo.
pub const HOST_UAPP_DATA_HEADER_SIZE: u8 = 7;
/// HostUappDataHapa: originId + age32 + port + appSeqNo.
pub const HOST_UAPP_DATA_HAPA_HEADER_SIZE: u8 = 9;
/// NodeInfoReply: nodeId + uid + hardware type.
pub const NODE_INFO_REPLY_LENGTH: u8 = 8;
/// NeighborListReply: 12 slots of 3 bytes.
pub const NEIGHBOR_LIST_REPLY_LENGTH: u8 = 36;
/// NeighborListReply with the extended tail.
pub const NEIGHBOR_LIST_REPLY_EX_LENGTH: u8 = 39;
/// NetCmdReply: originId + cmd.
pub const NET_CMD_REPLY_HEADER_SIZE: u8 = 3;
/// RouteInfoReply: 16-byte bitmap.
pub const ROUTE_INFO_REPLY_LENGTH: u8 = 16;
/// WesStatus: status byte.
pub const WES_STATUS_LENGTH: u8 = 1;
/// WesSetupRequest: uid + appFuncType.
pub const WES_SETUP_REQUEST_LENGTH: u8 = 6;

/// SendUnacknowledged preamble: destNodeId + destPort + appSeqNo.
pub const SEND_UNACK_PREAMBLE: u8 = 5;
/// SendAcknowledged preamble: destNodeId + destPort.
pub const SEND_ACK_PREAMBLE: u8 = 3;
/// NetCmd preamble: destNodeId + cmd.
pub const NET_CMD_PREAMBLE: u8 = 3;
/// WesCmd body.
pub const WES_CMD_LENGTH: u8 = 1;
/// ALT command body.
pub const ALT_CMD_LENGTH: u8 = 1;
/// Application settings carried by a WES response.
pub const WES_APP_SETTINGS_LENGTH: usize = 24;
/// WesResponse body: uid + nodeId + appSettings.
pub const WES_RESPONSE_LENGTH: u8 = 7 + WES_APP_SETTINGS_LENGTH as u8;
/// Largest fixed-layout outbound frame (the WES response), header included.
pub const MAX_FIXED_FRAME_SIZE: usize = AAPI_HEADER_SIZE + WES_RESPONSE_LENGTH as usize;

// ============================================================================
// Field Limits
// ============================================================================

/// Highest valid destination port.
pub const MAX_PORT: u8 = 4;
/// Node id 0 is never a valid destination.
pub const INVALID_NODE_ID: u16 = 0;
/// Neighbor slot marker for "no neighbor".
pub const EMPTY_NEIGHBOR_ID: u16 = 0xFFFF;
/// Number of slots in a neighbor list reply.
pub const NEIGHBOR_SLOTS: usize = 12;
/// Only the low 12 bits of an application sequence number travel on the wire.
pub const APP_SEQ_NO_MASK: u16 = 0x0fff;
/// Length of a module UID.
pub const UID_SIZE: usize = 5;
/// Length of the route info bitmap.
pub const ROUTE_BITMAP_SIZE: usize = 16;

/// A 16-bit packet age counts units of 125 ms.
pub const AGE_UNIT_MS: u32 = 125;
/// A 32-bit HAPA packet age counts 1/524288 ms ticks.
pub const HAPA_TICKS_PER_MS: u32 = 524_288;

/// Convert a 16-bit packet age to milliseconds.
pub fn packet_age_ms(packet_age: u16) -> u32 {
    u32::from(packet_age) * AGE_UNIT_MS
}

/// Convert a HAPA packet age to whole milliseconds.
pub fn hapa_age_ms(packet_age: u32) -> u32 {
    packet_age / HAPA_TICKS_PER_MS
}

// ============================================================================
// SAPI Framing
// ============================================================================

/// SAPI frame head marker (`>`).
pub const SAPI_HEAD: u8 = 0x3E;
/// SAPI frame tail marker (`!`).
pub const SAPI_TAIL: u8 = 0x21;
/// Smallest SAPI frame: head, length, cmd1, cmd2, tail.
pub const SAPI_MIN_FRAME_SIZE: usize = 5;
/// Maximum data carried by one SAPI frame.
pub const SAPI_MAX_DATA: usize = 32;
/// Largest SAPI frame.
pub const SAPI_MAX_FRAME_SIZE: usize = SAPI_MIN_FRAME_SIZE + SAPI_MAX_DATA;

/// Raw AAPI byte that switches the module into its bootloader (SAPI).
pub const SAPI_MODE_SWITCH: u8 = 0x0B;

/// First command byte of every SAPI system command.
pub const SAPI_CMD_SYSTEM: u8 = 0x01;
/// Login.
pub const SAPI_CMD_LOGIN: u8 = 0x03;
/// Read a setting from flash.
pub const SAPI_CMD_GET_SETTING_FLASH: u8 = 0x06;
/// Commit the working settings to flash.
pub const SAPI_CMD_COMMIT_SETTINGS: u8 = 0x08;
/// Write a setting into the working copy.
pub const SAPI_CMD_SET_SETTING: u8 = 0x0A;
/// Start the protocol stack (leave the bootloader).
pub const SAPI_CMD_START_PROTOCOL: u8 = 0x12;
/// Start the bootloader.
pub const SAPI_CMD_START_BOOTLOADER: u8 = 0x13;

/// Response: login accepted.
pub const SAPI_RESP_LOGIN_OK: u8 = 0x80;
/// Response: login rejected.
pub const SAPI_RESP_LOGIN_ERROR: u8 = 0x81;
/// Response: bootloader started.
pub const SAPI_RESP_BOOTLOADER_STARTED: u8 = 0x82;
/// Response: protocol stack started.
pub const SAPI_RESP_PROTOCOL_STARTED: u8 = 0x83;
/// Response: protocol error.
pub const SAPI_RESP_PROTOCOL_ERROR: u8 = 0x84;
/// Response: setting list output.
pub const SAPI_RESP_SETTING_LIST_OUTPUT: u8 = 0x85;
/// Response: setting value.
pub const SAPI_RESP_SETTING_VALUE: u8 = 0x86;

/// SAPI passwords are five bytes.
pub const SAPI_PASSWORD_SIZE: usize = 5;
/// Factory level-10 password, `Lvl10`.
pub const DEFAULT_PASSWORD: [u8; SAPI_PASSWORD_SIZE] = [0x4c, 0x76, 0x6c, 0x31, 0x30];

// ============================================================================
// Setting IDs
// ============================================================================

/// Node id (2 bytes).
pub const SETTING_NODE_ID: u8 = 0x0A;
/// Generic application, normal mode.
pub const SETTING_GENERIC_APPLICATION_NORM: u8 = 0x19;
/// Network id (16 bytes).
pub const SETTING_NETWORK_ID: u8 = 0x2A;
/// Trace output enable (1 byte).
pub const SETTING_TRACE_OUTPUT: u8 = 0x2C;
/// Generic application, alternate mode.
pub const SETTING_GENERIC_APPLICATION_ALT: u8 = 0x3A;
/// Network ids are 16 bytes.
pub const NETWORK_ID_SIZE: usize = 16;
