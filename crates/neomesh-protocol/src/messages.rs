//! Messages received from the module.
//!
//! All multi-byte fields are big-endian. Decoders take the whole frame
//! (header included) and borrow payloads from it without copying. The
//! encoders produce the same layout and exist for simulators and tests.

use bytes::BufMut;

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::*;

/// Largest body a one-byte length field can describe.
const MAX_BODY: usize = u8::MAX as usize;

/// Return the body of `frame`, checking that the declared length is present
/// in full and holds at least `min` bytes.
fn body(frame: &[u8], min: u8) -> Result<&[u8], ProtocolError> {
    if frame.len() < AAPI_HEADER_SIZE {
        return Err(ProtocolError::FrameTooShort {
            expected: AAPI_HEADER_SIZE,
            actual: frame.len(),
        });
    }
    let declared = frame[1];
    let end = AAPI_HEADER_SIZE + usize::from(declared);
    if frame.len() < end {
        return Err(ProtocolError::FrameTooShort {
            expected: end,
            actual: frame.len(),
        });
    }
    if declared < min {
        return Err(ProtocolError::InvalidLength {
            kind: frame[0],
            length: declared,
        });
    }
    Ok(&frame[AAPI_HEADER_SIZE..end])
}

fn be16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn be32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Clip a payload so header plus payload still fits the length byte.
fn clip(payload: &[u8], header: u8) -> &[u8] {
    let max = MAX_BODY - usize::from(header);
    &payload[..payload.len().min(max)]
}

fn start(kind: u8, body_len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(AAPI_HEADER_SIZE + body_len);
    buf.put_u8(kind);
    buf.put_u8(body_len as u8);
    buf
}

/// HostAck (0x50) / HostNack (0x51).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAckNack {
    /// Node that acknowledged (or refused) the packet.
    pub origin_id: u16,
}

impl HostAckNack {
    /// Decode from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, HOST_ACK_LENGTH)?;
        Ok(HostAckNack {
            origin_id: be16(data, 0),
        })
    }

    /// Encode as a frame of type `kind` (ack or nack).
    pub fn encode(&self, kind: u8) -> Vec<u8> {
        let mut buf = start(kind, usize::from(HOST_ACK_LENGTH));
        buf.put_u16(self.origin_id);
        buf
    }
}

/// Uapp packet sent (0x56) / dropped (0x57).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostUappStatus {
    /// Destination the unacknowledged packet was addressed to.
    pub origin_id: u16,
    /// Application sequence number of the packet.
    pub app_seq_no: u16,
}

impl HostUappStatus {
    /// Decode from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, HOST_UAPP_STATUS_LENGTH)?;
        Ok(HostUappStatus {
            origin_id: be16(data, 0),
            app_seq_no: be16(data, 2),
        })
    }

    /// Encode as a frame of type `kind` (sent or dropped).
    pub fn encode(&self, kind: u8) -> Vec<u8> {
        let mut buf = start(kind, usize::from(HOST_UAPP_STATUS_LENGTH));
        buf.put_u16(self.origin_id);
        buf.put_u16(self.app_seq_no);
        buf
    }
}

/// HostData (0x52): acknowledged payload from another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostData<'a> {
    /// Sending node.
    pub origin_id: u16,
    /// Packet age in units of [`AGE_UNIT_MS`]; see [`packet_age_ms`].
    pub packet_age: u16,
    /// Destination port.
    pub port: u8,
    /// Payload, borrowed from the receive buffer.
    pub payload: &'a [u8],
}

impl<'a> HostData<'a> {
    /// Decode from a frame.
    pub fn decode(frame: &'a [u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, HOST_DATA_HEADER_SIZE)?;
        Ok(HostData {
            origin_id: be16(data, 0),
            packet_age: be16(data, 2),
            port: data[4],
            payload: &data[usize::from(HOST_DATA_HEADER_SIZE)..],
        })
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Vec<u8> {
        let payload = clip(self.payload, HOST_DATA_HEADER_SIZE);
        let mut buf = start(MSG_HOST_DATA, usize::from(HOST_DATA_HEADER_SIZE) + payload.len());
        buf.put_u16(self.origin_id);
        buf.put_u16(self.packet_age);
        buf.put_u8(self.port);
        buf.put_slice(payload);
        buf
    }
}

/// HostDataHapa (0x53): acknowledged payload with a high precision age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostDataHapa<'a> {
    /// Sending node.
    pub origin_id: u16,
    /// Packet age in 1/[`HAPA_TICKS_PER_MS`] ms ticks.
    pub packet_age: u32,
    /// Destination port.
    pub port: u8,
    /// Payload, borrowed from the receive buffer.
    pub payload: &'a [u8],
}

impl<'a> HostDataHapa<'a> {
    /// Decode from a frame.
    pub fn decode(frame: &'a [u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, HOST_DATA_HAPA_HEADER_SIZE)?;
        Ok(HostDataHapa {
            origin_id: be16(data, 0),
            packet_age: be32(data, 2),
            port: data[6],
            payload: &data[usize::from(HOST_DATA_HAPA_HEADER_SIZE)..],
        })
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Vec<u8> {
        let payload = clip(self.payload, HOST_DATA_HAPA_HEADER_SIZE);
        let mut buf = start(
            MSG_HOST_DATA_HAPA,
            usize::from(HOST_DATA_HAPA_HEADER_SIZE) + payload.len(),
        );
        buf.put_u16(self.origin_id);
        buf.put_u32(self.packet_age);
        buf.put_u8(self.port);
        buf.put_slice(payload);
        buf
    }
}

/// HostUappData (0x54): unacknowledged payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostUappData<'a> {
    /// Sending node.
    pub origin_id: u16,
    /// Packet age in units of [`AGE_UNIT_MS`]; see [`packet_age_ms`].
    pub packet_age: u16,
    /// Destination port.
    pub port: u8,
    /// Application sequence number (12 bits).
    pub app_seq_no: u16,
    /// Payload, borrowed from the receive buffer.
    pub payload: &'a [u8],
}

impl<'a> HostUappData<'a> {
    /// Decode from a frame.
    pub fn decode(frame: &'a [u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, HOST_UAPP_DATA_HEADER_SIZE)?;
        Ok(HostUappData {
            origin_id: be16(data, 0),
            packet_age: be16(data, 2),
            port: data[4],
            app_seq_no: be16(data, 5) & APP_SEQ_NO_MASK,
            payload: &data[usize::from(HOST_UAPP_DATA_HEADER_SIZE)..],
        })
    }

    /// Encode as a frame. Only the low 12 bits of the sequence number are kept.
    pub fn encode(&self) -> Vec<u8> {
        let payload = clip(self.payload, HOST_UAPP_DATA_HEADER_SIZE);
        let mut buf = start(
            MSG_HOST_UAPP_DATA,
            usize::from(HOST_UAPP_DATA_HEADER_SIZE) + payload.len(),
        );
        buf.put_u16(self.origin_id);
        buf.put_u16(self.packet_age);
        buf.put_u8(self.port);
        buf.put_u16(self.app_seq_no & APP_SEQ_NO_MASK);
        buf.put_slice(payload);
        buf
    }
}

/// HostUappDataHapa (0x55): unacknowledged payload with a high precision age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostUappDataHapa<'a> {
    /// Sending node.
    pub origin_id: u16,
    /// Packet age in 1/[`HAPA_TICKS_PER_MS`] ms ticks.
    pub packet_age: u32,
    /// Destination port.
    pub port: u8,
    /// Application sequence number (12 bits).
    pub app_seq_no: u16,
    /// Payload, borrowed from the receive buffer.
    pub payload: &'a [u8],
}

impl<'a> HostUappDataHapa<'a> {
    /// Decode from a frame.
    pub fn decode(frame: &'a [u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, HOST_UAPP_DATA_HAPA_HEADER_SIZE)?;
        Ok(HostUappDataHapa {
            origin_id: be16(data, 0),
            packet_age: be32(data, 2),
            port: data[6],
            app_seq_no: be16(data, 7) & APP_SEQ_NO_MASK,
            payload: &data[usize::from(HOST_UAPP_DATA_HAPA_HEADER_SIZE)..],
        })
    }

    /// Encode as a frame. Only the low 12 bits of the sequence number are kept.
    pub fn encode(&self) -> Vec<u8> {
        let payload = clip(self.payload, HOST_UAPP_DATA_HAPA_HEADER_SIZE);
        let mut buf = start(
            MSG_HOST_UAPP_DATA_HAPA,
            usize::from(HOST_UAPP_DATA_HAPA_HEADER_SIZE) + payload.len(),
        );
        buf.put_u16(self.origin_id);
        buf.put_u32(self.packet_age);
        buf.put_u8(self.port);
        buf.put_u16(self.app_seq_no & APP_SEQ_NO_MASK);
        buf.put_slice(payload);
        buf
    }
}

/// NodeInfoReply (0x58).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfoReply {
    /// Node id of the attached module.
    pub node_id: u16,
    /// Module UID.
    pub uid: Uid,
    /// Hardware type.
    pub node_type: NodeType,
}

impl NodeInfoReply {
    /// Decode from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, NODE_INFO_REPLY_LENGTH)?;
        let mut uid = [0u8; UID_SIZE];
        uid.copy_from_slice(&data[2..2 + UID_SIZE]);
        Ok(NodeInfoReply {
            node_id: be16(data, 0),
            uid: Uid(uid),
            node_type: NodeType::from(data[7]),
        })
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = start(MSG_NODE_INFO_REPLY, usize::from(NODE_INFO_REPLY_LENGTH));
        buf.put_u16(self.node_id);
        buf.put_slice(self.uid.as_bytes());
        buf.put_u8(self.node_type.into());
        buf
    }
}

/// NeighborListReply (0x59).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NeighborListReply {
    /// Occupied slots, in slot order.
    pub neighbors: Vec<Neighbor>,
    /// Tail of the extended (39 byte) reply form.
    pub extension: Option<[u8; 3]>,
}

impl NeighborListReply {
    /// Decode from a frame, skipping empty slots.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, NEIGHBOR_LIST_REPLY_LENGTH)?;
        let neighbors = data[..NEIGHBOR_SLOTS * 3]
            .chunks_exact(3)
            .map(|slot| Neighbor {
                node_id: be16(slot, 0),
                rssi: slot[2],
            })
            .filter(|n| n.node_id != EMPTY_NEIGHBOR_ID)
            .collect();
        let extension = if data.len() >= usize::from(NEIGHBOR_LIST_REPLY_EX_LENGTH) {
            let mut tail = [0u8; 3];
            tail.copy_from_slice(&data[NEIGHBOR_SLOTS * 3..NEIGHBOR_SLOTS * 3 + 3]);
            Some(tail)
        } else {
            None
        };
        Ok(NeighborListReply {
            neighbors,
            extension,
        })
    }

    /// Number of neighbors reported.
    pub fn count(&self) -> usize {
        self.neighbors.len()
    }

    /// Encode as a frame. Unused slots are filled with the empty marker and
    /// anything beyond twelve neighbors is dropped.
    pub fn encode(&self) -> Vec<u8> {
        let length = if self.extension.is_some() {
            NEIGHBOR_LIST_REPLY_EX_LENGTH
        } else {
            NEIGHBOR_LIST_REPLY_LENGTH
        };
        let mut buf = start(MSG_NEIGHBOR_LIST_REPLY, usize::from(length));
        for slot in 0..NEIGHBOR_SLOTS {
            match self.neighbors.get(slot) {
                Some(n) => {
                    buf.put_u16(n.node_id);
                    buf.put_u8(n.rssi);
                }
                None => {
                    buf.put_u16(EMPTY_NEIGHBOR_ID);
                    buf.put_u8(0);
                }
            }
        }
        if let Some(tail) = &self.extension {
            buf.put_slice(tail);
        }
        buf
    }
}

/// RouteInfoReply (0x5c).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteInfoReply {
    /// Route bitmap.
    pub bitmap: [u8; ROUTE_BITMAP_SIZE],
}

impl RouteInfoReply {
    /// Decode from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, ROUTE_INFO_REPLY_LENGTH)?;
        let mut bitmap = [0u8; ROUTE_BITMAP_SIZE];
        bitmap.copy_from_slice(&data[..ROUTE_BITMAP_SIZE]);
        Ok(RouteInfoReply { bitmap })
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = start(MSG_ROUTE_INFO_REPLY, ROUTE_BITMAP_SIZE);
        buf.put_slice(&self.bitmap);
        buf
    }
}

/// NetCmdReply (0x5a).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetCmdReply<'a> {
    /// Responding node.
    pub origin_id: u16,
    /// Network command being answered.
    pub cmd: NetCmd,
    /// Payload, borrowed from the receive buffer.
    pub payload: &'a [u8],
}

impl<'a> NetCmdReply<'a> {
    /// Decode from a frame.
    pub fn decode(frame: &'a [u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, NET_CMD_REPLY_HEADER_SIZE)?;
        Ok(NetCmdReply {
            origin_id: be16(data, 0),
            cmd: NetCmd::from(data[2]),
            payload: &data[usize::from(NET_CMD_REPLY_HEADER_SIZE)..],
        })
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Vec<u8> {
        let payload = clip(self.payload, NET_CMD_REPLY_HEADER_SIZE);
        let mut buf = start(
            MSG_NET_CMD_REPLY,
            usize::from(NET_CMD_REPLY_HEADER_SIZE) + payload.len(),
        );
        buf.put_u16(self.origin_id);
        buf.put_u8(self.cmd.into());
        buf.put_slice(payload);
        buf
    }
}

/// WesStatus (0x60).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WesStatus {
    /// Current WES state.
    pub status: WesState,
}

impl WesStatus {
    /// Decode from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, WES_STATUS_LENGTH)?;
        Ok(WesStatus {
            status: WesState::from(data[0]),
        })
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = start(MSG_WES_STATUS, usize::from(WES_STATUS_LENGTH));
        buf.put_u8(match self.status {
            WesState::Stopped => 0,
            WesState::ServerRunning => 1,
            WesState::ClientRunning => 2,
            WesState::Unknown(other) => other,
        });
        buf
    }
}

/// WesSetupRequest (0x61).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WesSetupRequest {
    /// UID of the module asking to join.
    pub uid: Uid,
    /// Application function type.
    pub app_func_type: u8,
}

impl WesSetupRequest {
    /// Decode from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let data = body(frame, WES_SETUP_REQUEST_LENGTH)?;
        let mut uid = [0u8; UID_SIZE];
        uid.copy_from_slice(&data[..UID_SIZE]);
        Ok(WesSetupRequest {
            uid: Uid(uid),
            app_func_type: data[UID_SIZE],
        })
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = start(MSG_WES_SETUP_REQUEST, usize::from(WES_SETUP_REQUEST_LENGTH));
        buf.put_slice(self.uid.as_bytes());
        buf.put_u8(self.app_func_type);
        buf
    }
}

/// Any message received from the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Packet acknowledged.
    HostAck(HostAckNack),
    /// Packet not acknowledged.
    HostNack(HostAckNack),
    /// Unacknowledged packet sent.
    UappSent(HostUappStatus),
    /// Unacknowledged packet dropped.
    UappDropped(HostUappStatus),
    /// Acknowledged payload.
    HostData(HostData<'a>),
    /// Acknowledged payload, high precision age.
    HostDataHapa(HostDataHapa<'a>),
    /// Unacknowledged payload.
    HostUappData(HostUappData<'a>),
    /// Unacknowledged payload, high precision age.
    HostUappDataHapa(HostUappDataHapa<'a>),
    /// Node info reply.
    NodeInfoReply(NodeInfoReply),
    /// Neighbor list reply.
    NeighborListReply(NeighborListReply),
    /// Network command reply.
    NetCmdReply(NetCmdReply<'a>),
    /// Route info reply.
    RouteInfoReply(RouteInfoReply),
    /// WES status.
    WesStatus(WesStatus),
    /// WES setup request.
    WesSetupRequest(WesSetupRequest),
    /// A type this crate does not know; passed through untouched.
    Unknown {
        /// Message type.
        kind: u8,
        /// Body after the header.
        body: &'a [u8],
    },
}

impl<'a> Inbound<'a> {
    /// Decode a frame into the matching variant.
    pub fn decode(frame: &'a [u8]) -> Result<Self, ProtocolError> {
        if frame.is_empty() {
            return Err(ProtocolError::FrameTooShort {
                expected: AAPI_HEADER_SIZE,
                actual: 0,
            });
        }
        Ok(match frame[0] {
            MSG_HOST_ACK => Inbound::HostAck(HostAckNack::decode(frame)?),
            MSG_HOST_NACK => Inbound::HostNack(HostAckNack::decode(frame)?),
            MSG_HOST_UAPP_SENT => Inbound::UappSent(HostUappStatus::decode(frame)?),
            MSG_HOST_UAPP_DROPPED => Inbound::UappDropped(HostUappStatus::decode(frame)?),
            MSG_HOST_DATA => Inbound::HostData(HostData::decode(frame)?),
            MSG_HOST_DATA_HAPA => Inbound::HostDataHapa(HostDataHapa::decode(frame)?),
            MSG_HOST_UAPP_DATA => Inbound::HostUappData(HostUappData::decode(frame)?),
            MSG_HOST_UAPP_DATA_HAPA => Inbound::HostUappDataHapa(HostUappDataHapa::decode(frame)?),
            MSG_NODE_INFO_REPLY => Inbound::NodeInfoReply(NodeInfoReply::decode(frame)?),
            MSG_NEIGHBOR_LIST_REPLY => Inbound::NeighborListReply(NeighborListReply::decode(frame)?),
            MSG_NET_CMD_REPLY => Inbound::NetCmdReply(NetCmdReply::decode(frame)?),
            MSG_ROUTE_INFO_REPLY => Inbound::RouteInfoReply(RouteInfoReply::decode(frame)?),
            MSG_WES_STATUS => Inbound::WesStatus(WesStatus::decode(frame)?),
            MSG_WES_SETUP_REQUEST => Inbound::WesSetupRequest(WesSetupRequest::decode(frame)?),
            kind => Inbound::Unknown {
                kind,
                body: body(frame, 0)?,
            },
        })
    }
}
