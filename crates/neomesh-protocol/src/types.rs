//! Common types used in the protocol.

use crate::constants::*;

/// A 5-byte module UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uid(pub [u8; UID_SIZE]);

impl Uid {
    /// Create from a slice. Returns None if slice is too short.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes = slice.get(..UID_SIZE)?;
        let mut uid = [0u8; UID_SIZE];
        uid.copy_from_slice(bytes);
        Some(Uid(uid))
    }

    /// Build from the low 40 bits of an integer, most significant byte first.
    pub fn from_u64(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let mut uid = [0u8; UID_SIZE];
        uid.copy_from_slice(&bytes[8 - UID_SIZE..]);
        Uid(uid)
    }

    /// The UID as an integer.
    pub fn to_u64(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; UID_SIZE] {
        &self.0
    }
}

/// One entry of a neighbor list reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    /// Neighbor node id.
    pub node_id: u16,
    /// Received signal strength.
    pub rssi: u8,
}

/// Hardware type reported in a node info reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// NC2400.
    Nc2400,
    /// NC1000.
    Nc1000,
    /// NC0400.
    Nc0400,
    /// Unknown hardware.
    Unknown(u8),
}

impl From<u8> for NodeType {
    fn from(value: u8) -> Self {
        match value {
            1 => NodeType::Nc2400,
            2 => NodeType::Nc1000,
            3 => NodeType::Nc0400,
            other => NodeType::Unknown(other),
        }
    }
}

impl From<NodeType> for u8 {
    fn from(value: NodeType) -> Self {
        match value {
            NodeType::Nc2400 => 1,
            NodeType::Nc1000 => 2,
            NodeType::Nc0400 => 3,
            NodeType::Unknown(other) => other,
        }
    }
}

/// Network command values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetCmd {
    /// ACK.
    Ack,
    /// NACK.
    Nack,
    /// Hibernate.
    Hibernate,
    /// Wake.
    Wake,
    /// WES.
    Wes,
    /// Unknown command.
    Unknown(u8),
}

impl From<u8> for NetCmd {
    fn from(value: u8) -> Self {
        match value {
            0 => NetCmd::Ack,
            1 => NetCmd::Nack,
            2 => NetCmd::Hibernate,
            3 => NetCmd::Wake,
            5 => NetCmd::Wes,
            other => NetCmd::Unknown(other),
        }
    }
}

impl From<NetCmd> for u8 {
    fn from(value: NetCmd) -> Self {
        match value {
            NetCmd::Ack => 0,
            NetCmd::Nack => 1,
            NetCmd::Hibernate => 2,
            NetCmd::Wake => 3,
            NetCmd::Wes => 5,
            NetCmd::Unknown(other) => other,
        }
    }
}

/// WES (Wireless Easy Setup) commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WesCmd {
    /// Stop.
    Stop = 0,
    /// Start server.
    StartServer = 1,
    /// Request status.
    RequestStatus = 2,
    /// Start client.
    StartClient = 3,
}

/// WES status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WesState {
    /// Stopped.
    Stopped,
    /// Server is running.
    ServerRunning,
    /// Client is running.
    ClientRunning,
    /// Unknown status.
    Unknown(u8),
}

impl From<u8> for WesState {
    fn from(value: u8) -> Self {
        match value {
            0 => WesState::Stopped,
            1 => WesState::ServerRunning,
            2 => WesState::ClientRunning,
            other => WesState::Unknown(other),
        }
    }
}

/// ALT commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltCmd {
    /// Stop.
    Stop = 0,
    /// Start.
    Start = 1,
}
