//! SAPI, the module's configuration protocol.
//!
//! While the module runs its bootloader it talks SAPI instead of AAPI:
//!
//! ```text
//! +------+-----+------+------+-----------+------+
//! | 0x3E | len | cmd1 | cmd2 | data[..]  | 0x21 |
//! +------+-----+------+------+-----------+------+
//! ```
//!
//! `len` counts everything after itself (both command bytes, the data and
//! the tail), so a frame without data declares 3.

use bytes::BufMut;

use crate::constants::*;
use crate::error::ProtocolError;

/// Smallest legal value of the length byte.
const MIN_DECLARED: usize = 3;
/// Largest legal value of the length byte.
const MAX_DECLARED: usize = MIN_DECLARED + SAPI_MAX_DATA;

/// Response tags carried in the second command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SapiResponse {
    /// Password accepted.
    LoginOk,
    /// Password rejected.
    LoginError,
    /// The module entered its bootloader.
    BootloaderStarted,
    /// The protocol stack is running again.
    ProtocolStarted,
    /// The protocol stack failed to start.
    ProtocolError,
    /// List of settings.
    SettingListOutput,
    /// Value of one setting.
    SettingValue,
    /// Unrecognised tag.
    Unknown(u8),
}

impl From<u8> for SapiResponse {
    fn from(value: u8) -> Self {
        match value {
            SAPI_RESP_LOGIN_OK => SapiResponse::LoginOk,
            SAPI_RESP_LOGIN_ERROR => SapiResponse::LoginError,
            SAPI_RESP_BOOTLOADER_STARTED => SapiResponse::BootloaderStarted,
            SAPI_RESP_PROTOCOL_STARTED => SapiResponse::ProtocolStarted,
            SAPI_RESP_PROTOCOL_ERROR => SapiResponse::ProtocolError,
            SAPI_RESP_SETTING_LIST_OUTPUT => SapiResponse::SettingListOutput,
            SAPI_RESP_SETTING_VALUE => SapiResponse::SettingValue,
            other => SapiResponse::Unknown(other),
        }
    }
}

/// Access rights reported in a setting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRight {
    /// Setting can only be read.
    ReadOnly,
    /// Setting can be read and written.
    ReadWrite,
    /// Unknown value.
    Unknown(u8),
}

impl From<u8> for AccessRight {
    fn from(value: u8) -> Self {
        match value {
            2 => AccessRight::ReadOnly,
            3 => AccessRight::ReadWrite,
            other => AccessRight::Unknown(other),
        }
    }
}

/// One entry of a setting list output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDescriptor {
    /// Setting id.
    pub id: u8,
    /// Length of the setting value in bytes.
    pub value_length: u8,
    /// Access rights.
    pub access: AccessRight,
}

/// A complete SAPI frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SapiMessage {
    /// The two command bytes.
    pub command: [u8; 2],
    /// Data storage; only the first `data_len` bytes are meaningful.
    pub data: [u8; SAPI_MAX_DATA],
    /// Number of data bytes.
    pub data_len: u8,
}

impl SapiMessage {
    /// The data section.
    pub fn data(&self) -> &[u8] {
        &self.data[..usize::from(self.data_len)]
    }

    /// Interpret the second command byte as a response tag.
    pub fn response(&self) -> SapiResponse {
        SapiResponse::from(self.command[1])
    }

    /// Parse the data of a setting list output. Trailing partial entries
    /// are ignored.
    pub fn settings(&self) -> Vec<SettingDescriptor> {
        self.data()
            .chunks_exact(3)
            .map(|entry| SettingDescriptor {
                id: entry[0],
                value_length: entry[1],
                access: AccessRight::from(entry[2]),
            })
            .collect()
    }
}

/// Byte-at-a-time SAPI frame extractor with a single-slot mailbox.
///
/// Bytes are dropped until a head marker is seen. When the tail byte does
/// not match, the buffer is rescanned for a later head marker and shifted
/// down to it, so a corrupted frame never hides the one after it. A newly
/// completed frame overwrites an unread one.
#[derive(Debug, Clone)]
pub struct SapiFramer {
    buffer: [u8; SAPI_MAX_FRAME_SIZE],
    cursor: usize,
    pending: Option<SapiMessage>,
}

impl Default for SapiFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SapiFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self {
            buffer: [0; SAPI_MAX_FRAME_SIZE],
            cursor: 0,
            pending: None,
        }
    }

    /// Drop any partial frame and unread message.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.pending = None;
    }

    /// Feed one received byte.
    pub fn push(&mut self, byte: u8) {
        if self.cursor == 0 && byte != SAPI_HEAD {
            return;
        }
        self.buffer[self.cursor] = byte;
        self.cursor += 1;
        self.scan();
    }

    /// Feed a run of bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    /// Whether a complete message is waiting.
    pub fn message_available(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the waiting message, emptying the mailbox.
    pub fn take_message(&mut self) -> Option<SapiMessage> {
        self.pending.take()
    }

    fn scan(&mut self) {
        loop {
            if self.cursor < 2 {
                return;
            }
            let declared = usize::from(self.buffer[1]);
            if !(MIN_DECLARED..=MAX_DECLARED).contains(&declared) {
                self.resync();
                continue;
            }
            let total = declared + 2;
            if self.cursor < total {
                return;
            }
            if self.buffer[total - 1] == SAPI_TAIL {
                self.complete(declared);
                return;
            }
            self.resync();
        }
    }

    fn complete(&mut self, declared: usize) {
        let data_len = declared - MIN_DECLARED;
        let mut message = SapiMessage {
            command: [self.buffer[2], self.buffer[3]],
            data: [0; SAPI_MAX_DATA],
            data_len: data_len as u8,
        };
        message.data[..data_len].copy_from_slice(&self.buffer[4..4 + data_len]);
        log::trace!(
            "SAPI frame {:02X} {:02X} with {} data bytes",
            message.command[0],
            message.command[1],
            data_len
        );
        self.pending = Some(message);
        self.cursor = 0;
    }

    /// Shift down to the next head marker after index 0, or clear.
    fn resync(&mut self) {
        match self.buffer[1..self.cursor].iter().position(|&b| b == SAPI_HEAD) {
            Some(offset) => {
                let start = offset + 1;
                log::debug!("SAPI resync: skipping {} bytes", start);
                self.buffer.copy_within(start..self.cursor, 0);
                self.cursor -= start;
            }
            None => {
                log::debug!("SAPI resync: dropping {} bytes", self.cursor);
                self.cursor = 0;
            }
        }
    }
}

/// Commands the host sends in configuration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SapiCommand<'a> {
    /// Log in with the 5-byte password.
    Login {
        /// Password bytes.
        password: [u8; SAPI_PASSWORD_SIZE],
    },
    /// Restart into the bootloader.
    StartBootloader,
    /// Read a setting from flash.
    GetSetting {
        /// Setting id.
        id: u8,
    },
    /// Write a setting.
    SetSetting {
        /// Setting id.
        id: u8,
        /// New value.
        value: &'a [u8],
    },
    /// Persist written settings.
    CommitSettings,
    /// Leave configuration mode and start the protocol stack.
    StartProtocolStack,
}

impl SapiCommand<'_> {
    /// The two command bytes.
    pub fn code(&self) -> [u8; 2] {
        let cmd2 = match self {
            SapiCommand::Login { .. } => SAPI_CMD_LOGIN,
            SapiCommand::StartBootloader => SAPI_CMD_START_BOOTLOADER,
            SapiCommand::GetSetting { .. } => SAPI_CMD_GET_SETTING_FLASH,
            SapiCommand::SetSetting { .. } => SAPI_CMD_SET_SETTING,
            SapiCommand::CommitSettings => SAPI_CMD_COMMIT_SETTINGS,
            SapiCommand::StartProtocolStack => SAPI_CMD_START_PROTOCOL,
        };
        [SAPI_CMD_SYSTEM, cmd2]
    }

    /// Encode as a complete frame.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut data = Vec::with_capacity(SAPI_MAX_DATA);
        match self {
            SapiCommand::Login { password } => data.put_slice(password),
            SapiCommand::GetSetting { id } => data.put_u8(*id),
            SapiCommand::SetSetting { id, value } => {
                data.put_u8(*id);
                data.put_slice(value);
            }
            SapiCommand::StartBootloader
            | SapiCommand::CommitSettings
            | SapiCommand::StartProtocolStack => {}
        }
        if data.len() > SAPI_MAX_DATA {
            return Err(ProtocolError::SapiDataTooLong {
                max: SAPI_MAX_DATA,
                actual: data.len(),
            });
        }

        let [cmd1, cmd2] = self.code();
        let mut buf = Vec::with_capacity(SAPI_MIN_FRAME_SIZE + data.len());
        buf.put_u8(SAPI_HEAD);
        buf.put_u8((MIN_DECLARED + data.len()) as u8);
        buf.put_u8(cmd1);
        buf.put_u8(cmd2);
        buf.put_slice(&data);
        buf.put_u8(SAPI_TAIL);
        Ok(buf)
    }
}

/// Encode a response frame, as the module would send it.
pub fn encode_response(response: u8, data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if data.len() > SAPI_MAX_DATA {
        return Err(ProtocolError::SapiDataTooLong {
            max: SAPI_MAX_DATA,
            actual: data.len(),
        });
    }
    let mut buf = Vec::with_capacity(SAPI_MIN_FRAME_SIZE + data.len());
    buf.put_u8(SAPI_HEAD);
    buf.put_u8((MIN_DECLARED + data.len()) as u8);
    buf.put_u8(SAPI_CMD_SYSTEM);
    buf.put_u8(response);
    buf.put_slice(data);
    buf.put_u8(SAPI_TAIL);
    Ok(buf)
}
