//! Emulated NeoMesh module for integration tests.
//!
//! Answers the configuration-mode handshake the way a real module does and
//! records everything the host writes. CTS is modelled as always ready: the
//! module raises `ready_to_send` whenever the host finds no bytes to read.

#![allow(dead_code)]

use neomesh::{LinkSignals, Transport, TxStatus};
use neomesh_protocol::*;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub struct EmulatedModule {
    pub password: [u8; SAPI_PASSWORD_SIZE],
    pub settings: HashMap<u8, Vec<u8>>,
    pub written: Vec<Vec<u8>>,
    pub commits: usize,
    pub restarts: usize,
    pub in_bootloader: bool,
    /// Record writes but never answer.
    pub silent: bool,
    incoming: VecDeque<u8>,
    signals: Option<Arc<LinkSignals>>,
}

impl EmulatedModule {
    pub fn new() -> Self {
        let mut settings = HashMap::new();
        settings.insert(SETTING_NODE_ID, vec![0x00, 0x01]);
        settings.insert(SETTING_TRACE_OUTPUT, vec![0x00]);
        settings.insert(SETTING_NETWORK_ID, vec![0u8; NETWORK_ID_SIZE]);
        EmulatedModule {
            password: DEFAULT_PASSWORD,
            settings,
            written: Vec::new(),
            commits: 0,
            restarts: 0,
            in_bootloader: false,
            silent: false,
            incoming: VecDeque::new(),
            signals: None,
        }
    }

    pub fn silent() -> Self {
        EmulatedModule {
            silent: true,
            ..Self::new()
        }
    }

    pub fn with_password(password: [u8; SAPI_PASSWORD_SIZE]) -> Self {
        EmulatedModule {
            password,
            ..Self::new()
        }
    }

    /// Wire the module's CTS line to a link.
    pub fn attach(&mut self, signals: Arc<LinkSignals>) {
        self.signals = Some(signals);
    }

    /// Queue bytes for the host to read.
    pub fn reply(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    /// Second command byte of every SAPI frame the host wrote.
    pub fn sapi_commands(&self) -> Vec<u8> {
        self.written
            .iter()
            .filter(|frame| frame.first() == Some(&SAPI_HEAD) && frame.len() >= SAPI_MIN_FRAME_SIZE)
            .map(|frame| frame[3])
            .collect()
    }

    fn respond(&mut self, response: u8, data: &[u8]) {
        if self.silent {
            return;
        }
        let frame = encode_response(response, data).unwrap();
        self.reply(&frame);
    }

    fn handle_sapi(&mut self, frame: &[u8]) {
        let data = &frame[4..frame.len() - 1];
        match frame[3] {
            SAPI_CMD_LOGIN => {
                if data == self.password {
                    self.respond(SAPI_RESP_LOGIN_OK, &[]);
                } else {
                    self.respond(SAPI_RESP_LOGIN_ERROR, &[]);
                }
            }
            SAPI_CMD_SET_SETTING => {
                self.settings.insert(data[0], data[1..].to_vec());
                self.respond(SAPI_CMD_SET_SETTING, &[]);
            }
            SAPI_CMD_COMMIT_SETTINGS => {
                self.commits += 1;
                self.respond(SAPI_CMD_COMMIT_SETTINGS, &[]);
            }
            SAPI_CMD_GET_SETTING_FLASH => {
                let value = self.settings.get(&data[0]).cloned().unwrap_or_default();
                self.respond(SAPI_RESP_SETTING_VALUE, &value);
            }
            SAPI_CMD_START_PROTOCOL => {
                self.restarts += 1;
                self.in_bootloader = false;
                self.respond(SAPI_RESP_PROTOCOL_STARTED, &[]);
            }
            _ => {}
        }
    }
}

impl Transport for EmulatedModule {
    fn transmit(&mut self, frame: &[u8]) -> TxStatus {
        self.written.push(frame.to_vec());
        if frame == [SAPI_MODE_SWITCH] {
            self.in_bootloader = true;
            self.respond(SAPI_RESP_BOOTLOADER_STARTED, &[]);
        } else if frame.first() == Some(&SAPI_HEAD) && frame.len() >= SAPI_MIN_FRAME_SIZE {
            self.handle_sapi(frame);
        }
        TxStatus::Complete
    }

    fn receive(&mut self) -> Option<u8> {
        let byte = self.incoming.pop_front();
        if byte.is_none() {
            if let Some(signals) = &self.signals {
                signals.ready_to_send();
            }
        }
        byte
    }
}
