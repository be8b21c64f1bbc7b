//! Configuration-mode session.
//!
//! Changing a persistent setting takes the module out of normal operation:
//!
//! 1. switch to SAPI (raw `0x0B` through the transmit queue, answered by
//!    `BootloaderStarted`)
//! 2. log in with the password
//! 3. set the setting and commit it
//! 4. restart the protocol stack
//!
//! Each step waits for the module's answer by pumping the link with a SAPI
//! framer tapped onto the received bytes. Waits are bounded by a hard
//! deadline.

use std::thread;
use std::time::{Duration, Instant};

use neomesh_link::{LinkContext, Token, Transport};
use neomesh_protocol::*;
use tracing::{debug, trace, warn};

use crate::config::{Password, SessionConfig};
use crate::error::SessionError;

/// Token attached to frames the session sends, so a write-completion handler
/// can tell them apart from application traffic.
pub const SESSION_TOKEN: Token = Token(u64::MAX);

/// Sleep between polls that produced no bytes.
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Which protocol the module is speaking, as far as the host knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Normal operation (AAPI).
    Application,
    /// Bootloader running, not logged in.
    ConfigLoggedOut,
    /// Bootloader running and logged in.
    ConfigLoggedIn,
}

/// Persistent module settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Node id, 2 bytes big-endian, nonzero.
    NodeId,
    /// Network id, 16 bytes.
    NetworkId,
    /// Trace output selection, 1 byte.
    TraceOutput,
    /// Generic application settings, normal mode.
    GenericApplicationNorm,
    /// Generic application settings, alternative mode.
    GenericApplicationAlt,
    /// Any other setting id.
    Other(u8),
}

impl Setting {
    /// SAPI setting id.
    pub fn id(&self) -> u8 {
        match self {
            Setting::NodeId => SETTING_NODE_ID,
            Setting::NetworkId => SETTING_NETWORK_ID,
            Setting::TraceOutput => SETTING_TRACE_OUTPUT,
            Setting::GenericApplicationNorm => SETTING_GENERIC_APPLICATION_NORM,
            Setting::GenericApplicationAlt => SETTING_GENERIC_APPLICATION_ALT,
            Setting::Other(id) => *id,
        }
    }

    /// Required value length, where the setting has a fixed one.
    pub fn value_length(&self) -> Option<usize> {
        match self {
            Setting::NodeId => Some(2),
            Setting::NetworkId => Some(NETWORK_ID_SIZE),
            Setting::TraceOutput => Some(1),
            _ => None,
        }
    }

    /// Reject values the module would not accept.
    pub fn check(&self, value: &[u8]) -> Result<(), SessionError> {
        if let Some(expected) = self.value_length() {
            if value.len() != expected {
                return Err(SessionError::InvalidSetting(format!(
                    "{:?} takes {} bytes, got {}",
                    self,
                    expected,
                    value.len()
                )));
            }
        }
        if *self == Setting::NodeId && value == [0, 0] {
            return Err(SessionError::InvalidSetting("node id cannot be 0".to_string()));
        }
        Ok(())
    }
}

impl From<u8> for Setting {
    fn from(id: u8) -> Self {
        match id {
            SETTING_NODE_ID => Setting::NodeId,
            SETTING_NETWORK_ID => Setting::NetworkId,
            SETTING_TRACE_OUTPUT => Setting::TraceOutput,
            SETTING_GENERIC_APPLICATION_NORM => Setting::GenericApplicationNorm,
            SETTING_GENERIC_APPLICATION_ALT => Setting::GenericApplicationAlt,
            other => Setting::Other(other),
        }
    }
}

/// Drives configuration-mode exchanges over a [`LinkContext`].
///
/// Only one exchange runs at a time: every step blocks until the module has
/// answered or the deadline passed.
#[derive(Debug)]
pub struct SessionController {
    password: Password,
    timeout: Duration,
    drain: u8,
    mode: SessionMode,
    framer: SapiFramer,
    /// Received bytes reach the framer only while an exchange is running.
    listening: bool,
}

impl SessionController {
    /// Create a session in application mode.
    pub fn new(config: &SessionConfig) -> Self {
        SessionController {
            password: config.password,
            timeout: config.response_timeout(),
            drain: config.restart_drain_responses,
            mode: SessionMode::Application,
            framer: SapiFramer::new(),
            listening: false,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Replace the login password.
    pub fn set_password(&mut self, password: Password) {
        self.password = password;
    }

    /// Response timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forget any exchange in progress and assume application mode.
    pub fn reset(&mut self) {
        self.mode = SessionMode::Application;
        self.framer.reset();
        self.listening = false;
    }

    /// Take a SAPI message that arrived outside a wait, if any. Bytes
    /// received in application mode never produce one.
    pub fn take_message(&mut self) -> Option<SapiMessage> {
        self.framer.take_message()
    }

    /// One poll of the link. During a configuration exchange received bytes
    /// are also fed to the SAPI framer.
    pub fn pump<T: Transport + ?Sized>(&mut self, link: &mut LinkContext, transport: &mut T) -> usize {
        if !self.listening {
            return link.poll(transport);
        }
        let framer = &mut self.framer;
        link.poll_with(transport, |byte| framer.push(byte))
    }

    fn require(&self, expected: SessionMode) -> Result<(), SessionError> {
        if self.mode != expected {
            return Err(SessionError::WrongMode {
                expected,
                actual: self.mode,
            });
        }
        Ok(())
    }

    fn require_config(&self) -> Result<(), SessionError> {
        if self.mode == SessionMode::Application {
            return Err(SessionError::WrongMode {
                expected: SessionMode::ConfigLoggedOut,
                actual: self.mode,
            });
        }
        Ok(())
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    fn timed_out(&self) -> SessionError {
        SessionError::Timeout(self.timeout.as_millis() as u64)
    }

    /// Pump until the transmit slot is free.
    fn wait_idle<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        deadline: Instant,
    ) -> Result<(), SessionError> {
        while !link.is_idle() {
            if Instant::now() >= deadline {
                warn!("Session[{}]: transmit slot still busy at deadline", link.id());
                return Err(self.timed_out());
            }
            if self.pump(link, transport) == 0 {
                thread::sleep(POLL_INTERVAL);
            }
        }
        Ok(())
    }

    /// Pump until the framer holds a message.
    fn wait_response<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        deadline: Instant,
    ) -> Result<SapiMessage, SessionError> {
        loop {
            let read = self.pump(link, transport);
            if let Some(message) = self.framer.take_message() {
                trace!(
                    "Session[{}]: response {:?} ({} data bytes)",
                    link.id(),
                    message.response(),
                    message.data_len
                );
                return Ok(message);
            }
            if Instant::now() >= deadline {
                warn!("Session[{}]: no response within {:?}", link.id(), self.timeout);
                return Err(self.timed_out());
            }
            if read == 0 {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    /// Enqueue a SAPI command and write it out straight away.
    fn send_sapi<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        command: SapiCommand<'_>,
        deadline: Instant,
    ) -> Result<(), SessionError> {
        let frame = command.encode()?;
        self.wait_idle(link, transport, deadline)?;
        link.enqueue(&frame, SESSION_TOKEN)?;
        debug!("Session[{}]: sent {:02X?}", link.id(), command.code());
        link.on_ready_to_send(transport);
        Ok(())
    }

    /// Switch the module to configuration mode.
    pub fn enter_config_mode<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
    ) -> Result<(), SessionError> {
        self.require(SessionMode::Application)?;
        self.framer.reset();
        self.listening = true;
        let switched = self.switch_to_bootloader(link, transport);
        if switched.is_err() {
            self.withdraw(link);
            self.listening = false;
        }
        switched
    }

    fn switch_to_bootloader<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
    ) -> Result<(), SessionError> {
        let deadline = self.deadline();
        self.wait_idle(link, transport, deadline)?;
        link.send(&Command::Raw { bytes: &[SAPI_MODE_SWITCH] }, SESSION_TOKEN)?;
        debug!("Session[{}]: requested configuration mode", link.id());

        let response = self.wait_response(link, transport, deadline)?.response();
        match response {
            SapiResponse::BootloaderStarted => {
                self.mode = SessionMode::ConfigLoggedOut;
                debug!("Session[{}]: bootloader started", link.id());
                Ok(())
            }
            other => Err(SessionError::UnexpectedResponse(other)),
        }
    }

    /// Log in with the configured password.
    pub fn login<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
    ) -> Result<(), SessionError> {
        self.require_config()?;
        let deadline = self.deadline();
        let command = SapiCommand::Login {
            password: *self.password.as_bytes(),
        };
        self.send_sapi(link, transport, command, deadline)?;

        match self.wait_response(link, transport, deadline)?.response() {
            SapiResponse::LoginOk => {
                self.mode = SessionMode::ConfigLoggedIn;
                debug!("Session[{}]: logged in", link.id());
                Ok(())
            }
            SapiResponse::LoginError => {
                warn!("Session[{}]: login rejected", link.id());
                Err(SessionError::LoginRejected)
            }
            other => Err(SessionError::UnexpectedResponse(other)),
        }
    }

    /// Read a setting from flash.
    pub fn get_setting<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        setting: Setting,
    ) -> Result<Vec<u8>, SessionError> {
        self.require(SessionMode::ConfigLoggedIn)?;
        let deadline = self.deadline();
        self.send_sapi(link, transport, SapiCommand::GetSetting { id: setting.id() }, deadline)?;

        let message = self.wait_response(link, transport, deadline)?;
        match message.response() {
            SapiResponse::SettingValue => Ok(message.data().to_vec()),
            other => Err(SessionError::UnexpectedResponse(other)),
        }
    }

    /// Write a setting. Takes effect after [`commit_settings`](Self::commit_settings).
    pub fn set_setting<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        setting: Setting,
        value: &[u8],
    ) -> Result<(), SessionError> {
        self.require(SessionMode::ConfigLoggedIn)?;
        setting.check(value)?;
        let deadline = self.deadline();
        let command = SapiCommand::SetSetting {
            id: setting.id(),
            value,
        };
        self.send_sapi(link, transport, command, deadline)?;
        self.expect_acknowledgement(link, transport, deadline)
    }

    /// Persist written settings.
    pub fn commit_settings<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
    ) -> Result<(), SessionError> {
        self.require(SessionMode::ConfigLoggedIn)?;
        let deadline = self.deadline();
        self.send_sapi(link, transport, SapiCommand::CommitSettings, deadline)?;
        self.expect_acknowledgement(link, transport, deadline)
    }

    fn expect_acknowledgement<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        deadline: Instant,
    ) -> Result<(), SessionError> {
        match self.wait_response(link, transport, deadline)?.response() {
            SapiResponse::LoginError => Err(SessionError::LoginRejected),
            SapiResponse::ProtocolError => {
                Err(SessionError::UnexpectedResponse(SapiResponse::ProtocolError))
            }
            _ => Ok(()),
        }
    }

    /// Drop a frame this session queued that has not started going out.
    fn withdraw(&self, link: &mut LinkContext) {
        if link.pending_token() == Some(SESSION_TOKEN) && link.cancel().is_ok() {
            debug!("Session[{}]: withdrew unsent frame", link.id());
        }
    }

    /// Leave configuration mode and restart normal operation.
    pub fn start_protocol_stack<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
    ) -> Result<(), SessionError> {
        self.require_config()?;
        self.restart(link, transport)
    }

    /// Restart regardless of the tracked mode. The module may have entered
    /// the bootloader even when the host never saw it confirmed.
    fn restart<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
    ) -> Result<(), SessionError> {
        self.withdraw(link);
        self.framer.reset();
        self.listening = true;
        let sent = self.send_sapi(link, transport, SapiCommand::StartProtocolStack, self.deadline());
        self.mode = SessionMode::Application;
        if let Err(e) = sent {
            self.listening = false;
            return Err(e);
        }

        let mut result = Ok(());
        for _ in 0..self.drain {
            match self.wait_response(link, transport, self.deadline()) {
                Ok(message) => match message.response() {
                    SapiResponse::ProtocolStarted => {
                        debug!("Session[{}]: protocol stack started", link.id());
                        result = Ok(());
                        break;
                    }
                    SapiResponse::ProtocolError => {
                        warn!("Session[{}]: protocol stack failed to start", link.id());
                        result = Err(SessionError::UnexpectedResponse(SapiResponse::ProtocolError));
                    }
                    other => trace!("Session[{}]: drained {:?}", link.id(), other),
                },
                Err(_) => break,
            }
        }
        self.listening = false;
        result
    }

    /// Switch, log in, write and commit one setting, then restart.
    ///
    /// The restart is always attempted, also after a failed step, so the
    /// module is not left in the bootloader. The first failure is returned.
    pub fn change_setting<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        setting: Setting,
        value: &[u8],
    ) -> Result<(), SessionError> {
        setting.check(value)?;
        let configured = self.configure(link, transport, setting, value);
        if let Err(e) = &configured {
            warn!("Session[{}]: changing {:?} failed: {}", link.id(), setting, e);
        }
        let restarted = self.restart(link, transport);
        configured.and(restarted)
    }

    fn configure<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        setting: Setting,
        value: &[u8],
    ) -> Result<(), SessionError> {
        self.enter_config_mode(link, transport)?;
        self.login(link, transport)?;
        self.set_setting(link, transport, setting, value)?;
        self.commit_settings(link, transport)
    }

    /// Switch, log in and read one setting, then restart.
    pub fn read_setting<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        setting: Setting,
    ) -> Result<Vec<u8>, SessionError> {
        let value = self.fetch(link, transport, setting);
        let restarted = self.restart(link, transport);
        let value = value?;
        restarted?;
        Ok(value)
    }

    fn fetch<T: Transport + ?Sized>(
        &mut self,
        link: &mut LinkContext,
        transport: &mut T,
        setting: Setting,
    ) -> Result<Vec<u8>, SessionError> {
        self.enter_config_mode(link, transport)?;
        self.login(link, transport)?;
        self.get_setting(link, transport, setting)
    }
}
