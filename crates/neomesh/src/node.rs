//! The `Neomesh` facade: one module, one transport.

use std::sync::Arc;

use neomesh_link::{HandlerTable, LinkContext, LinkId, LinkSignals, Token, Transport};
use neomesh_protocol::{
    AltCmd, ApiResult, Command, NetCmd, Uid, WesCmd, NETWORK_ID_SIZE, WES_APP_SETTINGS_LENGTH,
};
use tracing::{debug, info};

use crate::config::{NeomeshConfig, Password};
use crate::error::SessionError;
use crate::session::{SessionController, SessionMode, Setting};

/// A NeoMesh module attached to `transport`.
///
/// Owns the link state, the transport and the configuration session, and
/// exposes the application and configuration operations on one value.
pub struct Neomesh<T: Transport> {
    link: LinkContext,
    transport: T,
    session: SessionController,
}

impl<T: Transport> Neomesh<T> {
    /// Create a driver for link 0.
    pub fn new(transport: T, config: NeomeshConfig) -> Self {
        Self::with_link_id(LinkId(0), transport, config)
    }

    /// Create a driver with an explicit link id.
    pub fn with_link_id(id: LinkId, transport: T, config: NeomeshConfig) -> Self {
        Neomesh {
            link: LinkContext::new(id, config.link),
            session: SessionController::new(&config.session),
            transport,
        }
    }

    /// Reset the link and synchronise the receiver.
    pub fn start(&mut self) {
        info!("Neomesh[{}]: starting", self.link.id());
        self.link.reset();
        self.session.reset();
        self.link.on_sync();
    }

    /// Run one pass of the poll loop. Returns the number of bytes read.
    pub fn update(&mut self) -> usize {
        self.session.pump(&mut self.link, &mut self.transport)
    }

    /// Application callbacks.
    pub fn handlers_mut(&mut self) -> &mut HandlerTable {
        self.link.handlers_mut()
    }

    /// Handle for code watching the CTS and nWU lines.
    pub fn signals(&self) -> Arc<LinkSignals> {
        self.link.signals()
    }

    /// The link state.
    pub fn link(&self) -> &LinkContext {
        &self.link
    }

    /// The link state, mutably.
    pub fn link_mut(&mut self) -> &mut LinkContext {
        &mut self.link
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Current session mode.
    pub fn mode(&self) -> SessionMode {
        self.session.mode()
    }

    /// `Ok` when the transmit slot is free, `Busy` otherwise.
    pub fn status(&self) -> ApiResult<()> {
        self.link.status()
    }

    /// Drop the enqueued frame without notification.
    pub fn cancel(&mut self) -> ApiResult<()> {
        self.link.cancel()
    }

    /// Acknowledged send.
    pub fn send_acknowledged(
        &mut self,
        dest_node_id: u16,
        port: u8,
        payload: &[u8],
        token: Token,
    ) -> ApiResult<()> {
        self.link
            .send(&Command::send_acknowledged(dest_node_id, port, payload), token)
    }

    /// Unacknowledged send.
    pub fn send_unacknowledged(
        &mut self,
        dest_node_id: u16,
        port: u8,
        app_seq_no: u16,
        payload: &[u8],
        token: Token,
    ) -> ApiResult<()> {
        let command = Command::send_unacknowledged(dest_node_id, port, app_seq_no, payload);
        self.link.send(&command, token)
    }

    /// WES command.
    pub fn send_wes_command(&mut self, cmd: WesCmd, token: Token) -> ApiResult<()> {
        self.link.send(&Command::WesCmd { cmd }, token)
    }

    /// Answer a WES setup request, assigning `node_id` to the module with
    /// `uid` (low 40 bits). Application settings are sent as zeros.
    pub fn send_wes_response(&mut self, uid: u64, node_id: u16, token: Token) -> ApiResult<()> {
        let command = Command::WesResponse {
            uid: Uid::from_u64(uid),
            node_id,
            app_settings: [0; WES_APP_SETTINGS_LENGTH],
        };
        self.link.send(&command, token)
    }

    /// ALT command.
    pub fn send_alt_command(&mut self, cmd: AltCmd, token: Token) -> ApiResult<()> {
        self.link.send(&Command::AltCmd { cmd }, token)
    }

    /// Ask for the attached module's node info.
    pub fn request_node_info(&mut self, token: Token) -> ApiResult<()> {
        self.link.send(&Command::NodeInfoRequest, token)
    }

    /// Ask for the attached module's neighbor list.
    pub fn request_neighbor_list(&mut self, token: Token) -> ApiResult<()> {
        self.link.send(&Command::NeighborListRequest, token)
    }

    /// Ask for the attached module's route bitmap.
    pub fn request_route_info(&mut self, token: Token) -> ApiResult<()> {
        self.link.send(&Command::RouteInfoRequest, token)
    }

    /// Network command.
    pub fn send_net_cmd(
        &mut self,
        dest_node_id: u16,
        cmd: NetCmd,
        payload: &[u8],
        token: Token,
    ) -> ApiResult<()> {
        self.link.send(&Command::net_cmd(dest_node_id, cmd, payload), token)
    }

    /// Replace the configuration-mode password.
    pub fn set_password(&mut self, password: Password) {
        self.session.set_password(password);
    }

    /// Persistently change one setting.
    pub fn change_setting(&mut self, setting: Setting, value: &[u8]) -> Result<(), SessionError> {
        debug!("Neomesh[{}]: changing {:?}", self.link.id(), setting);
        self.session
            .change_setting(&mut self.link, &mut self.transport, setting, value)
    }

    /// Read one setting from flash.
    pub fn read_setting(&mut self, setting: Setting) -> Result<Vec<u8>, SessionError> {
        self.session
            .read_setting(&mut self.link, &mut self.transport, setting)
    }

    /// Persistently change the node id.
    pub fn change_node_id(&mut self, node_id: u16) -> Result<(), SessionError> {
        self.change_setting(Setting::NodeId, &node_id.to_be_bytes())
    }

    /// Persistently change the network id.
    pub fn change_network_id(&mut self, network_id: &[u8; NETWORK_ID_SIZE]) -> Result<(), SessionError> {
        self.change_setting(Setting::NetworkId, network_id)
    }

    /// Persistently change the trace output selection.
    pub fn change_trace_output(&mut self, trace_output: u8) -> Result<(), SessionError> {
        self.change_setting(Setting::TraceOutput, &[trace_output])
    }
}
