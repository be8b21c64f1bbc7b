//! Per-UART link state.

use std::fmt;
use std::sync::Arc;

use neomesh_protocol::{
    ApiResult, Command, Frame, DEFAULT_RX_BUFFER_SIZE, DEFAULT_TX_BUFFER_SIZE, MAX_FIXED_FRAME_SIZE,
    SAPI_MAX_FRAME_SIZE,
};
use tracing::{debug, trace};

use crate::assembler::{FrameAssembler, OverflowPolicy};
use crate::queue::{OutboundQueue, Token};
use crate::router::HandlerTable;
use crate::signals::LinkSignals;
use crate::transport::{Transport, TxStatus};

/// Identifies a link (usually the UART index) in handler calls and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct LinkId(pub u8);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Buffer sizing for a link.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Receive buffer size in bytes.
    pub rx_buffer_size: usize,
    /// Transmit buffer size in bytes; bounds outbound payloads.
    pub tx_buffer_size: usize,
    /// Behaviour when the receive buffer fills up.
    pub overflow: OverflowPolicy,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            rx_buffer_size: DEFAULT_RX_BUFFER_SIZE,
            tx_buffer_size: DEFAULT_TX_BUFFER_SIZE,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// Everything the host keeps for one module connection.
///
/// The context is driven from a single poll loop. Edge notifications from
/// interrupt context go through the shared [`LinkSignals`] instead of
/// calling into the context directly.
pub struct LinkContext {
    id: LinkId,
    config: LinkConfig,
    assembler: FrameAssembler,
    queue: OutboundQueue,
    handlers: HandlerTable,
    signals: Arc<LinkSignals>,
}

impl fmt::Debug for LinkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkContext")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("assembler", &self.assembler)
            .field("queue", &self.queue)
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl LinkContext {
    /// Create an idle, unsynchronised link.
    pub fn new(id: LinkId, config: LinkConfig) -> Self {
        let assembler = FrameAssembler::new(config.rx_buffer_size, config.overflow);
        // The slot always has room for the fixed-layout commands and for SAPI
        // frames; the configured size bounds variable payloads at encode time.
        let slot = config
            .tx_buffer_size
            .max(MAX_FIXED_FRAME_SIZE)
            .max(SAPI_MAX_FRAME_SIZE);
        let queue = OutboundQueue::new(slot);
        LinkContext {
            id,
            config,
            assembler,
            queue,
            handlers: HandlerTable::new(),
            signals: Arc::new(LinkSignals::new()),
        }
    }

    /// Link identifier.
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Configuration the link was built with.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Return to the freshly constructed state. Handlers stay registered.
    pub fn reset(&mut self) {
        debug!("Link[{}]: reset", self.id);
        self.assembler.reset();
        self.queue.clear();
        self.signals.clear();
    }

    /// Handle for interrupt or line-watcher code.
    pub fn signals(&self) -> Arc<LinkSignals> {
        Arc::clone(&self.signals)
    }

    /// Application callbacks.
    pub fn handlers_mut(&mut self) -> &mut HandlerTable {
        &mut self.handlers
    }

    /// Whether the receive side has been synchronised.
    pub fn is_synced(&self) -> bool {
        self.assembler.is_synced()
    }

    /// Whether the transmit slot is free.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Token of the frame waiting in the transmit slot, if any.
    pub fn pending_token(&self) -> Option<Token> {
        self.queue.pending()
    }

    /// `Ok` when idle, `Busy` otherwise.
    pub fn status(&self) -> ApiResult<()> {
        self.queue.status()
    }

    /// nWU edge: the next received byte starts a frame.
    pub fn on_sync(&mut self) {
        trace!("Link[{}]: receiver synced", self.id);
        self.assembler.sync();
    }

    /// Feed one received byte, dispatching a frame when it completes.
    pub fn on_byte(&mut self, byte: u8) {
        if let Some(len) = self.assembler.push(byte) {
            if let Some(frame) = Frame::parse(&self.assembler.buffered()[..len]) {
                trace!(
                    "Link[{}]: frame 0x{:02X}, {} body bytes",
                    self.id,
                    frame.kind(),
                    frame.declared_len()
                );
                self.handlers.dispatch(self.id, frame);
            }
            self.assembler.clear();
        }
    }

    /// CTS edge: realign the receiver and write the armed frame, if any.
    pub fn on_ready_to_send<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        self.assembler.sync();
        let Some(frame) = self.queue.begin_transmit() else {
            return;
        };
        trace!("Link[{}]: transmitting {} bytes", self.id, frame.len());
        match transport.transmit(frame) {
            TxStatus::Complete => self.on_send_complete(),
            TxStatus::Pending => trace!("Link[{}]: transmit pending", self.id),
        }
    }

    /// The transport finished writing: free the slot and notify.
    pub fn on_send_complete(&mut self) {
        if let Some((token, frame)) = self.queue.finish() {
            debug!("Link[{}]: frame written ({} bytes)", self.id, frame.len());
            self.handlers.written(self.id, token, &frame);
        }
    }

    /// Place a pre-encoded frame in the transmit slot.
    pub fn enqueue(&mut self, frame: &[u8], token: Token) -> ApiResult<()> {
        self.queue.enqueue(frame, token)?;
        debug!("Link[{}]: enqueued {} bytes", self.id, frame.len());
        Ok(())
    }

    /// Validate, encode and enqueue a command.
    pub fn send(&mut self, command: &Command<'_>, token: Token) -> ApiResult<()> {
        let frame = command.encode(self.config.tx_buffer_size)?;
        self.enqueue(&frame, token)
    }

    /// Drop the armed frame without notification.
    pub fn cancel(&mut self) -> ApiResult<()> {
        self.queue.cancel()?;
        debug!("Link[{}]: enqueued frame cancelled", self.id);
        Ok(())
    }

    /// One pass of the poll loop. Returns the number of bytes read.
    pub fn poll<T: Transport + ?Sized>(&mut self, transport: &mut T) -> usize {
        self.poll_with(transport, |_| {})
    }

    /// Like [`poll`](Self::poll), also handing every received byte to `tap`.
    ///
    /// Pending signals are handled first, in the order wake, transmit
    /// complete, ready to send.
    pub fn poll_with<T, F>(&mut self, transport: &mut T, mut tap: F) -> usize
    where
        T: Transport + ?Sized,
        F: FnMut(u8),
    {
        if self.signals.take_wake() {
            self.on_sync();
        }
        if self.signals.take_transmit_complete() {
            self.on_send_complete();
        }
        if self.signals.take_ready_to_send() {
            self.on_ready_to_send(transport);
        }

        let mut count = 0;
        while let Some(byte) = transport.receive() {
            self.on_byte(byte);
            tap(byte);
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neomesh_protocol::{ApiError, MSG_HOST_ACK};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Loopback {
        rx: VecDeque<u8>,
        written: Vec<Vec<u8>>,
        pending: bool,
    }

    impl Transport for Loopback {
        fn transmit(&mut self, frame: &[u8]) -> TxStatus {
            self.written.push(frame.to_vec());
            if self.pending {
                TxStatus::Pending
            } else {
                TxStatus::Complete
            }
        }

        fn receive(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
    }

    #[test]
    fn test_frame_waits_for_cts() {
        let mut link = LinkContext::new(LinkId(0), LinkConfig::default());
        let mut transport = Loopback::default();
        link.send(&Command::NodeInfoRequest, Token(7)).unwrap();
        link.poll(&mut transport);
        assert!(transport.written.is_empty());

        link.signals().ready_to_send();
        link.poll(&mut transport);
        assert_eq!(transport.written, vec![vec![0x08, 0x00]]);
        assert!(link.is_idle());
    }

    #[test]
    fn test_written_handler_gets_token() {
        let seen = Rc::new(RefCell::new(None));
        let mut link = LinkContext::new(LinkId(1), LinkConfig::default());
        let s = seen.clone();
        link.handlers_mut()
            .on_written(move |id, token, frame| *s.borrow_mut() = Some((id, token, frame.to_vec())));
        let mut transport = Loopback::default();

        link.send(&Command::RouteInfoRequest, Token(42)).unwrap();
        link.on_ready_to_send(&mut transport);
        assert_eq!(*seen.borrow(), Some((LinkId(1), Token(42), vec![0x0c, 0x00])));
    }

    #[test]
    fn test_validation_error_leaves_slot_empty() {
        let mut link = LinkContext::new(LinkId(0), LinkConfig::default());
        let err = link.send(&Command::send_acknowledged(0, 0, &[1]), Token(0));
        assert_eq!(err, Err(ApiError::InvalidNodeId));
        assert!(link.is_idle());
    }

    #[test]
    fn test_wes_response_fits_default_slot() {
        let mut link = LinkContext::new(LinkId(0), LinkConfig::default());
        let cmd = Command::WesResponse {
            uid: neomesh_protocol::Uid::from_u64(1),
            node_id: 2,
            app_settings: [0; neomesh_protocol::WES_APP_SETTINGS_LENGTH],
        };
        link.send(&cmd, Token(0)).unwrap();
        assert_eq!(link.status(), Err(ApiError::Busy));
    }

    #[test]
    fn test_cts_resyncs_receiver() {
        let acks = Rc::new(RefCell::new(0));
        let mut link = LinkContext::new(LinkId(0), LinkConfig::default());
        let a = acks.clone();
        link.handlers_mut().on_host_ack(move |_, _| *a.borrow_mut() += 1);
        let mut transport = Loopback::default();

        link.signals().ready_to_send();
        transport.rx.extend([MSG_HOST_ACK, 2, 0, 1]);
        assert_eq!(link.poll(&mut transport), 4);
        assert_eq!(*acks.borrow(), 1);
    }

    #[test]
    fn test_pending_transmit_completes_via_signal() {
        let mut link = LinkContext::new(LinkId(0), LinkConfig::default());
        let mut transport = Loopback { pending: true, ..Default::default() };
        link.send(&Command::NeighborListRequest, Token(0)).unwrap();
        link.signals().ready_to_send();
        link.poll(&mut transport);
        assert!(!link.is_idle());
        assert_eq!(link.cancel(), Err(ApiError::TransmitPending));

        // A second CTS edge must not rewrite the frame.
        link.signals().ready_to_send();
        link.poll(&mut transport);
        assert_eq!(transport.written.len(), 1);

        link.signals().transmit_complete();
        link.poll(&mut transport);
        assert!(link.is_idle());
    }

    #[test]
    fn test_tap_sees_every_byte() {
        let mut link = LinkContext::new(LinkId(0), LinkConfig::default());
        let mut transport = Loopback::default();
        transport.rx.extend([0x3E, 0x03, 0x01, 0x80, 0x21]);
        let mut tapped = Vec::new();
        link.poll_with(&mut transport, |b| tapped.push(b));
        assert_eq!(tapped, vec![0x3E, 0x03, 0x01, 0x80, 0x21]);
    }

    #[test]
    fn test_reset_keeps_handlers() {
        let mut link = LinkContext::new(LinkId(0), LinkConfig::default());
        link.handlers_mut().on_raw(|_, _| {});
        link.on_sync();
        link.send(&Command::NodeInfoRequest, Token(0)).unwrap();
        link.reset();
        assert!(!link.is_synced());
        assert!(link.is_idle());
        assert_eq!(link.handlers_mut().registered(), 1);
    }
}
