//! Handler table and frame dispatch.
//!
//! Every inbound message type has one optional handler slot. An empty slot
//! is simply `None`; the frame is then seen only by the raw handler.

use neomesh_protocol::*;
use tracing::{debug, trace};

use crate::link::LinkId;
use crate::queue::Token;

type RawHandler = Box<dyn FnMut(LinkId, &[u8])>;
type WrittenHandler = Box<dyn FnMut(LinkId, Token, &[u8])>;
type Handler<T> = Box<dyn FnMut(LinkId, &T)>;

/// Application callbacks for one link.
#[derive(Default)]
pub struct HandlerTable {
    raw: Option<RawHandler>,
    written: Option<WrittenHandler>,
    host_ack: Option<Handler<HostAckNack>>,
    host_nack: Option<Handler<HostAckNack>>,
    uapp_sent: Option<Handler<HostUappStatus>>,
    uapp_dropped: Option<Handler<HostUappStatus>>,
    host_data: Option<Box<dyn FnMut(LinkId, &HostData<'_>)>>,
    host_data_hapa: Option<Box<dyn FnMut(LinkId, &HostDataHapa<'_>)>>,
    host_uapp_data: Option<Box<dyn FnMut(LinkId, &HostUappData<'_>)>>,
    host_uapp_data_hapa: Option<Box<dyn FnMut(LinkId, &HostUappDataHapa<'_>)>>,
    node_info: Option<Handler<NodeInfoReply>>,
    neighbor_list: Option<Handler<NeighborListReply>>,
    net_cmd_reply: Option<Box<dyn FnMut(LinkId, &NetCmdReply<'_>)>>,
    route_info: Option<Handler<RouteInfoReply>>,
    wes_status: Option<Handler<WesStatus>>,
    wes_setup_request: Option<Handler<WesSetupRequest>>,
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("registered", &self.registered())
            .finish()
    }
}

impl HandlerTable {
    /// Create a table with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    pub fn registered(&self) -> usize {
        [
            self.raw.is_some(),
            self.written.is_some(),
            self.host_ack.is_some(),
            self.host_nack.is_some(),
            self.uapp_sent.is_some(),
            self.uapp_dropped.is_some(),
            self.host_data.is_some(),
            self.host_data_hapa.is_some(),
            self.host_uapp_data.is_some(),
            self.host_uapp_data_hapa.is_some(),
            self.node_info.is_some(),
            self.neighbor_list.is_some(),
            self.net_cmd_reply.is_some(),
            self.route_info.is_some(),
            self.wes_status.is_some(),
            self.wes_setup_request.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }

    /// Whether a typed handler is registered for message type `kind`.
    pub fn handles(&self, kind: u8) -> bool {
        match kind {
            MSG_HOST_ACK => self.host_ack.is_some(),
            MSG_HOST_NACK => self.host_nack.is_some(),
            MSG_HOST_UAPP_SENT => self.uapp_sent.is_some(),
            MSG_HOST_UAPP_DROPPED => self.uapp_dropped.is_some(),
            MSG_HOST_DATA => self.host_data.is_some(),
            MSG_HOST_DATA_HAPA => self.host_data_hapa.is_some(),
            MSG_HOST_UAPP_DATA => self.host_uapp_data.is_some(),
            MSG_HOST_UAPP_DATA_HAPA => self.host_uapp_data_hapa.is_some(),
            MSG_NODE_INFO_REPLY => self.node_info.is_some(),
            MSG_NEIGHBOR_LIST_REPLY => self.neighbor_list.is_some(),
            MSG_NET_CMD_REPLY => self.net_cmd_reply.is_some(),
            MSG_ROUTE_INFO_REPLY => self.route_info.is_some(),
            MSG_WES_STATUS => self.wes_status.is_some(),
            MSG_WES_SETUP_REQUEST => self.wes_setup_request.is_some(),
            _ => false,
        }
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Called with every valid frame, before any typed handler.
    pub fn on_raw(&mut self, f: impl FnMut(LinkId, &[u8]) + 'static) -> &mut Self {
        self.raw = Some(Box::new(f));
        self
    }

    /// Called when an enqueued frame has been written to the module.
    pub fn on_written(&mut self, f: impl FnMut(LinkId, Token, &[u8]) + 'static) -> &mut Self {
        self.written = Some(Box::new(f));
        self
    }

    /// HostAck (0x50).
    pub fn on_host_ack(&mut self, f: impl FnMut(LinkId, &HostAckNack) + 'static) -> &mut Self {
        self.host_ack = Some(Box::new(f));
        self
    }

    /// HostNack (0x51).
    pub fn on_host_nack(&mut self, f: impl FnMut(LinkId, &HostAckNack) + 'static) -> &mut Self {
        self.host_nack = Some(Box::new(f));
        self
    }

    /// Uapp packet sent (0x56).
    pub fn on_uapp_sent(&mut self, f: impl FnMut(LinkId, &HostUappStatus) + 'static) -> &mut Self {
        self.uapp_sent = Some(Box::new(f));
        self
    }

    /// Uapp packet dropped (0x57).
    pub fn on_uapp_dropped(
        &mut self,
        f: impl FnMut(LinkId, &HostUappStatus) + 'static,
    ) -> &mut Self {
        self.uapp_dropped = Some(Box::new(f));
        self
    }

    /// HostData (0x52).
    pub fn on_host_data<F>(&mut self, f: F) -> &mut Self
    where
        F: FnMut(LinkId, &HostData<'_>) + 'static,
    {
        self.host_data = Some(Box::new(f));
        self
    }

    /// HostDataHapa (0x53).
    pub fn on_host_data_hapa<F>(&mut self, f: F) -> &mut Self
    where
        F: FnMut(LinkId, &HostDataHapa<'_>) + 'static,
    {
        self.host_data_hapa = Some(Box::new(f));
        self
    }

    /// HostUappData (0x54).
    pub fn on_host_uapp_data<F>(&mut self, f: F) -> &mut Self
    where
        F: FnMut(LinkId, &HostUappData<'_>) + 'static,
    {
        self.host_uapp_data = Some(Box::new(f));
        self
    }

    /// HostUappDataHapa (0x55).
    pub fn on_host_uapp_data_hapa<F>(&mut self, f: F) -> &mut Self
    where
        F: FnMut(LinkId, &HostUappDataHapa<'_>) + 'static,
    {
        self.host_uapp_data_hapa = Some(Box::new(f));
        self
    }

    /// NodeInfoReply (0x58).
    pub fn on_node_info(&mut self, f: impl FnMut(LinkId, &NodeInfoReply) + 'static) -> &mut Self {
        self.node_info = Some(Box::new(f));
        self
    }

    /// NeighborListReply (0x59).
    pub fn on_neighbor_list(
        &mut self,
        f: impl FnMut(LinkId, &NeighborListReply) + 'static,
    ) -> &mut Self {
        self.neighbor_list = Some(Box::new(f));
        self
    }

    /// NetCmdReply (0x5a).
    pub fn on_net_cmd_reply<F>(&mut self, f: F) -> &mut Self
    where
        F: FnMut(LinkId, &NetCmdReply<'_>) + 'static,
    {
        self.net_cmd_reply = Some(Box::new(f));
        self
    }

    /// RouteInfoReply (0x5c).
    pub fn on_route_info(&mut self, f: impl FnMut(LinkId, &RouteInfoReply) + 'static) -> &mut Self {
        self.route_info = Some(Box::new(f));
        self
    }

    /// WesStatus (0x60).
    pub fn on_wes_status(&mut self, f: impl FnMut(LinkId, &WesStatus) + 'static) -> &mut Self {
        self.wes_status = Some(Box::new(f));
        self
    }

    /// WesSetupRequest (0x61).
    pub fn on_wes_setup_request(
        &mut self,
        f: impl FnMut(LinkId, &WesSetupRequest) + 'static,
    ) -> &mut Self {
        self.wes_setup_request = Some(Box::new(f));
        self
    }

    /// Report a completed write.
    pub fn written(&mut self, link: LinkId, token: Token, frame: &[u8]) {
        if let Some(handler) = self.written.as_mut() {
            handler(link, token, frame);
        }
    }

    /// Hand one validated frame to the raw handler and then to the typed
    /// handler for its type. Frames are decoded only when a typed handler
    /// is registered.
    pub fn dispatch(&mut self, link: LinkId, frame: Frame<'_>) {
        if let Some(raw) = self.raw.as_mut() {
            raw(link, frame.as_bytes());
        }

        if !self.handles(frame.kind()) {
            trace!(
                "Link[{}]: no typed handler for type 0x{:02X} ({} bytes)",
                link,
                frame.kind(),
                frame.body().len()
            );
            return;
        }

        let message = match Inbound::decode(frame.as_bytes()) {
            Ok(message) => message,
            Err(e) => {
                debug!("Link[{}]: dropping undecodable frame: {}", link, e);
                return;
            }
        };

        match message {
            Inbound::HostAck(m) => call(&mut self.host_ack, link, &m),
            Inbound::HostNack(m) => call(&mut self.host_nack, link, &m),
            Inbound::UappSent(m) => call(&mut self.uapp_sent, link, &m),
            Inbound::UappDropped(m) => call(&mut self.uapp_dropped, link, &m),
            Inbound::HostData(m) => {
                if let Some(handler) = self.host_data.as_mut() {
                    handler(link, &m);
                }
            }
            Inbound::HostDataHapa(m) => {
                if let Some(handler) = self.host_data_hapa.as_mut() {
                    handler(link, &m);
                }
            }
            Inbound::HostUappData(m) => {
                if let Some(handler) = self.host_uapp_data.as_mut() {
                    handler(link, &m);
                }
            }
            Inbound::HostUappDataHapa(m) => {
                if let Some(handler) = self.host_uapp_data_hapa.as_mut() {
                    handler(link, &m);
                }
            }
            Inbound::NodeInfoReply(m) => call(&mut self.node_info, link, &m),
            Inbound::NeighborListReply(m) => call(&mut self.neighbor_list, link, &m),
            Inbound::NetCmdReply(m) => {
                if let Some(handler) = self.net_cmd_reply.as_mut() {
                    handler(link, &m);
                }
            }
            Inbound::RouteInfoReply(m) => call(&mut self.route_info, link, &m),
            Inbound::WesStatus(m) => call(&mut self.wes_status, link, &m),
            Inbound::WesSetupRequest(m) => call(&mut self.wes_setup_request, link, &m),
            Inbound::Unknown { .. } => {}
        }
    }
}

fn call<T>(slot: &mut Option<Handler<T>>, link: LinkId, message: &T) {
    if let Some(handler) = slot.as_mut() {
        handler(link, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn frame(bytes: &[u8]) -> Frame<'_> {
        Frame::parse(bytes).unwrap()
    }

    #[test]
    fn test_raw_runs_before_typed() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut table = HandlerTable::new();
        let o = order.clone();
        table.on_raw(move |_, _| o.borrow_mut().push("raw"));
        let o = order.clone();
        table.on_host_ack(move |_, _| o.borrow_mut().push("ack"));

        table.dispatch(LinkId(0), frame(&[MSG_HOST_ACK, 2, 0, 5]));
        assert_eq!(*order.borrow(), vec!["raw", "ack"]);
    }

    #[test]
    fn test_typed_handler_receives_fields() {
        let seen = Rc::new(RefCell::new(None));
        let mut table = HandlerTable::new();
        let s = seen.clone();
        table.on_host_data(move |link, data| {
            *s.borrow_mut() = Some((link, data.origin_id, data.port, data.payload.to_vec()));
        });

        let bytes = HostData { origin_id: 0x0203, packet_age: 1, port: 3, payload: &[9, 8] }.encode();
        table.dispatch(LinkId(2), frame(&bytes));
        assert_eq!(*seen.borrow(), Some((LinkId(2), 0x0203, 3, vec![9, 8])));
    }

    #[test]
    fn test_unknown_type_reaches_only_raw() {
        let raw = Rc::new(RefCell::new(0));
        let ack = Rc::new(RefCell::new(0));
        let mut table = HandlerTable::new();
        let r = raw.clone();
        table.on_raw(move |_, _| *r.borrow_mut() += 1);
        let a = ack.clone();
        table.on_host_ack(move |_, _| *a.borrow_mut() += 1);

        table.dispatch(LinkId(0), frame(&[0x7E, 1, 0]));
        assert_eq!(*raw.borrow(), 1);
        assert_eq!(*ack.borrow(), 0);
    }

    #[test]
    fn test_ack_and_nack_are_separate_slots() {
        let nacks = Rc::new(RefCell::new(Vec::new()));
        let mut table = HandlerTable::new();
        let n = nacks.clone();
        table.on_host_nack(move |_, m| n.borrow_mut().push(m.origin_id));

        table.dispatch(LinkId(0), frame(&[MSG_HOST_ACK, 2, 0, 1]));
        table.dispatch(LinkId(0), frame(&[MSG_HOST_NACK, 2, 0, 2]));
        assert_eq!(*nacks.borrow(), vec![2]);
    }

    #[test]
    fn test_registered_and_clear() {
        let mut table = HandlerTable::new();
        assert_eq!(table.registered(), 0);
        table.on_wes_status(|_, _| {}).on_node_info(|_, _| {});
        assert_eq!(table.registered(), 2);
        table.clear();
        assert_eq!(table.registered(), 0);
    }

    #[test]
    fn test_typed_slot_lookup_by_kind() {
        let mut table = HandlerTable::new();
        table.on_raw(|_, _| {});
        assert!(!table.handles(MSG_NEIGHBOR_LIST_REPLY));

        table.on_neighbor_list(|_, _| {}).on_host_ack(|_, _| {});
        assert!(table.handles(MSG_NEIGHBOR_LIST_REPLY));
        assert!(table.handles(MSG_HOST_ACK));
        assert!(!table.handles(MSG_HOST_NACK));
        assert!(!table.handles(0x7E));
    }

    #[test]
    fn test_raw_only_table_still_sees_known_types() {
        let raw = Rc::new(RefCell::new(Vec::new()));
        let mut table = HandlerTable::new();
        let r = raw.clone();
        table.on_raw(move |_, bytes| r.borrow_mut().push(bytes[0]));

        let bytes = NeighborListReply {
            neighbors: vec![Neighbor { node_id: 4, rssi: 20 }],
            extension: None,
        }
        .encode();
        table.dispatch(LinkId(0), frame(&bytes));
        assert_eq!(*raw.borrow(), vec![MSG_NEIGHBOR_LIST_REPLY]);
    }
}
