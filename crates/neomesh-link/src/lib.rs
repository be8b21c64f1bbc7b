//! NeoMesh link layer
//!
//! One [`LinkContext`] per UART connected to a NeoMesh module. It turns the
//! received byte stream into validated frames for the application handlers
//! and holds the single outbound frame until the module raises CTS.
//!
//! # Architecture
//!
//! ```text
//! Transport::receive ─► FrameAssembler ─► HandlerTable::dispatch ─► handlers
//!
//! LinkContext::send ─► OutboundQueue ─(CTS)─► Transport::transmit ─► on_written
//! ```
//!
//! Line edges (nWU, CTS, transmit complete) may be raised from interrupt
//! context through [`LinkSignals`]; the poll loop consumes them.
//!
//! # Example
//!
//! ```rust,ignore
//! use neomesh_link::{LinkConfig, LinkContext, LinkId, Token};
//! use neomesh_protocol::Command;
//!
//! let mut link = LinkContext::new(LinkId(0), LinkConfig::default());
//! link.handlers_mut().on_host_ack(|id, ack| println!("{id}: ack from {}", ack.origin_id));
//! link.on_sync();
//!
//! link.send(&Command::send_acknowledged(0x0042, 1, b"hello"), Token(1))?;
//! loop {
//!     link.poll(&mut uart);
//! }
//! ```

mod assembler;
mod link;
mod queue;
mod router;
mod signals;
mod transport;

pub use assembler::{FrameAssembler, OverflowPolicy};
pub use link::{LinkConfig, LinkContext, LinkId};
pub use queue::{OutboundQueue, Token};
pub use router::HandlerTable;
pub use signals::LinkSignals;
pub use transport::{Transport, TxStatus};
