//! NeoMesh host driver
//!
//! Drives a NeoCortec NeoMesh radio module over any byte [`Transport`]:
//! application traffic through the link layer, persistent settings through
//! a configuration-mode [`SessionController`], both behind the [`Neomesh`]
//! facade.
//!
//! # Example
//!
//! ```rust,ignore
//! use neomesh::{Neomesh, NeomeshConfig};
//! use neomesh_link::Token;
//!
//! let config = NeomeshConfig::load("neomesh.yaml")?;
//! let mut module = Neomesh::new(uart, config);
//! module.handlers_mut().on_host_data(|_, data| {
//!     println!("{} bytes from {}", data.payload.len(), data.origin_id);
//! });
//! module.start();
//!
//! module.change_node_id(0x0042)?;
//! module.send_acknowledged(0x0010, 1, b"hello", Token(1))?;
//! loop {
//!     module.update();
//! }
//! ```

mod config;
mod error;
mod node;
mod session;

pub use config::*;
pub use error::*;
pub use node::Neomesh;
pub use session::*;

pub use neomesh_link::{
    HandlerTable, LinkConfig, LinkContext, LinkId, LinkSignals, OverflowPolicy, Token, Transport,
    TxStatus,
};
