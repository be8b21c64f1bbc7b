//! NeoMesh module wire formats
//!
//! This crate describes the bytes exchanged between a host and a NeoCortec
//! NeoMesh radio module over UART. It performs no I/O.
//!
//! # Protocol Overview
//!
//! The module speaks two protocols on the same line:
//!
//! - **AAPI** (application protocol): always on. Every frame starts with a
//!   `{type, length}` header; see [`is_valid_frame`], [`Inbound`] and
//!   [`Command`].
//! - **SAPI** (configuration protocol): active while the module runs its
//!   bootloader. Frames are delimited by `0x3E` / `0x21`; see
//!   [`SapiFramer`] and [`SapiCommand`].
//!
//! All multi-byte fields are big-endian.
//!
//! # Example
//!
//! ```rust,ignore
//! use neomesh_protocol::{Command, Inbound, is_valid_frame, DEFAULT_TX_BUFFER_SIZE};
//!
//! // Build a command
//! let frame = Command::send_acknowledged(0x0042, 1, b"hi").encode(DEFAULT_TX_BUFFER_SIZE)?;
//!
//! // Parse a received frame
//! if let Some(len) = is_valid_frame(&received) {
//!     let message = Inbound::decode(&received[..len])?;
//! }
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod messages;
mod sapi;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use messages::*;
pub use sapi::*;
pub use types::*;
