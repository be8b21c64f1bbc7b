//! Error types for the NeoMesh driver.

use neomesh_protocol::{ApiError, ProtocolError, SapiResponse};
use thiserror::Error;

use crate::session::SessionMode;

/// Errors from configuration-mode exchanges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No response arrived before the deadline.
    #[error("timed out after {0} ms waiting for the module")]
    Timeout(u64),

    /// The module answered with something other than what the step expects.
    #[error("unexpected response {0:?}")]
    UnexpectedResponse(SapiResponse),

    /// The module rejected the password.
    #[error("login rejected")]
    LoginRejected,

    /// The operation is not allowed in the current mode.
    #[error("operation needs {expected:?} mode, link is in {actual:?}")]
    WrongMode {
        /// Mode the operation needs.
        expected: SessionMode,
        /// Current mode.
        actual: SessionMode,
    },

    /// The setting value is not acceptable.
    #[error("invalid setting value: {0}")]
    InvalidSetting(String),

    /// The command could not be enqueued.
    #[error("link error: {0}")]
    Api(#[from] ApiError),

    /// The command could not be encoded.
    #[error("encoding error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors loading a [`NeomeshConfig`](crate::NeomeshConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML did not parse.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
