//! Driver configuration.
//!
//! ```yaml
//! link:
//!   rx_buffer_size: 255
//!   tx_buffer_size: 32
//!   overflow: reset          # or shift-oldest
//! session:
//!   password: Lvl10
//!   response_timeout_ms: 250
//!   restart_drain_responses: 2
//! ```
//!
//! Every field is optional; missing ones take the defaults shown above.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use neomesh_link::LinkConfig;
use neomesh_protocol::{
    AAPI_HEADER_SIZE, DEFAULT_PASSWORD, SAPI_PASSWORD_SIZE, SEND_UNACK_PREAMBLE,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default wait for a configuration-mode response.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 250;

/// Default number of trailing responses read after restarting the stack.
pub const DEFAULT_RESTART_DRAIN_RESPONSES: u8 = 2;

/// The 5-byte SAPI login password.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Password([u8; SAPI_PASSWORD_SIZE]);

impl Password {
    /// Wrap password bytes. Only ASCII is accepted so the password survives
    /// a round trip through its string form.
    pub fn new(bytes: [u8; SAPI_PASSWORD_SIZE]) -> Result<Self, ConfigError> {
        if !bytes.is_ascii() {
            return Err(ConfigError::Invalid(
                "password must be ASCII".to_string(),
            ));
        }
        Ok(Password(bytes))
    }

    /// The password bytes.
    pub fn as_bytes(&self) -> &[u8; SAPI_PASSWORD_SIZE] {
        &self.0
    }
}

impl Default for Password {
    fn default() -> Self {
        Password(DEFAULT_PASSWORD)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(*****)")
    }
}

impl TryFrom<&str> for Password {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes: [u8; SAPI_PASSWORD_SIZE] = value.as_bytes().try_into().map_err(|_| {
            ConfigError::Invalid(format!(
                "password must be exactly {} bytes, got {}",
                SAPI_PASSWORD_SIZE,
                value.len()
            ))
        })?;
        Password::new(bytes)
    }
}

impl TryFrom<String> for Password {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Password::try_from(value.as_str())
    }
}

impl From<Password> for String {
    fn from(value: Password) -> Self {
        value.0.iter().map(|&b| char::from(b)).collect()
    }
}

/// Configuration-mode behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Login password.
    pub password: Password,
    /// How long to wait for each response, in milliseconds.
    pub response_timeout_ms: u64,
    /// Trailing responses to read after restarting the protocol stack.
    pub restart_drain_responses: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            password: Password::default(),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            restart_drain_responses: DEFAULT_RESTART_DRAIN_RESPONSES,
        }
    }
}

impl SessionConfig {
    /// The response timeout as a `Duration`.
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NeomeshConfig {
    /// Link buffers.
    pub link: LinkConfig,
    /// Configuration-mode behaviour.
    pub session: SessionConfig,
}

impl NeomeshConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: NeomeshConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.link.rx_buffer_size < AAPI_HEADER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "rx_buffer_size must be at least {}",
                AAPI_HEADER_SIZE
            )));
        }
        let min_tx = AAPI_HEADER_SIZE + usize::from(SEND_UNACK_PREAMBLE);
        if self.link.tx_buffer_size < min_tx {
            return Err(ConfigError::Invalid(format!(
                "tx_buffer_size must be at least {}",
                min_tx
            )));
        }
        if self.session.response_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "response_timeout_ms must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NeomeshConfig::default();
        assert_eq!(config.link.rx_buffer_size, 255);
        assert_eq!(config.link.tx_buffer_size, 32);
        assert_eq!(config.session.password.as_bytes(), b"Lvl10");
        assert_eq!(config.session.response_timeout(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_password_length_checked() {
        assert!(Password::try_from("Lvl10").is_ok());
        assert!(matches!(Password::try_from("short"), Ok(_)));
        assert!(matches!(Password::try_from("toolong"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_password_debug_is_redacted() {
        assert_eq!(format!("{:?}", Password::default()), "Password(*****)");
    }

    #[test]
    fn test_password_roundtrip_yaml() {
        let config = SessionConfig {
            password: Password::new(*b"abcde").unwrap(),
            ..SessionConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: SessionConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_password_rejects_non_ascii() {
        assert!(matches!(
            Password::new([0x4c, 0x76, 0xff, 0x31, 0x30]),
            Err(ConfigError::Invalid(_))
        ));
        // Five bytes of UTF-8, but not ASCII.
        assert!(matches!(Password::try_from("Lvé1"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_password_string_form_is_lossless() {
        let password = Password::new(*b"a~Z0!").unwrap();
        let text: String = password.into();
        assert_eq!(text.as_bytes(), password.as_bytes());
        assert_eq!(Password::try_from(text).unwrap(), password);
    }
}
