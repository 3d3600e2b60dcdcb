//! Configuration and limits for WebSocket connections.

use http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::message::CloseCode;

/// The only protocol version this engine speaks (RFC 6455).
pub const PROTOCOL_VERSION: u8 = 13;

/// `Sec-WebSocket-Version` value accepted during the handshake.
pub const SUPPORTED_VERSION: &str = "13";

/// Configuration limits for WebSocket connections.
///
/// These limits bound memory use per connection regardless of what the
/// peer declares on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single frame, and of a reassembled message.
    ///
    /// Default: 32 MB (32 << 20)
    pub max_payload_size: u64,

    /// Maximum size of the HTTP request head in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_payload_size: 32 << 20, // 32 MB
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_payload_size: u64, max_handshake_size: usize) -> Self {
        Self {
            max_payload_size,
            max_handshake_size,
        }
    }

    /// Create limits suitable for small embedded systems.
    ///
    /// - Max payload: 64 KB
    /// - Max handshake: 4 KB
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_payload_size: 64 * 1024,
            max_handshake_size: 4096,
        }
    }

    /// Create limits for unrestricted use.
    ///
    /// Warning: Use only in trusted environments.
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            max_payload_size: i64::MAX as u64,
            max_handshake_size: 64 * 1024,
        }
    }

    /// Validate that a declared payload size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`](crate::Error::FrameTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_payload_size(&self, size: u64) -> Result<(), crate::Error> {
        if size > self.max_payload_size {
            Err(crate::Error::FrameTooLarge {
                size,
                max: self.max_payload_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::TooLarge`](crate::HandshakeError::TooLarge) if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), crate::HandshakeError> {
        if size > self.max_handshake_size {
            Err(crate::HandshakeError::TooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Negotiated connection configuration.
///
/// The handshake fills in `location` and `protocols`; once the 101 response
/// has been written the value is frozen inside the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Negotiated protocol version. Always 13.
    pub version: u8,

    /// Canonical location of the endpoint (`ws://` or `wss://` + host + path).
    pub location: Option<Url>,

    /// Subprotocol candidates offered by the client.
    ///
    /// Not a server setting: reading the request replaces whatever is here
    /// with the client's `Sec-WebSocket-Protocol` list. A handshake hook must
    /// narrow it down to zero or one entry before the 101 response is
    /// written.
    pub protocols: Vec<String>,

    /// Extra headers sent with the 101 response.
    ///
    /// Protocol-reserved names (`Upgrade`, `Sec-WebSocket-*`, ...) are skipped.
    pub headers: HeaderMap,

    /// Resource limits.
    pub limits: Limits,

    /// Status sent by [`Connection::close`](crate::Connection::close).
    ///
    /// Default: [`CloseCode::Normal`]
    pub default_close_status: CloseCode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            location: None,
            protocols: Vec::new(),
            headers: HeaderMap::new(),
            limits: Limits::default(),
            default_close_status: CloseCode::Normal,
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Add an extra header to the 101 response.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the status used when the application closes the connection.
    #[must_use]
    pub fn with_default_close_status(mut self, code: CloseCode) -> Self {
        self.default_close_status = code;
        self
    }

    /// The single negotiated subprotocol, if any.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        match self.protocols.as_slice() {
            [one] => Some(one.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_payload_size, 32 * 1024 * 1024);
        assert_eq!(limits.max_handshake_size, 8192);
    }

    #[test]
    fn test_limits_embedded() {
        let limits = Limits::embedded();
        assert_eq!(limits.max_payload_size, 64 * 1024);
        assert_eq!(limits.max_handshake_size, 4096);
    }

    #[test]
    fn test_limits_check_payload_size() {
        let limits = Limits::default();
        assert!(limits.check_payload_size(1024).is_ok());
        assert!(limits.check_payload_size(32 << 20).is_ok());
        assert!(matches!(
            limits.check_payload_size((32 << 20) + 1),
            Err(crate::Error::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_limits_check_handshake_size() {
        let limits = Limits::default();
        assert!(limits.check_handshake_size(1024).is_ok());
        assert!(limits.check_handshake_size(10000).is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.version, 13);
        assert!(config.location.is_none());
        assert!(config.protocols.is_empty());
        assert!(config.headers.is_empty());
        assert_eq!(config.default_close_status, CloseCode::Normal);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_limits(Limits::embedded())
            .with_header(
                HeaderName::from_static("x-served-by"),
                HeaderValue::from_static("hybi"),
            )
            .with_default_close_status(CloseCode::GoingAway);

        assert_eq!(config.limits.max_payload_size, 64 * 1024);
        assert_eq!(config.headers["x-served-by"], "hybi");
        assert_eq!(config.default_close_status, CloseCode::GoingAway);
    }

    #[test]
    fn test_config_protocol_requires_single_candidate() {
        let mut config = Config::new();
        assert_eq!(config.protocol(), None);
        config.protocols = vec!["chat".into(), "superchat".into()];
        assert_eq!(config.protocol(), None);
        config.protocols.truncate(1);
        assert_eq!(config.protocol(), Some("chat"));
    }
}
