//! Close status codes and reassembled application messages.

use crate::protocol::OpCode;

/// WebSocket close status code per RFC 6455 Section 7.4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000).
    #[default]
    Normal,
    /// Going away (1001). Server shutdown or browser navigating away.
    GoingAway,
    /// Protocol error (1002). Malformed frame or protocol violation.
    ProtocolError,
    /// Unsupported data (1003). Data type the endpoint cannot handle.
    UnsupportedData,
    /// Reserved (1004).
    Reserved,
    /// No status received (1005). Never sent on the wire.
    NoStatus,
    /// Abnormal closure (1006). Never sent on the wire.
    Abnormal,
    /// Bad message data (1007), e.g. non-UTF-8 in a text message.
    BadMessageData,
    /// Policy violation (1008).
    PolicyViolation,
    /// Message too big (1009).
    TooBig,
    /// Extension mismatch (1010). Client expected an extension the server did not negotiate.
    ExtensionMismatch,
    /// Internal error (1011).
    InternalError,
    /// Any other code (3000-4999 for applications, 1012-1014 registered).
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1004 => CloseCode::Reserved,
            1005 => CloseCode::NoStatus,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::BadMessageData,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::TooBig,
            1010 => CloseCode::ExtensionMismatch,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::Reserved => 1004,
            CloseCode::NoStatus => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::BadMessageData => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::TooBig => 1009,
            CloseCode::ExtensionMismatch => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Check if this close code MUST NOT be set in a Close frame.
    ///
    /// Valid on the wire are 1000-1003, 1007-1014 (1012-1014 registered
    /// with IANA) and 3000-4999. Everything else is unused or reserved by
    /// RFC 6455 Section 7.4.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        !matches!(self.as_u16(), 1000..=1003 | 1007..=1014 | 3000..=4999)
    }

    /// Big-endian wire encoding, the first two bytes of a Close payload.
    #[must_use]
    pub const fn to_be_bytes(&self) -> [u8; 2] {
        self.as_u16().to_be_bytes()
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// A complete application message reassembled from one or more data frames.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// A text message (UTF-8 validated).
    Text(String),
    /// A binary message.
    Binary(Vec<u8>),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// Opcode of the frame that started this message.
    #[must_use]
    pub const fn opcode(&self) -> OpCode {
        match self {
            Message::Text(_) => OpCode::Text,
            Message::Binary(_) => OpCode::Binary,
        }
    }

    /// Borrow the payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(data) => data,
        }
    }

    /// Consume and return the text content, if this is a text message.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(_) => None,
        }
    }

    /// Consume and return the payload bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Message::Text(s) => s.into_bytes(),
            Message::Binary(data) => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(1000), CloseCode::Normal);
        assert_eq!(CloseCode::from_u16(1001), CloseCode::GoingAway);
        assert_eq!(CloseCode::from_u16(1002), CloseCode::ProtocolError);
        assert_eq!(CloseCode::from_u16(1003), CloseCode::UnsupportedData);
        assert_eq!(CloseCode::from_u16(1004), CloseCode::Reserved);
        assert_eq!(CloseCode::from_u16(1005), CloseCode::NoStatus);
        assert_eq!(CloseCode::from_u16(1006), CloseCode::Abnormal);
        assert_eq!(CloseCode::from_u16(1007), CloseCode::BadMessageData);
        assert_eq!(CloseCode::from_u16(1008), CloseCode::PolicyViolation);
        assert_eq!(CloseCode::from_u16(1009), CloseCode::TooBig);
        assert_eq!(CloseCode::from_u16(1010), CloseCode::ExtensionMismatch);
        assert_eq!(CloseCode::from_u16(4000), CloseCode::Other(4000));
    }

    #[test]
    fn test_close_code_roundtrip_values() {
        for code in 1000..=1011u16 {
            assert_eq!(CloseCode::from_u16(code).as_u16(), code);
        }
    }

    #[test]
    fn test_close_code_reserved() {
        assert!(CloseCode::Reserved.is_reserved());
        assert!(CloseCode::NoStatus.is_reserved());
        assert!(CloseCode::Abnormal.is_reserved());
        assert!(CloseCode::Other(1015).is_reserved());
        assert!(CloseCode::Other(999).is_reserved());
        assert!(CloseCode::Other(1016).is_reserved());
        assert!(CloseCode::Other(2999).is_reserved());
        assert!(CloseCode::Other(5000).is_reserved());
        assert!(!CloseCode::Other(1012).is_reserved());
        assert!(!CloseCode::Other(3000).is_reserved());
        assert!(!CloseCode::Other(4999).is_reserved());
        assert!(!CloseCode::InternalError.is_reserved());
        assert!(!CloseCode::Normal.is_reserved());
        assert!(!CloseCode::ProtocolError.is_reserved());
    }

    #[test]
    fn test_close_code_wire_bytes() {
        assert_eq!(CloseCode::Normal.to_be_bytes(), [0x03, 0xe8]);
        assert_eq!(CloseCode::ProtocolError.to_be_bytes(), [0x03, 0xea]);
    }

    #[test]
    fn test_message_opcode() {
        assert_eq!(Message::text("hi").opcode(), OpCode::Text);
        assert_eq!(Message::binary(vec![1]).opcode(), OpCode::Binary);
    }

    #[test]
    fn test_message_accessors() {
        let msg = Message::text("hello");
        assert_eq!(msg.as_bytes(), b"hello");
        assert_eq!(msg.clone().into_text(), Some("hello".to_string()));
        assert_eq!(msg.into_bytes(), b"hello".to_vec());

        let msg = Message::binary(vec![1, 2, 3]);
        assert_eq!(msg.clone().into_text(), None);
        assert_eq!(msg.into_bytes(), vec![1, 2, 3]);
    }
}
