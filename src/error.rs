//! Error types for the WebSocket protocol engine.
//!
//! Errors fall into four families: handshake failures (answered with an HTTP
//! status, no upgrade), protocol violations (answered with a Close frame),
//! transport failures (propagated verbatim) and resource failures (fatal for
//! the in-progress operation only).

use http::StatusCode;
use thiserror::Error;

use crate::message::CloseCode;
use crate::protocol::OpCode;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons the HTTP Upgrade exchange can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandshakeError {
    /// The request method was not `GET`.
    #[error("bad method: {0}")]
    BadMethod(String),

    /// `Upgrade` / `Connection` headers do not request a WebSocket upgrade.
    #[error("not websocket")]
    NotWebSocket,

    /// `Sec-WebSocket-Key` is missing or empty.
    #[error("missing key")]
    MissingKey,

    /// `Sec-WebSocket-Version` is missing or not "13".
    #[error("bad websocket version: {0:?}")]
    BadVersion(String),

    /// The location URL could not be built from scheme, host and path.
    #[error("bad location: {0}")]
    BadLocation(String),

    /// More than one subprotocol candidate was left unresolved.
    #[error("bad websocket protocol: {0} candidates unresolved")]
    UnresolvedProtocol(usize),

    /// The caller-supplied handshake hook refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The raw request head could not be parsed.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// The request head exceeded the configured size limit.
    #[error("request head too large: {size} bytes (max: {max})")]
    TooLarge {
        /// Bytes read so far.
        size: usize,
        /// Configured maximum.
        max: usize,
    },
}

impl HandshakeError {
    /// HTTP status written back to the peer for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            HandshakeError::BadMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            HandshakeError::Rejected(_) => StatusCode::FORBIDDEN,
            HandshakeError::TooLarge { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The Upgrade exchange failed; no frame traffic took place.
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Server received a frame without a masking key.
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Client received a frame carrying a masking key.
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Reserved bits set without a negotiated extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Reserved opcode (0x3-0x7, 0xB-0xF).
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame with FIN=0.
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload larger than 125 bytes.
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(u64),

    /// Continuation frame with no fragmented message in progress.
    #[error("Continuation frame outside a fragmented message")]
    UnexpectedContinuation,

    /// Text or binary frame while a fragmented message is still open.
    #[error("Data frame interleaved with an unfinished fragmented message")]
    InterleavedDataFrame,

    /// Extended length field used where a shorter encoding was required.
    #[error("Payload length {0} not minimally encoded")]
    NonMinimalLength(u64),

    /// Masking key of the wrong length.
    #[error("Masking key must be 4 bytes, got {0}")]
    InvalidMaskKey(usize),

    /// Invalid UTF-8 in a text message.
    #[error("Invalid UTF-8 in text message")]
    InvalidUtf8,

    /// Payload exceeds the configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared payload size.
        size: u64,
        /// Configured maximum.
        max: u64,
    },

    /// Close control payload of a single byte.
    #[error("Close frame payload of 1 byte")]
    InvalidClosePayload,

    /// Frame header or payload truncated by the transport.
    #[error("Unexpected EOF inside a frame")]
    UnexpectedEof,

    /// Outgoing payload type other than text or binary.
    #[error("Payload type must be Text or Binary, got {0}")]
    InvalidPayloadType(OpCode),

    /// A `read` or `recv_message` was dropped while it handled a control
    /// frame, so the position in the stream is lost.
    #[error("Read interrupted while handling a control frame")]
    ReadInterrupted,

    /// The connection is closed for writing.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Could not obtain a masking key from the OS random source.
    #[error("Random source unavailable: {0}")]
    Randomness(String),

    /// Transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a peer protocol violation.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Error::UnmaskedClientFrame
                | Error::MaskedServerFrame
                | Error::ReservedBitsSet
                | Error::ReservedOpcode(_)
                | Error::FragmentedControlFrame
                | Error::ControlFrameTooLarge(_)
                | Error::UnexpectedContinuation
                | Error::InterleavedDataFrame
                | Error::NonMinimalLength(_)
                | Error::InvalidMaskKey(_)
                | Error::InvalidUtf8
                | Error::InvalidClosePayload
        )
    }

    /// Close status that answers this error on the read path, if any.
    ///
    /// Transport and resource failures return `None`: the stream is no
    /// longer usable for a close frame.
    #[must_use]
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Error::InvalidUtf8 => Some(CloseCode::BadMessageData),
            e if e.is_protocol_error() => Some(CloseCode::ProtocolError),
            Error::FrameTooLarge { .. } => Some(CloseCode::TooBig),
            Error::ReadInterrupted => Some(CloseCode::InternalError),
            _ => None,
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
