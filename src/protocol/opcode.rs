//! Frame opcodes (RFC 6455 Section 5.2).

use std::fmt;

use crate::error::Error;

/// The six opcodes this engine understands.
///
/// Reserved nibbles (0x3-0x7, 0xB-0xF) have no variant; converting one with
/// [`TryFrom<u8>`] yields [`Error::ReservedOpcode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Next fragment of the message opened by a text/binary frame.
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    /// Ends the stream; the payload may start with a 16-bit status.
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl OpCode {
    /// Close, Ping and Pong. These are never fragmented and carry at most
    /// 125 payload bytes.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        self as u8 & 0x8 != 0
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    fn try_from(nibble: u8) -> Result<Self, Error> {
        Ok(match nibble {
            0x0 => OpCode::Continuation,
            0x1 => OpCode::Text,
            0x2 => OpCode::Binary,
            0x8 => OpCode::Close,
            0x9 => OpCode::Ping,
            0xA => OpCode::Pong,
            other => return Err(Error::ReservedOpcode(other)),
        })
    }
}

impl From<OpCode> for u8 {
    #[inline]
    fn from(opcode: OpCode) -> u8 {
        opcode as u8
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
