//! WebSocket frame header codec and streaming payload reader (RFC 6455).
//!
//! ## Frame Structure
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```
//!
//! The payload is never buffered here: a [`Frame`] only tracks how many of
//! its `length` bytes have been pulled from the transport, and unmasks each
//! chunk in place as it is read.

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::OpCode;

#[cfg(feature = "async-tokio")]
use crate::config::Limits;
#[cfg(feature = "async-tokio")]
use crate::protocol::mask::apply_mask_offset;
#[cfg(feature = "async-tokio")]
use tokio::io::{AsyncRead, AsyncReadExt};

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

const FIN_BIT: u8 = 0x80;
const RSV_BITS: [u8; 3] = [0x40, 0x20, 0x10];
const OPCODE_MASK: u8 = 0x0F;
const MASK_BIT: u8 = 0x80;
const LEN7_MASK: u8 = 0x7F;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// Decoded (or to-be-encoded) frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment flag.
    pub fin: bool,
    /// RSV1..RSV3. Must be zero: no extension is ever negotiated.
    pub rsv: [bool; 3],
    /// Frame opcode.
    pub opcode: OpCode,
    /// Payload length in bytes.
    pub length: u64,
    /// Masking key, present iff the sender is a client.
    pub masking_key: Option<[u8; 4]>,
}

impl FrameHeader {
    /// Create an unmasked header with no reserved bits set.
    #[must_use]
    pub const fn new(fin: bool, opcode: OpCode, length: u64) -> Self {
        Self {
            fin,
            rsv: [false; 3],
            opcode,
            length,
            masking_key: None,
        }
    }

    /// Attach a masking key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidMaskKey` unless `key` is exactly 4 bytes.
    pub fn with_masking_key(mut self, key: &[u8]) -> Result<Self> {
        let key: [u8; 4] = key
            .try_into()
            .map_err(|_| Error::InvalidMaskKey(key.len()))?;
        self.masking_key = Some(key);
        Ok(self)
    }

    /// Number of bytes [`encode`](Self::encode) will produce.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        let extended = if self.length <= 125 {
            0
        } else if self.length <= 0xFFFF {
            2
        } else {
            8
        };
        let mask = if self.masking_key.is_some() { 4 } else { 0 };
        2 + extended + mask
    }

    /// Serialize the header, choosing the shortest length encoding.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());

        let mut byte0 = u8::from(self.opcode);
        if self.fin {
            byte0 |= FIN_BIT;
        }
        for (set, bit) in self.rsv.iter().zip(RSV_BITS) {
            if *set {
                byte0 |= bit;
            }
        }
        buf.put_u8(byte0);

        let mask_bit = if self.masking_key.is_some() { MASK_BIT } else { 0 };
        if self.length <= 125 {
            buf.put_u8(mask_bit | self.length as u8);
        } else if self.length <= 0xFFFF {
            buf.put_u8(mask_bit | LEN_16);
            buf.put_u16(self.length as u16);
        } else {
            buf.put_u8(mask_bit | LEN_64);
            buf.put_u64(self.length);
        }

        if let Some(key) = self.masking_key {
            buf.put_slice(&key);
        }
    }

    /// Check the receive-side invariants that do not depend on role.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedBitsSet` if any RSV bit is set
    /// - `Error::FragmentedControlFrame` if a control frame has FIN=0
    /// - `Error::ControlFrameTooLarge` if a control payload exceeds 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.rsv.iter().any(|&bit| bit) {
            return Err(Error::ReservedBitsSet);
        }

        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.length > MAX_CONTROL_FRAME_PAYLOAD as u64 {
                return Err(Error::ControlFrameTooLarge(self.length));
            }
        }

        Ok(())
    }

    /// Header size announced by the second header byte (mask bit and
    /// length code).
    #[must_use]
    pub const fn wire_len(byte1: u8) -> usize {
        let extended = match byte1 & LEN7_MASK {
            LEN_16 => 2,
            LEN_64 => 8,
            _ => 0,
        };
        let mask = if byte1 & MASK_BIT != 0 { 4 } else { 0 };
        2 + extended + mask
    }

    /// Parse a complete header from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// - `Error::UnexpectedEof` if `bytes` is shorter than the header it
    ///   announces
    /// - `Error::ReservedOpcode` for opcodes 0x3-0x7 and 0xB-0xF
    /// - `Error::NonMinimalLength` if an extended length encodes a value that
    ///   fits a shorter form
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let [byte0, byte1, rest @ ..] = bytes else {
            return Err(Error::UnexpectedEof);
        };

        let fin = byte0 & FIN_BIT != 0;
        let rsv = RSV_BITS.map(|bit| byte0 & bit != 0);
        let opcode = OpCode::try_from(byte0 & OPCODE_MASK)?;

        let (length, rest) = match byte1 & LEN7_MASK {
            LEN_16 => {
                let (ext, rest) = rest.split_first_chunk::<2>().ok_or(Error::UnexpectedEof)?;
                let len = u64::from(u16::from_be_bytes(*ext));
                if len <= 125 {
                    return Err(Error::NonMinimalLength(len));
                }
                (len, rest)
            }
            LEN_64 => {
                let (ext, rest) = rest.split_first_chunk::<8>().ok_or(Error::UnexpectedEof)?;
                // The most significant bit is forced to zero.
                let len = u64::from_be_bytes(*ext) & !(1 << 63);
                if len <= 0xFFFF {
                    return Err(Error::NonMinimalLength(len));
                }
                (len, rest)
            }
            len => (u64::from(len), rest),
        };

        let masking_key = if byte1 & MASK_BIT != 0 {
            Some(*rest.first_chunk::<4>().ok_or(Error::UnexpectedEof)?)
        } else {
            None
        };

        Ok(Self {
            fin,
            rsv,
            opcode,
            length,
            masking_key,
        })
    }

    /// Decode a header from the transport.
    ///
    /// Returns `Ok(None)` if the stream ends cleanly before the first header
    /// byte. Not cancel-safe; use a [`FrameDecoder`] for that.
    ///
    /// # Errors
    ///
    /// `Error::UnexpectedEof` if the header is truncated, plus everything
    /// [`parse`](Self::parse) returns.
    #[cfg(feature = "async-tokio")]
    pub async fn decode<R: AsyncRead + Unpin>(src: &mut R) -> Result<Option<Self>> {
        FrameDecoder::new().read_header(src).await
    }
}

/// Longest possible header: 2 fixed bytes, 8 length bytes, 4 key bytes.
pub const MAX_HEADER_LEN: usize = 14;

/// Header decoder that survives cancellation.
///
/// Header bytes pulled from the transport are kept here until the header is
/// complete, so dropping a [`read_header`](Self::read_header) future midway
/// loses nothing; the next call resumes from the bytes already read.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: [u8; MAX_HEADER_LEN],
    filled: usize,
}

impl FrameDecoder {
    /// An empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Header bytes buffered so far.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.filled
    }

    /// Read the next header.
    ///
    /// Returns `Ok(None)` if the stream ends cleanly before the first header
    /// byte.
    ///
    /// # Errors
    ///
    /// `Error::UnexpectedEof` if the stream ends inside a header, plus
    /// everything [`FrameHeader::parse`] returns.
    #[cfg(feature = "async-tokio")]
    pub async fn read_header<R: AsyncRead + Unpin>(&mut self, src: &mut R) -> Result<Option<FrameHeader>> {
        loop {
            let want = if self.filled < 2 {
                2
            } else {
                FrameHeader::wire_len(self.buf[1])
            };
            if self.filled == want {
                self.filled = 0;
                return FrameHeader::parse(&self.buf[..want]).map(Some);
            }

            let n = src.read(&mut self.buf[self.filled..want]).await?;
            if n == 0 {
                if self.filled == 0 {
                    return Ok(None);
                }
                self.filled = 0;
                return Err(Error::UnexpectedEof);
            }
            self.filled += n;
        }
    }

    /// Read the next header and check it against `limits`.
    ///
    /// # Errors
    ///
    /// Everything [`read_header`](Self::read_header) returns, plus
    /// `Error::FrameTooLarge` if the declared length exceeds
    /// `limits.max_payload_size`.
    #[cfg(feature = "async-tokio")]
    pub async fn decode<R: AsyncRead + Unpin>(&mut self, src: &mut R, limits: &Limits) -> Result<Option<Frame>> {
        match self.read_header(src).await? {
            Some(header) => {
                limits.check_payload_size(header.length)?;
                Ok(Some(Frame::new(header)))
            }
            None => Ok(None),
        }
    }
}

/// One inbound frame: its header plus a cursor into its payload.
///
/// The payload bytes stay on the transport until [`Frame::read`] pulls them;
/// reads never cross the frame boundary, however the transport splits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload_type: OpCode,
    pos: u64,
}

impl Frame {
    /// Wrap a decoded header. No payload bytes have been consumed yet.
    #[must_use]
    pub const fn new(header: FrameHeader) -> Self {
        Self {
            payload_type: header.opcode,
            header,
            pos: 0,
        }
    }

    /// The header as it appeared on the wire.
    #[must_use]
    pub const fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Effective payload type.
    ///
    /// Equal to the header opcode, except for continuation frames, which take
    /// the opcode of the message they continue.
    #[must_use]
    pub const fn payload_type(&self) -> OpCode {
        self.payload_type
    }

    pub(crate) fn set_payload_type(&mut self, opcode: OpCode) {
        self.payload_type = opcode;
    }

    /// Payload bytes not yet read.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.header.length - self.pos
    }

    /// Whether the whole payload has been read.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.pos == self.header.length
    }

    /// Decode the next frame header and check it against `limits`.
    ///
    /// Not cancel-safe; use a [`FrameDecoder`] for that.
    ///
    /// # Errors
    ///
    /// See [`FrameDecoder::decode`].
    #[cfg(feature = "async-tokio")]
    pub async fn decode<R: AsyncRead + Unpin>(src: &mut R, limits: &Limits) -> Result<Option<Self>> {
        FrameDecoder::new().decode(src, limits).await
    }

    /// Read unmasked payload bytes into `buf`.
    ///
    /// Returns `Ok(0)` once the payload is exhausted (or `buf` is empty).
    ///
    /// # Errors
    ///
    /// `Error::UnexpectedEof` if the transport ends inside the payload.
    #[cfg(feature = "async-tokio")]
    pub async fn read<R: AsyncRead + Unpin>(&mut self, src: &mut R, buf: &mut [u8]) -> Result<usize> {
        let want = usize::try_from(self.remaining()).map_or(buf.len(), |r| r.min(buf.len()));
        if want == 0 {
            return Ok(0);
        }

        let n = src.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(Error::UnexpectedEof);
        }
        if let Some(key) = self.header.masking_key {
            apply_mask_offset(&mut buf[..n], key, self.pos);
        }
        self.pos += n as u64;
        Ok(n)
    }

    /// Fill `buf` as far as the payload allows; returns the bytes read.
    #[cfg(feature = "async-tokio")]
    pub async fn read_full<R: AsyncRead + Unpin>(&mut self, src: &mut R, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(src, &mut buf[filled..]).await? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    /// Append the rest of the payload to `out`.
    ///
    /// Cancel-safe: every byte taken from the transport is already in `out`
    /// when the future is dropped.
    #[cfg(feature = "async-tokio")]
    pub async fn read_to_end<R: AsyncRead + Unpin>(&mut self, src: &mut R, out: &mut Vec<u8>) -> Result<()> {
        let mut chunk = [0u8; 4096];
        out.reserve(usize::try_from(self.remaining()).map_or(0, |r| r.min(1 << 20)));
        loop {
            match self.read(src, &mut chunk).await? {
                0 => return Ok(()),
                n => out.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Consume and drop the rest of the payload; returns the bytes skipped.
    #[cfg(feature = "async-tokio")]
    pub async fn discard<R: AsyncRead + Unpin>(&mut self, src: &mut R) -> Result<u64> {
        let mut scratch = [0u8; 512];
        let mut skipped = 0u64;
        loop {
            match self.read(src, &mut scratch).await? {
                0 => return Ok(skipped),
                n => skipped += n as u64,
            }
        }
    }
}
