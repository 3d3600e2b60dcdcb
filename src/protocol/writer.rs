//! Outbound framing.
//!
//! Every application write becomes exactly one final (FIN=1) frame. Header and
//! payload are assembled in one buffer and handed to the transport with a
//! single `write_all` + `flush`, so a frame is either fully written or the
//! sink is poisoned. A write cancelled mid-frame poisons it too.

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::connection::Role;
use crate::error::{Error, Result};
use crate::message::CloseCode;
use crate::protocol::OpCode;
use crate::protocol::frame::{FrameHeader, MAX_CONTROL_FRAME_PAYLOAD};
use crate::protocol::mask::apply_mask;

/// Draw a fresh masking key from the OS random source.
///
/// # Errors
///
/// Returns `Error::Randomness` if the random source fails.
pub fn masking_key() -> Result<[u8; 4]> {
    let mut key = [0u8; 4];
    getrandom::getrandom(&mut key).map_err(|e| Error::Randomness(e.to_string()))?;
    Ok(key)
}

/// Write half of a connection: frames payloads onto a transport.
#[derive(Debug)]
pub struct FrameSink<W> {
    io: W,
    role: Role,
    buf: BytesMut,
    close_sent: bool,
    broken: bool,
}

impl<W: AsyncWrite + Unpin> FrameSink<W> {
    /// Wrap a transport writer. Clients mask every frame, servers never do.
    pub fn new(io: W, role: Role) -> Self {
        Self {
            io,
            role,
            buf: BytesMut::with_capacity(4096),
            close_sent: false,
            broken: false,
        }
    }

    /// Whether a Close frame has gone out.
    pub fn close_sent(&self) -> bool {
        self.close_sent
    }

    /// Start a frame writer for one payload type.
    pub fn open(&mut self, opcode: OpCode) -> FrameWriter<'_, W> {
        FrameWriter { sink: self, opcode }
    }

    /// Frame `payload` as a single FIN=1 frame and flush it.
    ///
    /// Returns the number of payload bytes written.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` after a Close frame was sent, or after an
    ///   earlier write failed or was cancelled with a partial frame on the wire
    /// - `Error::ControlFrameTooLarge` for control payloads over 125 bytes
    /// - `Error::Randomness` if a client masking key cannot be drawn
    /// - `Error::Io` on transport failure
    pub async fn write_frame(&mut self, opcode: OpCode, payload: &[u8]) -> Result<usize> {
        if self.broken || self.close_sent {
            return Err(Error::ConnectionClosed);
        }
        if opcode.is_control() && payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
            return Err(Error::ControlFrameTooLarge(payload.len() as u64));
        }

        let mut header = FrameHeader::new(true, opcode, payload.len() as u64);
        if self.role.must_mask() {
            header = header.with_masking_key(&masking_key()?)?;
        }

        self.buf.clear();
        header.encode(&mut self.buf);
        let start = self.buf.len();
        self.buf.extend_from_slice(payload);
        if let Some(key) = header.masking_key {
            apply_mask(&mut self.buf[start..], key);
        }

        // Stays set if the flush fails or the future is dropped mid-frame.
        self.broken = true;
        self.flush_buf().await?;
        self.broken = false;
        if opcode == OpCode::Close {
            self.close_sent = true;
        }
        Ok(payload.len())
    }

    async fn flush_buf(&mut self) -> Result<()> {
        self.io.write_all(&self.buf).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Send a Close frame carrying `code`, unless one was already sent.
    ///
    /// # Errors
    ///
    /// Transport errors from writing the frame.
    pub async fn write_close(&mut self, code: CloseCode) -> Result<()> {
        if self.close_sent {
            return Ok(());
        }
        log::debug!("Sending close frame with status {code}");
        self.write_frame(OpCode::Close, &code.to_be_bytes()).await?;
        Ok(())
    }

    /// Shut down the write half of the transport.
    ///
    /// # Errors
    ///
    /// Transport errors from the shutdown.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.io
    }
}

/// A writer bound to one payload type.
///
/// Each [`write`](Self::write) produces one complete frame.
#[derive(Debug)]
pub struct FrameWriter<'a, W> {
    sink: &'a mut FrameSink<W>,
    opcode: OpCode,
}

impl<W: AsyncWrite + Unpin> FrameWriter<'_, W> {
    /// Payload type of the frames this writer produces.
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Write `payload` as one frame.
    ///
    /// # Errors
    ///
    /// See [`FrameSink::write_frame`].
    pub async fn write(&mut self, payload: &[u8]) -> Result<usize> {
        self.sink.write_frame(self.opcode, payload).await
    }

    /// Finish the writer. Frames are already flushed, so this only makes sure
    /// the transport has nothing pending.
    ///
    /// # Errors
    ///
    /// Transport errors from the flush.
    pub async fn close(self) -> Result<()> {
        self.sink.io.flush().await?;
        Ok(())
    }
}
