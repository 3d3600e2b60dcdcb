//! Frame dispatcher: classifies each inbound frame and answers control frames.
//!
//! Control frames never reach the application. Pings are answered with a Pong
//! carrying the same payload, pongs are drained, and a Close ends the read
//! side. Data frames are handed back with their effective payload type.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use crate::connection::{DispatchState, Role};
use crate::error::{Error, Result};
use crate::message::CloseCode;
use crate::protocol::OpCode;
use crate::protocol::frame::{Frame, MAX_CONTROL_FRAME_PAYLOAD};
use crate::protocol::writer::FrameSink;

/// Outcome of dispatching one frame.
#[derive(Debug)]
pub(crate) enum Dispatch {
    /// A data frame whose payload belongs to the application.
    Data(Frame),
    /// A control frame that was fully handled; fetch the next frame.
    Consumed,
    /// The peer sent Close, with its status code if one was present.
    Close(Option<CloseCode>),
}

/// Per-connection frame classification state.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    role: Role,
    state: DispatchState,
}

impl Dispatcher {
    pub(crate) fn new(role: Role) -> Self {
        Self {
            role,
            state: DispatchState::default(),
        }
    }

    pub(crate) fn state(&self) -> DispatchState {
        self.state
    }

    /// Stop dispatching; subsequent reads see end of stream.
    pub(crate) fn terminate(&mut self) {
        self.state = DispatchState::Closed;
    }

    /// Classify `frame`, consuming control payloads from `src`.
    ///
    /// Pongs are written through `sink`, which is locked only for the
    /// duration of the write.
    pub(crate) async fn dispatch<R, W>(
        &mut self,
        mut frame: Frame,
        src: &mut R,
        sink: &Mutex<FrameSink<W>>,
    ) -> Result<Dispatch>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let header = *frame.header();
        self.role.check_incoming(header.masking_key.is_some())?;
        header.validate()?;

        match header.opcode {
            OpCode::Continuation => {
                let DispatchState::InMessage(opcode) = self.state else {
                    return Err(Error::UnexpectedContinuation);
                };
                frame.set_payload_type(opcode);
                if header.fin {
                    self.state = DispatchState::AwaitingFrame;
                }
                Ok(Dispatch::Data(frame))
            }
            OpCode::Text | OpCode::Binary => {
                if self.state.in_message() {
                    return Err(Error::InterleavedDataFrame);
                }
                if !header.fin {
                    self.state = DispatchState::InMessage(header.opcode);
                }
                Ok(Dispatch::Data(frame))
            }
            OpCode::Close => {
                let mut payload = Vec::with_capacity(MAX_CONTROL_FRAME_PAYLOAD);
                frame.read_to_end(src, &mut payload).await?;
                self.state = DispatchState::Closed;

                let code = match payload.as_slice() {
                    [] => None,
                    [_] => return Err(Error::InvalidClosePayload),
                    [hi, lo, ..] => Some(CloseCode::from_u16(u16::from_be_bytes([*hi, *lo]))),
                };
                log::debug!("Received close frame (status: {code:?})");
                Ok(Dispatch::Close(code))
            }
            OpCode::Ping => {
                let mut payload = [0u8; MAX_CONTROL_FRAME_PAYLOAD];
                let n = frame.read_full(src, &mut payload).await?;
                frame.discard(src).await?;

                let mut sink = sink.lock().await;
                if sink.close_sent() {
                    log::debug!("Ignoring ping after close");
                } else {
                    log::debug!("Answering ping ({n} bytes)");
                    if let Err(e) = sink.write_frame(OpCode::Pong, &payload[..n]).await {
                        log::error!("Failed to send pong: {e}");
                        return Err(e);
                    }
                }
                Ok(Dispatch::Consumed)
            }
            OpCode::Pong => {
                frame.discard(src).await?;
                log::debug!("Received pong");
                Ok(Dispatch::Consumed)
            }
        }
    }
}
