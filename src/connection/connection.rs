use std::sync::atomic::{AtomicU8, Ordering};

use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::connection::dispatcher::{Dispatch, Dispatcher};
use crate::connection::Role;
use crate::error::{Error, Result};
use crate::message::{CloseCode, Message};
use crate::protocol::frame::{Frame, FrameDecoder};
use crate::protocol::handshake::HandshakeRequest;
use crate::protocol::writer::FrameSink;
use crate::protocol::OpCode;

/// Everything the read path owns. Guarded by the read lock.
///
/// Partial progress (header bytes, the active frame, a message being
/// reassembled) lives here rather than in a future, so a dropped `read` or
/// `recv_message` picks up where it stopped.
struct ReadSide<T> {
    src: BufReader<ReadHalf<T>>,
    decoder: FrameDecoder,
    active: Option<Frame>,
    partial: Option<(OpCode, Vec<u8>)>,
    /// Set while a control frame is being handled. Still set on entry means
    /// that work was dropped halfway and the stream position is lost.
    in_control: bool,
    dispatcher: Dispatcher,
}

/// A WebSocket connection over an async byte stream.
///
/// The stream is split into a read half and a write half, each behind its own
/// lock. One task may read while another writes; concurrent writers are
/// serialized, so frames from different writes never interleave on the wire.
///
/// The read path may also take the write lock (to answer a ping or send a
/// Close). Locks are always taken read-then-write, never the other way round.
///
/// ## Example
///
/// ```rust,ignore
/// use hybi::{Config, Connection};
///
/// let conn = Connection::server(stream, config, request);
/// let mut buf = [0u8; 4096];
/// loop {
///     let n = conn.read(&mut buf).await?;
///     if n == 0 {
///         break;
///     }
///     conn.write(&buf[..n]).await?;
/// }
/// conn.close().await?;
/// ```
pub struct Connection<T> {
    role: Role,
    config: Config,
    request: Option<HandshakeRequest>,
    payload_type: AtomicU8,
    reader: Mutex<ReadSide<T>>,
    writer: Mutex<FrameSink<WriteHalf<T>>>,
}

impl<T: AsyncRead + AsyncWrite> Connection<T> {
    /// Wrap a stream on which the handshake has already completed.
    ///
    /// The connection is a server iff `request` is present.
    pub fn new(io: T, config: Config, request: Option<HandshakeRequest>) -> Self {
        let role = Role::from_request(request.is_some());
        let (read_half, write_half) = tokio::io::split(io);
        log::debug!("Opening {role} connection");

        Self {
            role,
            config,
            request,
            payload_type: AtomicU8::new(u8::from(OpCode::Text)),
            reader: Mutex::new(ReadSide {
                src: BufReader::new(read_half),
                decoder: FrameDecoder::new(),
                active: None,
                partial: None,
                in_control: false,
                dispatcher: Dispatcher::new(role),
            }),
            writer: Mutex::new(FrameSink::new(write_half, role)),
        }
    }

    /// Server-side connection for an accepted upgrade request.
    pub fn server(io: T, config: Config, request: HandshakeRequest) -> Self {
        Self::new(io, config, Some(request))
    }

    /// Client-side connection.
    pub fn client(io: T, config: Config) -> Self {
        Self::new(io, config, None)
    }
}

impl<T> Connection<T> {
    /// Endpoint role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether this endpoint is the server.
    pub fn is_server(&self) -> bool {
        self.role == Role::Server
    }

    /// Whether this endpoint is the client.
    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }

    /// The negotiated configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The upgrade request this connection was accepted from (server only).
    pub fn request(&self) -> Option<&HandshakeRequest> {
        self.request.as_ref()
    }

    /// Payload type used by [`write`](Self::write).
    pub fn payload_type(&self) -> OpCode {
        if self.payload_type.load(Ordering::Acquire) == u8::from(OpCode::Binary) {
            OpCode::Binary
        } else {
            OpCode::Text
        }
    }

    /// Change the payload type used by subsequent writes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPayloadType` unless `opcode` is Text or Binary.
    pub fn set_payload_type(&self, opcode: OpCode) -> Result<()> {
        match opcode {
            OpCode::Text | OpCode::Binary => {
                self.payload_type.store(u8::from(opcode), Ordering::Release);
                Ok(())
            }
            other => Err(Error::InvalidPayloadType(other)),
        }
    }
}

impl<T: AsyncRead + AsyncWrite> Connection<T> {
    /// Read application payload bytes into `buf`.
    ///
    /// Bytes are delivered as they arrive; message boundaries are not
    /// preserved (use [`recv_message`](Self::recv_message) for that). Control
    /// frames are handled internally and never contribute bytes.
    ///
    /// Returns `Ok(0)` at end of stream: after a Close from the peer, after a
    /// clean transport EOF between messages, or after a protocol error has
    /// been reported once.
    ///
    /// Cancel-safe while waiting for data frames. Dropping the future while
    /// it answers a ping or reads a Close ends the read side; see
    /// `Error::ReadInterrupted`.
    ///
    /// # Errors
    ///
    /// Protocol violations are answered with a Close frame before being
    /// returned. `Error::UnexpectedEof` if the transport ends mid-frame or
    /// mid-message. Transport errors are returned as they are.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = self.reader.lock().await;
        let rs = &mut *guard;

        loop {
            if buf.is_empty() {
                return Ok(0);
            }

            if rs.active.is_none() {
                match self.next_frame(rs).await? {
                    Some(frame) => rs.active = Some(frame),
                    None => return Ok(0),
                }
            }

            let Some(frame) = rs.active.as_mut() else {
                continue;
            };
            let result = frame.read(&mut rs.src, buf).await;
            let exhausted = frame.is_exhausted();
            if exhausted {
                rs.active = None;
            }

            match result {
                Ok(0) if exhausted => continue,
                Ok(n) => return Ok(n),
                Err(e) => return Err(self.fail(rs, e).await),
            }
        }
    }

    /// Receive one complete message, reassembling fragments.
    ///
    /// Returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    ///
    /// Everything [`read`](Self::read) returns, plus:
    /// - `Error::FrameTooLarge` (answered with Close 1009) if the reassembled
    ///   message exceeds `limits.max_payload_size`
    /// - `Error::InvalidUtf8` (answered with Close 1007) for a text message
    ///   that is not valid UTF-8
    pub async fn recv_message(&self) -> Result<Option<Message>> {
        let mut guard = self.reader.lock().await;
        let rs = &mut *guard;
        let max = self.config.limits.max_payload_size;

        loop {
            if rs.active.is_none() {
                match self.next_frame(rs).await? {
                    Some(frame) => rs.active = Some(frame),
                    None if rs.partial.take().is_some() => return Err(Error::UnexpectedEof),
                    None => return Ok(None),
                }
            }
            let Some(frame) = rs.active.as_mut() else {
                continue;
            };

            let (_, payload) = rs
                .partial
                .get_or_insert_with(|| (frame.payload_type(), Vec::new()));
            let size = payload.len() as u64 + frame.remaining();
            if size > max {
                return Err(self.fail(rs, Error::FrameTooLarge { size, max }).await);
            }
            if let Err(e) = frame.read_to_end(&mut rs.src, payload).await {
                return Err(self.fail(rs, e).await);
            }

            let fin = frame.header().fin;
            rs.active = None;
            if !fin {
                continue;
            }
            let Some((kind, payload)) = rs.partial.take() else {
                continue;
            };
            let message = match kind {
                OpCode::Text => match String::from_utf8(payload) {
                    Ok(text) => Message::Text(text),
                    Err(e) => return Err(self.fail(rs, e.utf8_error().into()).await),
                },
                _ => Message::Binary(payload),
            };
            return Ok(Some(message));
        }
    }

    /// Fetch the next data frame, handling control frames along the way.
    ///
    /// Returns `Ok(None)` once the read side has terminated.
    async fn next_frame(&self, rs: &mut ReadSide<T>) -> Result<Option<Frame>> {
        loop {
            if rs.in_control {
                return Err(self.fail(rs, Error::ReadInterrupted).await);
            }
            if rs.dispatcher.state().is_closed() {
                return Ok(None);
            }

            let frame = match rs.decoder.decode(&mut rs.src, &self.config.limits).await {
                Ok(Some(frame)) => frame,
                Ok(None) if rs.dispatcher.state().in_message() => {
                    return Err(self.fail(rs, Error::UnexpectedEof).await);
                }
                Ok(None) => {
                    log::debug!("Transport closed by peer");
                    rs.dispatcher.terminate();
                    return Ok(None);
                }
                Err(e) => return Err(self.fail(rs, e).await),
            };

            // Data frames are classified without awaiting; control frames
            // read their payload and may write a pong.
            rs.in_control = frame.header().opcode.is_control();
            let dispatched = rs.dispatcher.dispatch(frame, &mut rs.src, &self.writer).await;
            rs.in_control = false;

            match dispatched {
                Ok(Dispatch::Data(frame)) => return Ok(Some(frame)),
                Ok(Dispatch::Consumed) => continue,
                Ok(Dispatch::Close(code)) => {
                    self.reply_close(code).await;
                    return Ok(None);
                }
                Err(e) => return Err(self.fail(rs, e).await),
            }
        }
    }

    /// Terminate the read side and answer `err` with a Close if it calls for one.
    async fn fail(&self, rs: &mut ReadSide<T>, err: Error) -> Error {
        rs.dispatcher.terminate();
        rs.active = None;
        rs.partial = None;
        rs.in_control = false;

        if let Some(code) = err.close_code() {
            log::warn!("Closing connection with status {code}: {err}");
            if let Err(e) = self.write_close(code).await {
                log::error!("Failed to send close frame: {e}");
            }
        }
        err
    }

    async fn reply_close(&self, received: Option<CloseCode>) {
        let status = match received {
            Some(code) if code.is_reserved() => CloseCode::ProtocolError,
            Some(code) => code,
            None => self.config.default_close_status,
        };
        if let Err(e) = self.write_close(status).await {
            log::error!("Failed to echo close frame: {e}");
        }
    }

    /// Send `buf` as one frame of the current payload type.
    ///
    /// Returns the number of payload bytes written.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` once a Close frame has been sent, or after
    ///   an earlier write failed or was dropped with a frame half sent
    /// - `Error::Randomness` if a client masking key cannot be drawn
    /// - `Error::Io` on transport failure
    ///
    /// Not cancel-safe: dropping the future mid-frame leaves the write side
    /// unusable.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        self.write_as(self.payload_type(), buf).await
    }

    /// Send a text message as one frame.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.write_as(OpCode::Text, text.as_bytes()).await?;
        Ok(())
    }

    /// Send a binary message as one frame.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub async fn send_binary(&self, data: &[u8]) -> Result<()> {
        self.write_as(OpCode::Binary, data).await?;
        Ok(())
    }

    /// Send a [`Message`] as one frame.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub async fn send(&self, message: &Message) -> Result<()> {
        self.write_as(message.opcode(), message.as_bytes()).await?;
        Ok(())
    }

    async fn write_as(&self, opcode: OpCode, buf: &[u8]) -> Result<usize> {
        let mut sink = self.writer.lock().await;
        let mut writer = sink.open(opcode);
        let n = writer.write(buf).await?;
        writer.close().await?;
        Ok(n)
    }

    /// Send a Ping. The matching Pong is consumed by the read path.
    ///
    /// # Errors
    ///
    /// `Error::ControlFrameTooLarge` if `payload` exceeds 125 bytes, plus the
    /// errors of [`write`](Self::write).
    pub async fn ping(&self, payload: &[u8]) -> Result<()> {
        self.writer
            .lock()
            .await
            .write_frame(OpCode::Ping, payload)
            .await?;
        Ok(())
    }

    /// Send a Close frame with `code`. Only the first Close is sent.
    ///
    /// # Errors
    ///
    /// Transport errors.
    pub async fn write_close(&self, code: CloseCode) -> Result<()> {
        self.writer.lock().await.write_close(code).await
    }

    /// Send a Close with the configured default status, then shut down the
    /// write half of the transport.
    ///
    /// # Errors
    ///
    /// Transport errors.
    pub async fn close(&self) -> Result<()> {
        let mut sink = self.writer.lock().await;
        sink.write_close(self.config.default_close_status).await?;
        sink.shutdown().await
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("role", &self.role)
            .field("config", &self.config)
            .field("payload_type", &self.payload_type())
            .finish_non_exhaustive()
    }
}
