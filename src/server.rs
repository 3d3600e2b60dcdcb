//! Server acceptor: upgrades a transport and hands the connection to a handler.

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::Config;
use crate::connection::Connection;
use crate::error::{Error, HandshakeError, Result};
use crate::protocol::handshake::{HandshakeRequest, ServerHandshaker, write_rejection};

/// Caller-supplied check run after the request has been validated and before
/// the 101 response is written.
///
/// It may edit the negotiated configuration (for example to narrow the
/// subprotocol list to one entry). Returning `Err` rejects the upgrade with
/// 403 Forbidden.
pub type HandshakeHook =
    Arc<dyn Fn(&mut Config, &HandshakeRequest) -> std::result::Result<(), String> + Send + Sync>;

/// WebSocket server for one endpoint.
///
/// `H` is the connection handler. It receives ownership of each upgraded
/// [`Connection`]; the transport is released when the connection is dropped.
///
/// ## Example
///
/// ```rust,ignore
/// let server = Arc::new(Server::new(Config::default(), |conn| async move {
///     let mut buf = [0u8; 4096];
///     while let Ok(n) = conn.read(&mut buf).await {
///         if n == 0 || conn.write(&buf[..n]).await.is_err() {
///             break;
///         }
///     }
/// }));
///
/// loop {
///     let (stream, _) = listener.accept().await?;
///     let server = Arc::clone(&server);
///     tokio::spawn(async move { server.accept(stream, false).await });
/// }
/// ```
pub struct Server<H> {
    config: Config,
    handshake: Option<HandshakeHook>,
    handler: H,
}

impl<H> Server<H> {
    /// Create a server with a base configuration and a connection handler.
    pub fn new(config: Config, handler: H) -> Self {
        Self {
            config,
            handshake: None,
            handler,
        }
    }

    /// Install a handshake hook.
    #[must_use]
    pub fn with_handshake<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Config, &HandshakeRequest) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.handshake = Some(Arc::new(hook));
        self
    }

    /// Base configuration cloned into every handshake.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Upgrade a transport whose request head has already been parsed.
    ///
    /// On success the handler runs to completion before this returns. On
    /// failure an HTTP error response is written and no handler is invoked.
    ///
    /// # Errors
    ///
    /// - `Error::Handshake` if the upgrade was refused
    /// - `Error::Io` if the response could not be written
    pub async fn serve<T, Fut>(&self, mut io: T, request: HandshakeRequest) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
        H: Fn(Connection<T>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let handshaker = match self.negotiate(&request) {
            Ok(handshaker) => handshaker,
            Err(err) => return reject(&mut io, err).await,
        };
        let response = match handshaker.response() {
            Ok(response) => response,
            Err(err) => return reject(&mut io, err).await,
        };

        io.write_all(&response).await?;
        io.flush().await?;
        log::debug!("Upgraded connection for {}", request.path);

        let conn = Connection::server(io, handshaker.into_config(), request);
        (self.handler)(conn).await;
        Ok(())
    }

    /// Read the request head from `io`, then [`serve`](Self::serve) it.
    ///
    /// `tls` tells the negotiator whether the transport is encrypted, which
    /// selects `wss` over `ws` for the endpoint location.
    ///
    /// # Errors
    ///
    /// As [`serve`](Self::serve), plus request-head failures (too large,
    /// malformed, or the peer hung up).
    pub async fn accept<T, Fut>(&self, io: T, tls: bool) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
        H: Fn(Connection<BufReader<T>>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut io = BufReader::new(io);
        let request = match HandshakeRequest::read_from(&mut io, &self.config.limits).await {
            Ok(request) => request.with_tls(tls),
            Err(Error::Handshake(err)) => return reject(&mut io, err).await,
            Err(e) => return Err(e),
        };
        self.serve(io, request).await
    }

    fn negotiate(&self, request: &HandshakeRequest) -> std::result::Result<ServerHandshaker, HandshakeError> {
        let mut handshaker = ServerHandshaker::new(self.config.clone());
        handshaker.read_handshake(request)?;
        if let Some(hook) = &self.handshake {
            hook(handshaker.config_mut(), request).map_err(HandshakeError::Rejected)?;
        }
        Ok(handshaker)
    }
}

async fn reject<W: AsyncWrite + Unpin>(io: &mut W, err: HandshakeError) -> Result<()> {
    log::warn!("Rejecting handshake with {}: {err}", err.status());
    if let Err(e) = write_rejection(io, &err).await {
        log::error!("Failed to send handshake rejection: {e}");
    } else if let Err(e) = io.shutdown().await {
        log::debug!("Shutdown after rejection failed: {e}");
    }
    Err(err.into())
}

impl<H> std::fmt::Debug for Server<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("handshake", &self.handshake.is_some())
            .finish_non_exhaustive()
    }
}
