//! # hybi - RFC 6455 WebSocket protocol engine
//!
//! `hybi` implements the server side of the WebSocket protocol over any async
//! byte stream: the HTTP Upgrade negotiation, frame encoding and decoding with
//! masking, control-frame handling, and a connection type that allows one
//! reader and one writer to work concurrently.
//!
//! ## Features
//!
//! - **Streaming reads**: payloads are unmasked chunk by chunk as they arrive,
//!   never buffered whole
//! - **Strict validation**: masking direction, reserved bits, control-frame
//!   rules and fragment sequencing are enforced, and violations are answered
//!   with the right Close status
//! - **Transport-agnostic**: the caller owns the listener and TLS; anything
//!   implementing `AsyncRead + AsyncWrite` can be upgraded
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hybi::{Config, Server};
//!
//! let server = Server::new(Config::default(), |conn| async move {
//!     while let Ok(Some(msg)) = conn.recv_message().await {
//!         if conn.send(&msg).await.is_err() {
//!             break;
//!         }
//!     }
//!     let _ = conn.close().await;
//! });
//! server.accept(tcp_stream, false).await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;

#[cfg(feature = "async-tokio")]
pub mod server;

pub use config::{Config, Limits};
#[cfg(feature = "async-tokio")]
pub use connection::Connection;
pub use connection::{DispatchState, Role};
pub use error::{Error, HandshakeError, Result};
pub use message::{CloseCode, Message};
pub use protocol::{HandshakeRequest, OpCode, ServerHandshaker, WS_GUID, compute_accept_key};

#[cfg(feature = "async-tokio")]
pub use server::{HandshakeHook, Server};
