//! WebSocket protocol core implementation (RFC 6455).

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

#[cfg(feature = "async-tokio")]
pub mod writer;

pub use frame::{Frame, FrameDecoder, FrameHeader, MAX_CONTROL_FRAME_PAYLOAD, MAX_HEADER_LEN};
pub use handshake::{HandshakeRequest, ServerHandshaker, WS_GUID, compute_accept_key, rejection_response};
pub use mask::{apply_mask, apply_mask_offset};
pub use opcode::OpCode;

#[cfg(feature = "async-tokio")]
pub use writer::{FrameSink, FrameWriter};
