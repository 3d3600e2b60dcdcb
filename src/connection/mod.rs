//! Connection-level machinery: role, read-side dispatch, and the
//! [`Connection`] type itself.
//!
//! ## Read path
//!
//! 1. Decode the next frame header.
//! 2. Dispatch it: control frames are answered or drained in place, data
//!    frames are handed back with their effective payload type.
//! 3. Stream the data payload to the caller, unmasking as it goes.
//!
//! A Close from the peer, or a protocol violation, terminates the read side.

mod role;
mod state;

pub use role::Role;
pub use state::DispatchState;

#[cfg(feature = "async-tokio")]
mod dispatcher;

#[cfg(feature = "async-tokio")]
#[allow(clippy::module_inception)]
mod connection;

#[cfg(feature = "async-tokio")]
pub use connection::Connection;
