//! Endpoint role.

use crate::error::{Error, Result};

/// Which end of the connection this endpoint is.
///
/// Fixed at construction: a connection built from an upgrade request is a
/// server, anything else is a client. The role decides the masking
/// direction (RFC 6455 Section 5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Masks every outgoing frame; rejects masked incoming frames.
    Client,
    /// Never masks; rejects unmasked incoming frames.
    Server,
}

impl Role {
    /// Server iff the connection was created from a handshake request.
    #[must_use]
    pub const fn from_request(has_request: bool) -> Self {
        if has_request { Role::Server } else { Role::Client }
    }

    /// Check if this role must mask outgoing frames.
    #[inline]
    #[must_use]
    pub const fn must_mask(&self) -> bool {
        matches!(self, Role::Client)
    }

    /// Check if this role expects incoming frames to be masked.
    #[inline]
    #[must_use]
    pub const fn expects_masked(&self) -> bool {
        matches!(self, Role::Server)
    }

    /// Validate the mask bit of an incoming frame.
    ///
    /// # Errors
    ///
    /// - `Error::UnmaskedClientFrame` if a server sees an unmasked frame
    /// - `Error::MaskedServerFrame` if a client sees a masked frame
    pub fn check_incoming(&self, masked: bool) -> Result<()> {
        match (self, masked) {
            (Role::Server, false) => Err(Error::UnmaskedClientFrame),
            (Role::Client, true) => Err(Error::MaskedServerFrame),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Server => write!(f, "server"),
        }
    }
}
