//! Read-side dispatch state.

use crate::protocol::OpCode;

/// Where the frame dispatcher stands between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchState {
    /// No message in progress; the next data frame must be text or binary.
    #[default]
    AwaitingFrame,
    /// A fragmented message of this type is open; only continuations (and
    /// control frames) may follow.
    InMessage(OpCode),
    /// A Close frame was received or a violation was answered. Reads return
    /// end of stream from here on.
    Closed,
}

impl DispatchState {
    /// Check whether the read side has terminated.
    #[must_use]
    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self, DispatchState::Closed)
    }

    /// Check whether a fragmented message is open.
    #[must_use]
    #[inline]
    pub const fn in_message(&self) -> bool {
        matches!(self, DispatchState::InMessage(_))
    }
}

impl std::fmt::Display for DispatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchState::AwaitingFrame => write!(f, "AwaitingFrame"),
            DispatchState::InMessage(op) => write!(f, "InMessage({op})"),
            DispatchState::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(DispatchState::default(), DispatchState::AwaitingFrame);
    }

    #[test]
    fn test_predicates() {
        assert!(!DispatchState::AwaitingFrame.in_message());
        assert!(DispatchState::InMessage(OpCode::Text).in_message());
        assert!(DispatchState::Closed.is_closed());
        assert!(!DispatchState::InMessage(OpCode::Binary).is_closed());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DispatchState::InMessage(OpCode::Binary).to_string(),
            "InMessage(Binary)"
        );
    }
}
