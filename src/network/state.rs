//! Session state machine.
//!
//! ```text
//! Idle ──start()──> Connecting ──open + start frame──> Connected
//!  ▲                   ▲   │                               │
//!  │                   │   └──── transport error ──────┐   │ close / error
//!  │                   │                               ▼   ▼
//!  └────stop()─────────┴──── reconnect delay ──── Disconnected
//! ```
//!
//! `stop()` is valid from every state and always lands in `Idle`.

use chrono::{DateTime, Utc};

/// Where a metrics session currently is in its lifecycle.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session running, no reconnect pending.
    #[default]
    Idle,

    /// Opening the transport.
    Connecting {
        /// Connection attempt number; 1 for the first attempt after `start()`.
        attempt: u32,
    },

    /// Transport open and start frame sent.
    Connected {
        /// Wall-clock time the link came up.
        since: DateTime<Utc>,
    },

    /// Link lost; a reconnect is scheduled.
    Disconnected {
        /// The attempt that just failed.
        attempt: u32,
        /// Why the link went down.
        last_error: String,
    },
}

impl SessionState {
    /// True while the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// True for every state except `Idle`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// The failure that caused the current disconnect, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Disconnected { last_error, .. } => Some(last_error),
            _ => None,
        }
    }

    /// Short status label for display.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting { .. } => "Connecting...",
            Self::Connected { .. } => "Connected",
            Self::Disconnected { .. } => "Reconnecting...",
        }
    }
}

impl PartialEq for SessionState {
    fn eq(&self, other: &Self) -> bool {
        // Compare variants without comparing timestamps or messages
        match (self, other) {
            (Self::Idle, Self::Idle) => true,
            (Self::Connecting { attempt: a1 }, Self::Connecting { attempt: a2 }) => a1 == a2,
            (Self::Connected { .. }, Self::Connected { .. }) => true,
            (
                Self::Disconnected { attempt: a1, .. },
                Self::Disconnected { attempt: a2, .. },
            ) => a1 == a2,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(!SessionState::Idle.is_active());
        assert!(SessionState::Connecting { attempt: 1 }.is_active());
        assert!(SessionState::Connected { since: Utc::now() }.is_connected());

        let down = SessionState::Disconnected {
            attempt: 2,
            last_error: "reset by peer".into(),
        };
        assert!(down.is_active());
        assert!(!down.is_connected());
        assert_eq!(down.error_message(), Some("reset by peer"));
        assert_eq!(down.label(), "Reconnecting...");
    }

    #[test]
    fn test_equality_ignores_details() {
        assert_eq!(
            SessionState::Connected { since: Utc::now() },
            SessionState::Connected {
                since: DateTime::<Utc>::MIN_UTC
            }
        );
        assert_eq!(
            SessionState::Disconnected {
                attempt: 1,
                last_error: "a".into()
            },
            SessionState::Disconnected {
                attempt: 1,
                last_error: "b".into()
            }
        );
        assert_ne!(
            SessionState::Connecting { attempt: 1 },
            SessionState::Connecting { attempt: 2 }
        );
    }
}
