//! Custom error types for the application.
//!
//! This module defines the primary error type, `PerfError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the kinds of errors that can occur, from configuration and file I/O issues to
//! device-link faults.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment`, typically related to file parsing
//!   or type mismatches in the configuration sources.
//! - **`Configuration`**: Semantic errors in the configuration, such as a zero buffer
//!   capacity or an unsupported URL scheme. Caught during the validation step.
//! - **`Io`**, **`Csv`**, **`Json`**: Wrapped errors from file access, recording
//!   parsing/export and wire encoding.
//! - **`Transport`** / **`ConnectionClosed`**: Faults on the device link. The session
//!   recovers from these on its own by reconnecting; they never reach the caller of
//!   `MetricsSession::start`.
//! - **`SessionInactive`**: An operation that needs a running session (placing a
//!   marker) was attempted while the session was idle.
//! - **`UnknownProfile`**: A caller asked for a classification profile id that is
//!   not registered.
//!
//! By using `#[from]`, `PerfError` can be created from underlying error types,
//! simplifying error handling throughout the crate with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, PerfError>;

/// Errors produced by the session manager, the analysis engine and their outer surfaces.
#[derive(Error, Debug)]
pub enum PerfError {
    /// Configuration source could not be read or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but holds an invalid value.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File or socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a CSV recording failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Encoding an outbound wire message failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The device link reported an error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The device link was closed by the peer.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// The operation needs an active session.
    #[error("No active session")]
    SessionInactive,

    /// No classification profile is registered under this id.
    #[error("Unknown classification profile: {0}")]
    UnknownProfile(String),
}

impl From<figment::Error> for PerfError {
    fn from(value: figment::Error) -> Self {
        PerfError::Config(Box::new(value))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PerfError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match value {
            WsError::ConnectionClosed | WsError::AlreadyClosed => PerfError::ConnectionClosed,
            other => PerfError::Transport(other.to_string()),
        }
    }
}

impl PerfError {
    /// Whether the session's reconnect loop handles this error on its own.
    #[must_use]
    pub fn is_link_fault(&self) -> bool {
        matches!(
            self,
            PerfError::Transport(_) | PerfError::ConnectionClosed | PerfError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_websocket_maps_to_connection_closed() {
        let err: PerfError = tokio_tungstenite::tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, PerfError::ConnectionClosed));
        assert!(err.is_link_fault());
    }

    #[test]
    fn io_errors_are_link_faults() {
        let err: PerfError =
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into();
        assert!(err.is_link_fault());
        assert_eq!(err.to_string(), "I/O error: reset");
    }

    #[test]
    fn unknown_profile_is_not_a_link_fault() {
        let err = PerfError::UnknownProfile("racing".into());
        assert!(!err.is_link_fault());
        assert_eq!(err.to_string(), "Unknown classification profile: racing");
    }
}
