//! Error types for the chat rooms
//!
//! Defines the operation-level error taxonomy (validation, transport,
//! internal) and member delivery errors.
//! Uses thiserror for ergonomic error definitions.

use std::time::Duration;

use thiserror::Error;

/// Malformed or empty operator input
///
/// Always recoverable: reported to the operator and the loop continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Room ID cannot be empty")]
    EmptyRoomId,

    #[error("Username cannot be empty")]
    EmptyMemberName,

    #[error("Message cannot be empty")]
    EmptyContent,

    /// Transport kind tag not recognised
    #[error("Unknown transport kind: '{0}'")]
    UnknownTransport(String),

    /// Message format name not recognised
    #[error("Unknown message format: '{0}'")]
    UnknownFormat(String),

    /// Console verb not recognised
    #[error("Invalid command: '{0}'")]
    UnknownCommand(String),

    /// JSON command that failed to parse
    #[error("Malformed command: {0}")]
    MalformedCommand(String),
}

/// Transport adapter failures
///
/// Aborts the current broadcast only.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error while writing to the wire
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding or decoding failed
    #[error("Frame error: {0}")]
    Frame(#[from] serde_json::Error),

    /// Send did not complete in time
    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    /// The underlying mechanism refused the message
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Member delivery errors
///
/// Occurs when a single member cannot take a delivered message.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// Writing the notification failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application-level errors
///
/// Every operation outcome is either a success value or one of these.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invariant violation (poisoned lock, stopped dispatcher)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short classification used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Transport(_) => "transport",
            AppError::Internal(_) => "internal",
        }
    }
}
