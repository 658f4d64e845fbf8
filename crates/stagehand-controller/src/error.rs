//! Error types at the controller's seams.

use thiserror::Error;

/// Errors surfaced by the controller itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// A second admission/departure attempt was requested while one was
    /// already in flight. This is a defect in the caller, never silently
    /// absorbed.
    #[error("an admission or departure attempt is already in flight")]
    AttemptInFlight,
}

/// Errors from a content readiness provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("no content available: {0}")]
    Unavailable(String),
    #[error("content request timed out")]
    Timeout,
}

/// Errors from a seat transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("seat operation rejected: {0}")]
    Rejected(String),
    #[error("seat operation timed out")]
    Timeout,
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}
