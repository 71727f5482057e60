//! Error classification for the device session.
//!
//! Decides which failures end a session and which the event loop rides out.

use crate::error::Error;

/// Classification of communication errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient errors that may succeed on the next tick (timeout, busy).
    Transient,
    /// Device is disconnected or the handle is gone.
    Disconnected,
    /// Permission denied: udev rules or exclusive access.
    PermissionDenied,
    /// Invalid request or response data.
    InvalidResponse,
}

impl ErrorClass {
    /// Classify an error for the stop/continue decision.
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::Timeout(_) => Self::Transient,
            Error::PermissionDenied(_) => Self::PermissionDenied,
            Error::DeviceNotFound(_)
            | Error::SessionClosed
            | Error::SessionOpen { .. }
            | Error::Write(_) => Self::Disconnected,
            Error::Read(msg) | Error::Hid(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("permission")
                    || lower.contains("access denied")
                    || lower.contains("access is denied")
                {
                    Self::PermissionDenied
                } else if lower.contains("timed out")
                    || lower.contains("interrupted")
                    || lower.contains("resource temporarily unavailable")
                {
                    Self::Transient
                } else {
                    Self::Disconnected
                }
            }
            Error::OutOfRange { .. } | Error::Config(_) => Self::InvalidResponse,
        }
    }

    /// Whether the event loop must stop after this error.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::PermissionDenied)
    }
}

/// Device connection status for display in the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Session open, loop running.
    Running,
    /// Loop stopped on request.
    Stopped,
    /// Loop stopped because the device went away.
    Disconnected,
    /// Loop stopped because the device refused access.
    PermissionError,
}

impl SessionStatus {
    /// Status to report after the loop ended with `err`.
    pub fn from_error(err: &Error) -> Self {
        match ErrorClass::classify(err) {
            ErrorClass::PermissionDenied => Self::PermissionError,
            _ => Self::Disconnected,
        }
    }
}
