//! Error types for encoder-bridge-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HID layer failure outside of a specific read or write (init, enumeration).
    #[error("HID error: {0}")]
    Hid(String),

    /// No attached device matched the configured identity.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Device is present but could not be opened.
    #[error("failed to open device {path}: {reason}")]
    SessionOpen { path: String, reason: String },

    /// Operation attempted on a session that was already closed.
    #[error("device session is closed")]
    SessionClosed,

    /// Reading an input report failed.
    #[error("read failed: {0}")]
    Read(String),

    /// Writing an output report failed (device unplugged, handle invalid).
    #[error("write failed: {0}")]
    Write(String),

    /// Operation timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Permission denied (udev rules missing, exclusive access on Windows).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Value out of the range the wire format can carry.
    #[error("value out of range: {field} = {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    /// Configuration load/save/validation error.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias for family backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failure reported by a controller family's external backend.
///
/// These never stop the event loop: a controller catches them at its handler
/// boundary, skips the action, and may show a status frame instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend refused the action (missing role, OS permission).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The target vanished between resolution and the action.
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// The backend could not be reached in time.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Any other backend failure.
    #[error("backend failure: {0}")]
    Failed(String),
}

impl BackendError {
    /// Whether a cached handle to the target should be dropped after this failure.
    pub fn invalidates_target(&self) -> bool {
        matches!(self, Self::TargetNotFound(_) | Self::Unreachable(_))
    }
}
