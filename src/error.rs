//! Failure taxonomy for the scan loop.
//!
//! Only `CapabilityUnsupported`, `PermissionDenied` and `DeviceUnavailable`
//! can end a start attempt or a running session. Every other variant is
//! terminal to the current cycle or request only; the session keeps running.
//!
//! A server that declares a ticket invalid is not an error: it is a
//! [`VerificationResult`](crate::verify::VerificationResult) with
//! `approved == false`.

/// Unified error type for scanner operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// The runtime has no barcode/QR decoding capability at all.
    #[error("code scanning is not supported on this device")]
    CapabilityUnsupported,

    /// The operator (or the OS) refused camera access.
    #[error("camera permission denied")]
    PermissionDenied,

    /// No usable camera, or the live track ended.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single frame could not be read or decoded.
    #[error("frame decode failed: {0}")]
    DecodeTransient(String),

    /// No bearer credential is stored; nothing was sent.
    #[error("not signed in")]
    Unauthenticated,

    /// The verification service could not be reached; no decision exists.
    #[error("verification service unreachable: {0}")]
    Unreachable(String),

    /// A verification request was built from an empty payload.
    #[error("payload must not be empty")]
    EmptyPayload,
}

impl ScanError {
    /// Returns true when no usable camera or decoder is left: a start fails
    /// and a running session is torn down.
    pub fn is_capture_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::CapabilityUnsupported
                | ScanError::PermissionDenied
                | ScanError::DeviceUnavailable(_)
        )
    }
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;
