use anyhow::Result;

use crate::detect::result::DecodedPayload;
use crate::frame::Frame;

/// Decoding capabilities a backend may offer.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetectionCapability {
    QrCode,
    LinearBarcode,
    /// Payload markers embedded by `SyntheticCamera`. Not a real symbology.
    SyntheticMarker,
}

/// Payload detector backend.
///
/// A detector is invoked once per frame and returns zero or more decoded
/// payloads (usually zero or one). It keeps no frame data between calls.
/// An `Err` is a per-frame decode failure; the scan loop logs it and moves
/// on to the next frame.
pub trait PayloadDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Decode payloads visible in a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DecodedPayload>>;

    /// Optional warm-up hook, run once when a session starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
