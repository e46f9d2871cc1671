use crate::detect::backend::DetectionCapability;

/// A payload decoded from one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Decoded contents, treated as an opaque ticket reference.
    pub text: String,
    /// Symbology that produced it.
    pub capability: DetectionCapability,
}

impl DecodedPayload {
    pub fn new(text: impl Into<String>, capability: DetectionCapability) -> Self {
        Self {
            text: text.into(),
            capability,
        }
    }

    pub fn qr(text: impl Into<String>) -> Self {
        Self::new(text, DetectionCapability::QrCode)
    }

    /// Whitespace-only payloads are never dispatched.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
