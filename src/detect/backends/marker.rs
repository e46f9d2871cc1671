//! Marker backend.
//!
//! Decodes payload markers that `SyntheticCamera` embeds in its frames. It
//! pairs with `stub://` cameras for demos and drives the loop in tests. It
//! cannot read real codes, so it only answers for `SyntheticMarker`.

use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectionCapability, PayloadDetector};
use crate::detect::result::DecodedPayload;
use crate::frame::Frame;

const MARKER_PREFIX: &[u8] = b"\x00QRCODE:";
const MARKER_END: u8 = 0;
const MAX_PAYLOAD_BYTES: usize = 512;

pub(crate) fn encode_marker(payload: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MARKER_PREFIX.len() + payload.len() + 1);
    bytes.extend_from_slice(MARKER_PREFIX);
    bytes.extend_from_slice(payload.as_bytes());
    bytes.push(MARKER_END);
    bytes
}

/// A marker with no terminator: present in view, but unreadable.
pub(crate) fn encode_truncated_marker() -> Vec<u8> {
    let mut bytes = MARKER_PREFIX.to_vec();
    bytes.extend(std::iter::repeat(b'#').take(MAX_PAYLOAD_BYTES + 1));
    bytes
}

#[derive(Debug, Default)]
pub struct MarkerBackend;

impl MarkerBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PayloadDetector for MarkerBackend {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::SyntheticMarker)
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DecodedPayload>> {
        let pixels = frame.luma();
        let Some(start) = pixels
            .windows(MARKER_PREFIX.len())
            .position(|window| window == MARKER_PREFIX)
        else {
            return Ok(Vec::new());
        };

        let body = &pixels[start + MARKER_PREFIX.len()..];
        let limit = body.len().min(MAX_PAYLOAD_BYTES + 1);
        let end = body[..limit]
            .iter()
            .position(|&b| b == MARKER_END)
            .ok_or_else(|| anyhow!("truncated payload marker"))?;
        let text = std::str::from_utf8(&body[..end])
            .map_err(|_| anyhow!("payload marker is not valid utf-8"))?;
        Ok(vec![DecodedPayload::new(
            text,
            DetectionCapability::SyntheticMarker,
        )])
    }
}
