//! QR backend built on `rqrr`.

use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectionCapability, PayloadDetector};
use crate::detect::result::DecodedPayload;
use crate::frame::Frame;

/// Real QR decoding over greyscale frames.
#[derive(Debug, Default)]
pub struct QrBackend;

impl QrBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PayloadDetector for QrBackend {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::QrCode)
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DecodedPayload>> {
        if !frame.is_well_formed() {
            return Err(anyhow!(
                "frame buffer does not match {}x{}",
                frame.width,
                frame.height
            ));
        }
        let width = frame.width as usize;
        let height = frame.height as usize;
        let pixels = frame.luma();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
                pixels[y * width + x]
            });

        let mut payloads = Vec::new();
        let mut last_error = None;
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) => payloads.push(DecodedPayload::qr(content)),
                Err(err) => last_error = Some(err),
            }
        }
        match (payloads.is_empty(), last_error) {
            (true, Some(err)) => Err(anyhow!("qr decode failed: {:?}", err)),
            _ => Ok(payloads),
        }
    }
}
