//! HTTP snapshot camera.
//!
//! `SnapshotCamera` polls a JPEG snapshot endpoint (IP cameras, phone webcam
//! bridges) and decodes each response in memory into a greyscale `Frame`.
//! Camera facing is the device's concern; the preference is only logged.
//!
//! Once acquired, a refused (401/403) or unreachable endpoint ends the track.
//! Other HTTP errors and undecodable snapshots only skip a frame.

use anyhow::{Context, Result};
use std::io::Read;
use std::time::Duration;

use super::{CaptureHandle, CaptureSource, Facing, VideoTrack};
use crate::error::{ScanError, ScanResult};
use crate::frame::Frame;

const MAX_JPEG_BYTES: u64 = 5 * 1024 * 1024;

/// JPEG snapshot camera reached over HTTP(S).
pub struct SnapshotCamera {
    url: String,
    agent: ureq::Agent,
}

impl SnapshotCamera {
    pub fn new(url: String, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { url, agent }
    }
}

impl CaptureSource for SnapshotCamera {
    fn name(&self) -> &'static str {
        "http-snapshot"
    }

    fn acquire(&mut self, facing: Facing) -> ScanResult<CaptureHandle> {
        log::debug!("acquiring snapshot camera {} ({:?})", self.url, facing);
        match self.agent.get(&self.url).call() {
            Ok(_) => {}
            Err(ureq::Error::Status(401 | 403, _)) => return Err(ScanError::PermissionDenied),
            Err(ureq::Error::Status(code, _)) => {
                return Err(ScanError::DeviceUnavailable(format!(
                    "snapshot endpoint returned HTTP {}",
                    code
                )))
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(ScanError::DeviceUnavailable(err.to_string()))
            }
        }
        Ok(CaptureHandle::new(Box::new(SnapshotTrack {
            url: self.url.clone(),
            agent: self.agent.clone(),
            sequence: 0,
            stopped: false,
        })))
    }
}

struct SnapshotTrack {
    url: String,
    agent: ureq::Agent,
    sequence: u64,
    stopped: bool,
}

impl VideoTrack for SnapshotTrack {
    fn label(&self) -> String {
        self.url.clone()
    }

    fn next_frame(&mut self) -> ScanResult<Frame> {
        if self.stopped {
            return Err(ScanError::DeviceUnavailable("track stopped".to_string()));
        }
        let bytes = fetch_jpeg(&self.agent, &self.url)?;
        let (pixels, width, height) =
            decode_luma(&bytes).map_err(|err| ScanError::DecodeTransient(format!("{:#}", err)))?;
        self.sequence += 1;
        Ok(Frame::new(pixels, width, height, self.sequence))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

fn fetch_jpeg(agent: &ureq::Agent, url: &str) -> ScanResult<Vec<u8>> {
    let response = agent.get(url).call().map_err(snapshot_error)?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_JPEG_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|err| ScanError::DecodeTransient(format!("read jpeg snapshot: {}", err)))?;
    if bytes.is_empty() {
        return Err(ScanError::DecodeTransient("empty jpeg snapshot".to_string()));
    }
    Ok(bytes)
}

/// Classify a failed snapshot request on a live track.
fn snapshot_error(err: ureq::Error) -> ScanError {
    match err {
        ureq::Error::Status(code @ (401 | 403), _) => ScanError::DeviceUnavailable(format!(
            "snapshot access revoked (HTTP {})",
            code
        )),
        ureq::Error::Status(code, _) => {
            ScanError::DecodeTransient(format!("snapshot endpoint returned HTTP {}", code))
        }
        ureq::Error::Transport(err) => ScanError::DeviceUnavailable(err.to_string()),
    }
}

fn decode_luma(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let image = image::load_from_memory(bytes).context("decode jpeg")?;
    let luma = image.into_luma8();
    let (width, height) = luma.dimensions();
    Ok((luma.into_raw(), width, height))
}
