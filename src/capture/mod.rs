//! Capture sources.
//!
//! A capture source hands out exclusive access to a live camera feed:
//! - `stub://` synthetic scripted feeds (demos, tests)
//! - `http(s)://` JPEG snapshot cameras (feature: capture-http)
//!
//! Acquisition returns a `CaptureHandle` that owns the live track. The track
//! is stopped exactly once: either by `CaptureHandle::release` or when the
//! handle is dropped on any other exit path.
//!
//! Capture sources MUST NOT:
//! - Store frames to disk
//! - Log frame content

#[cfg(feature = "capture-http")]
pub mod http;
pub mod stub;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::str::FromStr;
use url::Url;

use crate::config::CameraSettings;
use crate::detect::DetectionCapability;
use crate::error::{ScanError, ScanResult};
use crate::frame::Frame;

#[cfg(feature = "capture-http")]
pub use http::SnapshotCamera;
pub use stub::{CaptureCounters, ScriptedFrame, SyntheticCamera};

/// Which camera to prefer when a device has several.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera, pointed at the ticket holder.
    #[default]
    Environment,
    /// Front camera, pointed at the operator.
    User,
}

impl FromStr for Facing {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(Facing::Environment),
            "user" | "front" => Ok(Facing::User),
            other => Err(anyhow!(
                "unknown camera facing '{}'; expected environment or user",
                other
            )),
        }
    }
}

/// A camera that can be acquired for exclusive use.
pub trait CaptureSource: Send {
    /// Source identifier for logs.
    fn name(&self) -> &'static str;

    /// What a detector must be able to read in this source's frames.
    fn symbology(&self) -> DetectionCapability {
        DetectionCapability::QrCode
    }

    /// Request exclusive access to the camera.
    ///
    /// Fails with `PermissionDenied` or `DeviceUnavailable`; no track is
    /// left running on failure.
    fn acquire(&mut self, facing: Facing) -> ScanResult<CaptureHandle>;
}

/// A live media track owned by a `CaptureHandle`.
pub trait VideoTrack: Send {
    /// Human-readable track label.
    fn label(&self) -> String;

    /// Pull the next frame.
    ///
    /// `DecodeTransient` means this frame is unusable but the track is live;
    /// `DeviceUnavailable` means the track has ended.
    fn next_frame(&mut self) -> ScanResult<Frame>;

    /// Stop the underlying media. Called exactly once by `CaptureHandle`.
    fn stop(&mut self);
}

/// Exclusive ownership of a live capture track.
pub struct CaptureHandle {
    track: Option<Box<dyn VideoTrack>>,
    label: String,
}

impl CaptureHandle {
    pub fn new(track: Box<dyn VideoTrack>) -> Self {
        let label = track.label();
        Self {
            track: Some(track),
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.track.is_some()
    }

    pub fn next_frame(&mut self) -> ScanResult<Frame> {
        match self.track.as_mut() {
            Some(track) => track.next_frame(),
            None => Err(ScanError::DeviceUnavailable("capture released".to_string())),
        }
    }

    /// Stop all underlying media. Consumes the handle.
    pub fn release(mut self) {
        self.stop_track();
    }

    fn stop_track(&mut self) {
        if let Some(mut track) = self.track.take() {
            track.stop();
            log::debug!("capture track '{}' stopped", self.label);
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop_track();
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("label", &self.label)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Build the capture source named by the configured URL scheme.
pub fn open_camera(settings: &CameraSettings) -> Result<Box<dyn CaptureSource>> {
    let url = Url::parse(&settings.url).context("parse camera url")?;
    match url.scheme() {
        "stub" => Ok(Box::new(SyntheticCamera::from_url(
            &url,
            settings.width,
            settings.height,
        )?)),
        #[cfg(feature = "capture-http")]
        "http" | "https" => Ok(Box::new(SnapshotCamera::new(
            settings.url.clone(),
            settings.request_timeout,
        ))),
        #[cfg(not(feature = "capture-http"))]
        "http" | "https" => Err(anyhow!("http cameras require the capture-http feature")),
        other => Err(anyhow!(
            "unsupported camera scheme '{}'; expected stub or http(s)",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTrack {
        stops: Arc<AtomicUsize>,
    }

    impl VideoTrack for CountingTrack {
        fn label(&self) -> String {
            "counting".to_string()
        }

        fn next_frame(&mut self) -> ScanResult<Frame> {
            Ok(Frame::new(vec![0u8; 4], 2, 2, 1))
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn release_stops_track_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        let handle = CaptureHandle::new(Box::new(CountingTrack {
            stops: stops.clone(),
        }));
        handle.release();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_handle_stops_track() {
        let stops = Arc::new(AtomicUsize::new(0));
        {
            let mut handle = CaptureHandle::new(Box::new(CountingTrack {
                stops: stops.clone(),
            }));
            assert!(handle.next_frame().is_ok());
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stub_cameras_carry_synthetic_markers() {
        let camera = open_camera(&CameraSettings::default()).unwrap();
        assert_eq!(camera.symbology(), DetectionCapability::SyntheticMarker);
    }

    #[cfg(feature = "capture-http")]
    #[test]
    fn snapshot_cameras_need_a_qr_detector() {
        let settings = CameraSettings {
            url: "http://127.0.0.1:9/snapshot.jpg".to_string(),
            ..CameraSettings::default()
        };
        let camera = open_camera(&settings).unwrap();
        assert_eq!(camera.symbology(), DetectionCapability::QrCode);
    }

    #[test]
    fn facing_parses_aliases() {
        assert_eq!("rear".parse::<Facing>().unwrap(), Facing::Environment);
        assert_eq!("User".parse::<Facing>().unwrap(), Facing::User);
        assert!("sideways".parse::<Facing>().is_err());
    }
}
