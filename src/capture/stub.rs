//! Synthetic capture source.
//!
//! `SyntheticCamera` plays a script of frames. Frames are noise with an
//! optional payload marker embedded at the start of the buffer, which the
//! `marker` detector backend decodes. It stands in for a real camera in
//! demos (`stub://` URLs) and drives the scan loop in tests.

use anyhow::{anyhow, Result};
use rand::RngCore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

use super::{CaptureHandle, CaptureSource, Facing, VideoTrack};
use crate::detect::backends::marker::{encode_marker, encode_truncated_marker};
use crate::detect::DetectionCapability;
use crate::error::{ScanError, ScanResult};
use crate::frame::Frame;

const DEFAULT_HOLD_FRAMES: usize = 20;
const DEFAULT_GAP_FRAMES: usize = 10;
const MIN_FRAME_BYTES: usize = 1024;

/// One scripted frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptedFrame {
    /// Nothing in view.
    Blank,
    /// A readable code carrying this payload.
    Code(String),
    /// A code in view that cannot be decoded (motion blur, glare).
    Garbled,
}

/// Acquisition and release counts, shared with every track the camera hands out.
#[derive(Debug, Default)]
pub struct CaptureCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl CaptureCounters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// Scripted camera.
pub struct SyntheticCamera {
    name: String,
    script: Arc<Vec<ScriptedFrame>>,
    repeat: bool,
    width: u32,
    height: u32,
    failure: Option<ScanError>,
    counters: Arc<CaptureCounters>,
}

impl SyntheticCamera {
    pub fn with_script(script: Vec<ScriptedFrame>) -> Self {
        Self {
            name: "synthetic".to_string(),
            script: Arc::new(script),
            repeat: false,
            width: 640,
            height: 480,
            failure: None,
            counters: Arc::new(CaptureCounters::default()),
        }
    }

    /// Build from a `stub://<name>?codes=A,B&hold=N&gap=M&repeat=bool` URL.
    pub fn from_url(url: &Url, width: u32, height: u32) -> Result<Self> {
        if (width as usize) * (height as usize) < MIN_FRAME_BYTES {
            return Err(anyhow!(
                "synthetic frames must be at least {} pixels",
                MIN_FRAME_BYTES
            ));
        }
        let mut codes = Vec::new();
        let mut hold = DEFAULT_HOLD_FRAMES;
        let mut gap = DEFAULT_GAP_FRAMES;
        let mut repeat = true;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "codes" => codes.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|code| !code.is_empty())
                        .map(str::to_string),
                ),
                "hold" => {
                    hold = value
                        .parse()
                        .map_err(|_| anyhow!("stub hold must be a frame count"))?
                }
                "gap" => {
                    gap = value
                        .parse()
                        .map_err(|_| anyhow!("stub gap must be a frame count"))?
                }
                "repeat" => {
                    repeat = value
                        .parse()
                        .map_err(|_| anyhow!("stub repeat must be true or false"))?
                }
                other => log::warn!("ignoring unknown stub camera option '{}'", other),
            }
        }

        let mut script = Vec::with_capacity(codes.len() * (hold + gap));
        for code in codes {
            script.extend(std::iter::repeat(ScriptedFrame::Blank).take(gap));
            script.extend(std::iter::repeat(ScriptedFrame::Code(code)).take(hold));
        }

        let name = url.host_str().unwrap_or("synthetic").to_string();
        Ok(Self {
            name,
            script: Arc::new(script),
            repeat,
            width,
            height,
            failure: None,
            counters: Arc::new(CaptureCounters::default()),
        })
    }

    /// Loop the script instead of ending the track after the last frame.
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Make every acquisition fail with `error`.
    pub fn failing_with(mut self, error: ScanError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn counters(&self) -> Arc<CaptureCounters> {
        self.counters.clone()
    }
}

impl CaptureSource for SyntheticCamera {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn symbology(&self) -> DetectionCapability {
        DetectionCapability::SyntheticMarker
    }

    fn acquire(&mut self, facing: Facing) -> ScanResult<CaptureHandle> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        log::debug!("synthetic camera '{}' acquired ({:?})", self.name, facing);
        Ok(CaptureHandle::new(Box::new(SyntheticTrack {
            label: format!("stub://{}", self.name),
            script: self.script.clone(),
            cursor: 0,
            repeat: self.repeat,
            width: self.width,
            height: self.height,
            sequence: 0,
            stopped: false,
            counters: self.counters.clone(),
        })))
    }
}

struct SyntheticTrack {
    label: String,
    script: Arc<Vec<ScriptedFrame>>,
    cursor: usize,
    repeat: bool,
    width: u32,
    height: u32,
    sequence: u64,
    stopped: bool,
    counters: Arc<CaptureCounters>,
}

impl SyntheticTrack {
    fn next_scripted(&mut self) -> ScanResult<ScriptedFrame> {
        if self.script.is_empty() {
            return Ok(ScriptedFrame::Blank);
        }
        if self.cursor >= self.script.len() {
            if !self.repeat {
                return Err(ScanError::DeviceUnavailable(
                    "synthetic stream ended".to_string(),
                ));
            }
            self.cursor = 0;
        }
        let frame = self.script[self.cursor].clone();
        self.cursor += 1;
        Ok(frame)
    }

    fn render(&self, scripted: &ScriptedFrame) -> Vec<u8> {
        let len = self.width as usize * self.height as usize;
        let mut pixels = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut pixels);
        let marker = match scripted {
            ScriptedFrame::Blank => return pixels,
            ScriptedFrame::Code(payload) => encode_marker(payload),
            ScriptedFrame::Garbled => encode_truncated_marker(),
        };
        let n = marker.len().min(len);
        pixels[..n].copy_from_slice(&marker[..n]);
        pixels
    }
}

impl VideoTrack for SyntheticTrack {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn next_frame(&mut self) -> ScanResult<Frame> {
        if self.stopped {
            return Err(ScanError::DeviceUnavailable("track stopped".to_string()));
        }
        let scripted = self.next_scripted()?;
        let pixels = self.render(&scripted);
        self.sequence += 1;
        Ok(Frame::new(pixels, self.width, self.height, self.sequence))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
