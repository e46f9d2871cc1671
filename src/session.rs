//! One scanning attempt.
//!
//! A `ScanSession` is built when a start request succeeds and torn down on
//! stop or when the camera track ends. It owns the capture handle, the
//! detector chosen at start, and the cooldown gate, so no scan state outlives
//! the session that produced it.

use anyhow::{anyhow, Result};
use std::time::Instant;

use crate::capture::CaptureHandle;
use crate::detect::{DecodedPayload, SharedDetector};
use crate::error::ScanResult;
use crate::frame::Frame;
use crate::gate::CooldownGate;

/// Scanner lifecycle. `Cooldown` is internal to an active session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Starting,
    Active,
    Cooldown,
    Stopped,
}

/// Per-session counters, logged when the session ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub decode_errors: u64,
    pub dispatched: u64,
    pub suppressed: u64,
    pub approved: u64,
    pub rejected: u64,
    pub unreachable: u64,
}

pub struct ScanSession {
    id: u64,
    capture: Option<CaptureHandle>,
    detector: SharedDetector,
    gate: CooldownGate,
    pub(crate) stats: SessionStats,
    started_at: Instant,
}

impl ScanSession {
    pub(crate) fn new(
        id: u64,
        capture: CaptureHandle,
        detector: SharedDetector,
        gate: CooldownGate,
        started_at: Instant,
    ) -> Self {
        Self {
            id,
            capture: Some(capture),
            detector,
            gate,
            stats: SessionStats::default(),
            started_at,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self, now: Instant) -> ScanState {
        if self.capture.is_none() {
            ScanState::Stopped
        } else if self.gate.is_open(now) {
            ScanState::Active
        } else {
            ScanState::Cooldown
        }
    }

    /// Last payload admitted by the gate. Used for dedup only, not identity.
    pub fn last_payload(&self) -> Option<&str> {
        self.gate.last_payload()
    }

    pub fn cooldown_until(&self) -> Option<Instant> {
        self.gate.cooldown_until()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn capture_label(&self) -> Option<&str> {
        self.capture.as_ref().map(CaptureHandle::label)
    }

    pub(crate) fn gate_mut(&mut self) -> &mut CooldownGate {
        &mut self.gate
    }

    pub(crate) fn next_frame(&mut self) -> ScanResult<Frame> {
        match self.capture.as_mut() {
            Some(capture) => capture.next_frame(),
            None => Err(crate::error::ScanError::DeviceUnavailable(
                "capture released".to_string(),
            )),
        }
    }

    pub(crate) fn detect(&mut self, frame: &Frame) -> Result<Vec<DecodedPayload>> {
        let mut detector = self
            .detector
            .lock()
            .map_err(|_| anyhow!("detector lock poisoned"))?;
        detector.detect(frame)
    }

    /// Release the camera. Safe to call more than once.
    pub(crate) fn release(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.release();
        }
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("capture", &self.capture)
            .field("stats", &self.stats)
            .finish()
    }
}
