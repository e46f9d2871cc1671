//! Scan loop driver.
//!
//! The driver owns at most one `ScanSession` and runs the
//! capture → detect → gate → verify cycle one frame at a time:
//!
//! ```text
//! Idle ──start──▶ Starting ──camera ok──▶ Active ⇄ Cooldown ──stop──▶ Stopped
//!   ▲                │                                                  │
//!   └── unsupported / camera refused                 start (new session)┘
//! ```
//!
//! All session and gate state is mutated on the thread calling `tick`.
//! Verifications run through a `Spawner`; their results come back over a
//! channel and are applied at the top of the next cycle. Results belonging
//! to a session that has since stopped are discarded unrendered.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::capture::CaptureSource;
use crate::clock::Clock;
use crate::config::ScanSettings;
use crate::detect::CapabilityProvider;
use crate::error::{ScanError, ScanResult};
use crate::gate::CooldownGate;
use crate::present::{PresentationSink, ResultCard, ScannerStatus};
use crate::session::{ScanSession, ScanState};
use crate::verify::{payload_fingerprint, VerificationRequest, VerificationResult, Verifier};

/// Work handed to a `Spawner`.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs verification jobs without blocking the frame loop.
pub trait Spawner: Send {
    fn spawn(&self, job: Job) -> Result<()>;
}

/// One worker thread per verification.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSpawner;

impl Spawner for ThreadSpawner {
    fn spawn(&self, job: Job) -> Result<()> {
        std::thread::Builder::new()
            .name("checkin-verify".to_string())
            .spawn(job)
            .map(|_| ())
            .context("spawn verification worker")
    }
}

/// Queues jobs until `run_pending` is called. Clones share the queue.
#[derive(Clone, Default)]
pub struct ManualSpawner {
    queue: Arc<Mutex<VecDeque<Job>>>,
}

impl ManualSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run the oldest queued job. Returns false when the queue is empty.
    pub fn run_next(&self) -> bool {
        let job = self.queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run every queued job, returning how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Spawner for ManualSpawner {
    fn spawn(&self, job: Job) -> Result<()> {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(job);
        Ok(())
    }
}

/// Paces the loop, like a display's frame callback.
pub trait FrameScheduler {
    /// Block until the next frame is due.
    fn wait_for_frame(&mut self);
}

/// Fixed-rate scheduler on the wall clock.
#[derive(Debug)]
pub struct PacedScheduler {
    interval: Duration,
    next_deadline: Option<Instant>,
}

impl PacedScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_deadline: None,
        }
    }
}

impl FrameScheduler for PacedScheduler {
    fn wait_for_frame(&mut self) {
        let now = Instant::now();
        if let Some(deadline) = self.next_deadline {
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
        let base = self
            .next_deadline
            .map(|deadline| deadline.max(now))
            .unwrap_or(now);
        self.next_deadline = Some(base + self.interval);
    }
}

/// Operator controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Quit,
}

/// What one call to `tick` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No active session.
    Inactive,
    /// The frame was unusable; try again next cycle.
    FrameSkipped,
    /// The detector failed on this frame.
    DecodeFailed,
    /// Nothing decodable in view.
    NothingDecoded,
    /// A payload was decoded but the gate was closed.
    Suppressed,
    /// A verification was dispatched.
    Dispatched,
    /// The worker could not be started; the gate was reopened.
    DispatchFailed,
    /// The camera track ended and the session was torn down.
    CaptureLost,
}

struct Completion {
    session_id: u64,
    fingerprint: String,
    completed_at: Instant,
    outcome: ScanResult<VerificationResult>,
}

/// Collaborators a driver is assembled from.
pub struct DriverParts {
    pub camera: Box<dyn CaptureSource>,
    pub capabilities: Box<dyn CapabilityProvider>,
    pub verifier: Arc<dyn Verifier>,
    pub sink: Box<dyn PresentationSink>,
    pub spawner: Box<dyn Spawner>,
    pub clock: Arc<dyn Clock>,
    pub settings: ScanSettings,
}

pub struct ScanDriver {
    camera: Box<dyn CaptureSource>,
    capabilities: Box<dyn CapabilityProvider>,
    verifier: Arc<dyn Verifier>,
    sink: Box<dyn PresentationSink>,
    spawner: Box<dyn Spawner>,
    clock: Arc<dyn Clock>,
    settings: ScanSettings,
    state: ScanState,
    status: Option<ScannerStatus>,
    session: Option<ScanSession>,
    sessions_started: u64,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
}

impl ScanDriver {
    pub fn new(parts: DriverParts) -> Self {
        let (completions_tx, completions_rx) = mpsc::channel();
        Self {
            camera: parts.camera,
            capabilities: parts.capabilities,
            verifier: parts.verifier,
            sink: parts.sink,
            spawner: parts.spawner,
            clock: parts.clock,
            settings: parts.settings,
            state: ScanState::Idle,
            status: None,
            session: None,
            sessions_started: 0,
            completions_tx,
            completions_rx,
        }
    }

    /// Outer lifecycle state. Cooldown is reported by `ScanSession::state`.
    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start a session. A no-op while one is active.
    ///
    /// Checks decoding capability before touching the camera; on any
    /// failure the driver returns to `Idle` with a status shown.
    pub fn start(&mut self) -> ScanResult<()> {
        if self.session.is_some() {
            log::debug!("start ignored: session already active");
            return Ok(());
        }

        let symbology = self.camera.symbology();
        let detector = match self.capabilities.detector_for(symbology) {
            Ok(detector) => detector,
            Err(err) => {
                log::warn!(
                    "cannot start scanner: no {:?} detector for camera '{}': {}",
                    symbology,
                    self.camera.name(),
                    err
                );
                self.state = ScanState::Idle;
                self.set_status(ScannerStatus::NotSupported);
                return Err(err);
            }
        };
        let warmed = match detector.lock() {
            Ok(mut guard) => guard.warm_up().map(|_| guard.name()),
            Err(_) => Err(anyhow::anyhow!("detector lock poisoned")),
        };
        let backend = match warmed {
            Ok(name) => name,
            Err(err) => {
                log::warn!("detector warm-up failed: {:#}", err);
                self.state = ScanState::Idle;
                self.set_status(ScannerStatus::NotSupported);
                return Err(ScanError::CapabilityUnsupported);
            }
        };

        self.state = ScanState::Starting;
        self.set_status(ScannerStatus::AwaitingCamera);
        let capture = match self.camera.acquire(self.settings.facing) {
            Ok(capture) => capture,
            Err(err) => {
                log::warn!("camera '{}' not acquired: {}", self.camera.name(), err);
                let err = if err.is_capture_fatal() {
                    err
                } else {
                    ScanError::DeviceUnavailable(err.to_string())
                };
                self.state = ScanState::Idle;
                self.set_status(camera_status(&err));
                return Err(err);
            }
        };

        self.sessions_started += 1;
        let id = self.sessions_started;
        log::info!(
            "scan session {} started on {} (detector: {})",
            id,
            capture.label(),
            backend
        );
        let gate = CooldownGate::new(self.settings.cooldown, self.settings.cooldown_start);
        self.session = Some(ScanSession::new(
            id,
            capture,
            detector,
            gate,
            self.clock.now(),
        ));
        self.state = ScanState::Active;
        self.set_status(ScannerStatus::Scanning);
        Ok(())
    }

    /// Stop the active session and release the camera. A no-op when idle.
    pub fn stop(&mut self) {
        if self.session.is_none() {
            log::debug!("stop ignored: no active session");
            return;
        }
        self.end_session(ScannerStatus::Stopped);
    }

    /// Run one capture → detect → gate → verify cycle.
    pub fn tick(&mut self) -> CycleOutcome {
        self.drain_completions();
        let now = self.clock.now();

        let Some(session) = self.session.as_mut() else {
            return CycleOutcome::Inactive;
        };

        let frame = match session.next_frame() {
            Ok(frame) => frame,
            Err(err) if !err.is_capture_fatal() => {
                session.stats.decode_errors += 1;
                log::debug!("frame skipped: {}", err);
                return CycleOutcome::FrameSkipped;
            }
            Err(err) => {
                log::warn!("camera track lost: {}", err);
                self.end_session(camera_status(&err));
                return CycleOutcome::CaptureLost;
            }
        };
        session.stats.frames += 1;

        let payloads = match session.detect(&frame) {
            Ok(payloads) => payloads,
            Err(err) => {
                session.stats.decode_errors += 1;
                log::debug!("frame {} decode failed: {:#}", frame.sequence, err);
                return CycleOutcome::DecodeFailed;
            }
        };
        drop(frame);

        let Some(payload) = payloads.into_iter().find(|payload| !payload.is_blank()) else {
            return CycleOutcome::NothingDecoded;
        };
        if !session.gate_mut().try_admit(&payload.text, now) {
            session.stats.suppressed += 1;
            return CycleOutcome::Suppressed;
        }
        session.stats.dispatched += 1;
        let session_id = session.id();
        self.dispatch(session_id, payload.text)
    }

    /// Apply operator commands and run cycles until `Quit` or until every
    /// command sender is gone. Stops the session on the way out.
    pub fn run(&mut self, scheduler: &mut dyn FrameScheduler, commands: &Receiver<Command>) {
        loop {
            loop {
                match commands.try_recv() {
                    Ok(Command::Start) => {
                        if let Err(err) = self.start() {
                            log::warn!("start failed: {}", err);
                        }
                    }
                    Ok(Command::Stop) => self.stop(),
                    Ok(Command::Quit) | Err(TryRecvError::Disconnected) => {
                        self.stop();
                        return;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }
            scheduler.wait_for_frame();
            self.tick();
        }
    }

    fn dispatch(&mut self, session_id: u64, payload: String) -> CycleOutcome {
        let mut request = VerificationRequest::new(payload);
        if !self.settings.mark_used {
            request = request.lookup_only();
        }
        let fingerprint = payload_fingerprint(&request.payload);
        log::info!("ticket {} sent for verification", fingerprint);

        let verifier = self.verifier.clone();
        let clock = self.clock.clone();
        let completions = self.completions_tx.clone();
        let job: Job = Box::new(move || {
            let outcome = verifier.verify(&request);
            let completion = Completion {
                session_id,
                fingerprint,
                completed_at: clock.now(),
                outcome,
            };
            if completions.send(completion).is_err() {
                log::debug!("scan driver gone; verification result dropped");
            }
        });

        if let Err(err) = self.spawner.spawn(job) {
            log::error!("failed to dispatch verification: {:#}", err);
            let now = self.clock.now();
            if let Some(session) = self.session.as_mut() {
                session.gate_mut().complete(now);
            }
            return CycleOutcome::DispatchFailed;
        }
        CycleOutcome::Dispatched
    }

    fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            let Some(session) = self
                .session
                .as_mut()
                .filter(|session| session.id() == completion.session_id)
            else {
                log::debug!(
                    "discarding verification of ticket {} from ended session {}",
                    completion.fingerprint,
                    completion.session_id
                );
                continue;
            };
            session.gate_mut().complete(completion.completed_at);

            match completion.outcome {
                Ok(result) => {
                    if result.approved {
                        session.stats.approved += 1;
                    } else {
                        session.stats.rejected += 1;
                    }
                    self.sink.show_result(&ResultCard::from_result(&result));
                    if self.status.as_ref().map_or(false, ScannerStatus::is_error) {
                        self.set_status(ScannerStatus::Scanning);
                    }
                }
                Err(ScanError::Unreachable(reason)) => {
                    session.stats.unreachable += 1;
                    self.set_status(ScannerStatus::NetworkError(reason));
                }
                Err(ScanError::Unauthenticated) => {
                    self.set_status(ScannerStatus::Unauthenticated);
                }
                Err(err) => {
                    log::warn!(
                        "verification of ticket {} failed: {}",
                        completion.fingerprint,
                        err
                    );
                }
            }
        }
    }

    fn end_session(&mut self, status: ScannerStatus) {
        if let Some(mut session) = self.session.take() {
            session.release();
            log::info!(
                "scan session {} ended: {:?}",
                session.id(),
                session.stats()
            );
        }
        self.state = ScanState::Stopped;
        self.set_status(status);
    }

    fn set_status(&mut self, status: ScannerStatus) {
        self.sink.show_status(&status);
        self.status = Some(status);
    }
}

/// Status line for a camera that could not be acquired or was lost.
fn camera_status(err: &ScanError) -> ScannerStatus {
    match err {
        ScanError::PermissionDenied => ScannerStatus::PermissionDenied,
        ScanError::DeviceUnavailable(reason) => ScannerStatus::CameraUnavailable(reason.clone()),
        other => ScannerStatus::CameraUnavailable(other.to_string()),
    }
}
