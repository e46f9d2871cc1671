//! Ticket check-in scanner.
//!
//! This crate implements the door-side scan loop of a ticketing platform:
//! a camera feed is polled frame by frame, QR payloads are decoded, a
//! cooldown gate rate-limits dispatch, and each admitted payload is sent to
//! the backend for an authoritative approve/reject decision that is then
//! shown to the operator.
//!
//! # Invariants
//!
//! 1. **One session**: at most one `ScanSession` per driver; the camera is
//!    exclusively owned by it and released exactly once on every exit path.
//! 2. **One request in flight**: the gate closes on dispatch and reopens a
//!    fixed delay after the verification resolves.
//! 3. **Server decides**: approval comes only from the backend; metadata is
//!    display-only.
//! 4. **Session-scoped errors**: only an unsupported device or a refused
//!    camera stop a start; every other failure ends one cycle or request.
//!
//! # Module Structure
//!
//! - `capture`: camera sources and the scoped `CaptureHandle`
//! - `detect`: payload detectors and the capability provider
//! - `gate`: dedup/cooldown gate
//! - `verify`: verification client and credential stores
//! - `present`: status line and result card
//! - `session`, `driver`: the scan loop itself

pub mod capture;
pub mod clock;
pub mod config;
pub mod detect;
pub mod driver;
pub mod error;
pub mod frame;
pub mod gate;
pub mod present;
pub mod session;
pub mod ui;
pub mod verify;

pub use capture::{CaptureHandle, CaptureSource, Facing, ScriptedFrame, SyntheticCamera};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CameraSettings, ScanSettings, ScannerConfig};
pub use detect::{
    BackendRegistry, CapabilityProvider, DecodedPayload, DetectionCapability, MarkerBackend,
    PayloadDetector,
};
pub use driver::{
    Command, CycleOutcome, DriverParts, FrameScheduler, ManualSpawner, PacedScheduler,
    ScanDriver, Spawner, ThreadSpawner,
};
pub use error::{ScanError, ScanResult};
pub use frame::Frame;
pub use gate::{CooldownGate, CooldownStart, DEFAULT_COOLDOWN};
pub use present::{Badge, MemorySink, PresentationSink, ResultCard, ScannerStatus};
pub use session::{ScanSession, ScanState, SessionStats};
pub use verify::{
    CredentialStore, FileCredentialStore, HttpVerifier, StaticCredential, VerificationRequest,
    VerificationResult, Verifier,
};
