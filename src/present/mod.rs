//! Presentation sink.
//!
//! Two independent surfaces: the status line (scanner lifecycle) and the
//! result card (one verification outcome). The card persists until the next
//! completed verification replaces it; cooldown expiry never clears it.

mod card;

use std::sync::{Arc, Mutex};

pub use card::{Badge, ResultCard, LINE_SEPARATOR};

/// Scanner lifecycle, shown on the status line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScannerStatus {
    NotSupported,
    AwaitingCamera,
    Scanning,
    Stopped,
    PermissionDenied,
    CameraUnavailable(String),
    Unauthenticated,
    NetworkError(String),
}

impl ScannerStatus {
    pub fn message(&self) -> String {
        match self {
            ScannerStatus::NotSupported => "Code scanning is not supported on this device".into(),
            ScannerStatus::AwaitingCamera => "Waiting for camera access…".into(),
            ScannerStatus::Scanning => "Scanning: hold the ticket code in view".into(),
            ScannerStatus::Stopped => "Scanner stopped".into(),
            ScannerStatus::PermissionDenied => "Camera permission denied".into(),
            ScannerStatus::CameraUnavailable(reason) => format!("Camera unavailable: {}", reason),
            ScannerStatus::Unauthenticated => "Not signed in; sign in and try again".into(),
            ScannerStatus::NetworkError(reason) => format!("Network error: {}", reason),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ScannerStatus::NotSupported
                | ScannerStatus::PermissionDenied
                | ScannerStatus::CameraUnavailable(_)
                | ScannerStatus::Unauthenticated
                | ScannerStatus::NetworkError(_)
        )
    }
}

/// Where the driver renders status and results.
pub trait PresentationSink: Send {
    fn show_status(&mut self, status: &ScannerStatus);
    fn show_result(&mut self, card: &ResultCard);
}

/// One rendered surface update, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Status(ScannerStatus),
    Result(ResultCard),
}

/// In-memory sink. Clones share the same record.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().clone()
    }

    pub fn statuses(&self) -> Vec<ScannerStatus> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Status(status) => Some(status.clone()),
                SinkEvent::Result(_) => None,
            })
            .collect()
    }

    pub fn cards(&self) -> Vec<ResultCard> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Result(card) => Some(card.clone()),
                SinkEvent::Status(_) => None,
            })
            .collect()
    }

    /// Status line as currently shown.
    pub fn current_status(&self) -> Option<ScannerStatus> {
        self.statuses().pop()
    }

    /// Result card as currently shown.
    pub fn current_card(&self) -> Option<ResultCard> {
        self.cards().pop()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PresentationSink for MemorySink {
    fn show_status(&mut self, status: &ScannerStatus) {
        self.lock().push(SinkEvent::Status(status.clone()));
    }

    fn show_result(&mut self, card: &ResultCard) {
        self.lock().push(SinkEvent::Result(card.clone()));
    }
}
