//! Verification client.
//!
//! Sends a decoded payload to the backend's check-in endpoint and turns the
//! reply into a `VerificationResult`. The backend is the only authority on
//! whether a ticket is valid; nothing here decides approval locally.

mod client;
mod credentials;
mod types;

use sha2::{Digest, Sha256};

pub use client::{interpret_response, HttpVerifier};
pub use credentials::{
    CredentialStore, FileCredentialStore, StaticCredential, DEFAULT_CREDENTIAL_KEY,
};
pub use types::{
    BookingMeta, Identifier, SeatMeta, TicketMeta, VerificationMeta, VerificationRequest,
    VerificationResult,
};

use crate::error::ScanResult;

/// Anything that can produce an authoritative verification decision.
///
/// Implementations must resolve server-side rejections to a result with
/// `approved == false`; `Err` is reserved for `EmptyPayload`,
/// `Unauthenticated` and `Unreachable`.
pub trait Verifier: Send + Sync {
    fn verify(&self, request: &VerificationRequest) -> ScanResult<VerificationResult>;
}

/// Short, non-reversible tag for a payload. Logs carry this, never the payload.
pub fn payload_fingerprint(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    hex::encode(&digest[..6])
}
