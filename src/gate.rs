//! Dedup/cooldown gate.
//!
//! The gate keeps one physical scan from producing a burst of verification
//! calls while the code stays in view, and keeps back-to-back codes from
//! racing each other. It admits a payload only while open, closes on
//! admission, stays closed while the verification is in flight, and reopens
//! a fixed delay after the verification resolves.
//!
//! The gate is a rate limiter, not a ledger: once it reopens, the same
//! payload is admitted again and re-verified.

use serde::Deserialize;
use std::time::{Duration, Instant};

/// Default reopen delay.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1200);

/// Where the cooldown window is anchored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownStart {
    /// Window starts when the verification resolves, so slow backends
    /// stretch the suppression window.
    #[default]
    AfterCompletion,
    /// Window starts at dispatch. The gate still stays closed until the
    /// in-flight verification resolves.
    AfterDispatch,
}

#[derive(Clone, Debug)]
pub struct CooldownGate {
    cooldown: Duration,
    policy: CooldownStart,
    in_flight: bool,
    dispatched_at: Option<Instant>,
    cooldown_until: Option<Instant>,
    last_payload: Option<String>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration, policy: CooldownStart) -> Self {
        Self {
            cooldown,
            policy,
            in_flight: false,
            dispatched_at: None,
            cooldown_until: None,
            last_payload: None,
        }
    }

    pub fn is_open(&self, now: Instant) -> bool {
        if self.in_flight {
            return false;
        }
        match self.cooldown_until {
            Some(until) => now >= until,
            None => true,
        }
    }

    /// Admit `payload` if the gate is open. Closes the gate on admission.
    pub fn try_admit(&mut self, payload: &str, now: Instant) -> bool {
        if !self.is_open(now) {
            return false;
        }
        self.in_flight = true;
        self.dispatched_at = Some(now);
        self.cooldown_until = None;
        self.last_payload = Some(payload.to_string());
        true
    }

    /// Mark the in-flight verification resolved (success or failure).
    pub fn complete(&mut self, now: Instant) {
        if !self.in_flight {
            return;
        }
        self.in_flight = false;
        let anchor = match self.policy {
            CooldownStart::AfterCompletion => now,
            CooldownStart::AfterDispatch => self.dispatched_at.unwrap_or(now),
        };
        self.cooldown_until = Some(anchor + self.cooldown);
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_payload(&self) -> Option<&str> {
        self.last_payload.as_deref()
    }

    pub fn cooldown_until(&self) -> Option<Instant> {
        self.cooldown_until
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, CooldownStart::default())
    }
}
