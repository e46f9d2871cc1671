use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::error::{ScanError, ScanResult};

use super::backend::{DetectionCapability, PayloadDetector};

/// A detector shared between the registry and the session using it.
pub type SharedDetector = Arc<Mutex<dyn PayloadDetector>>;

/// Answers "can this device decode codes at all?" once, at session start.
pub trait CapabilityProvider: Send {
    /// Returns a detector for `capability`, or `CapabilityUnsupported`.
    fn detector_for(&self, capability: DetectionCapability) -> ScanResult<SharedDetector>;
}

/// Registry of detector backends.
///
/// Backends are wrapped in `Mutex` because `PayloadDetector::detect` takes `&mut self`.
/// An empty registry reports every capability as unsupported.
pub struct BackendRegistry {
    backends: HashMap<String, SharedDetector>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry holding every backend compiled into this build.
    pub fn with_builtin_backends() -> Self {
        let mut registry = Self::new();
        #[cfg(feature = "backend-rqrr")]
        registry.register(super::backends::QrBackend::new());
        registry.register(super::backends::MarkerBackend::new());
        registry
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: PayloadDetector + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SharedDetector> {
        self.backends.get(name).cloned()
    }

    pub fn default_backend(&self) -> Option<SharedDetector> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Select a backend that supports the requested capability.
    ///
    /// Prefers the default backend when it supports the capability.
    pub fn backend_for_capability(&self, capability: DetectionCapability) -> Result<SharedDetector> {
        if let Some(default_backend) = self.default_backend() {
            let supports = {
                let guard = default_backend
                    .lock()
                    .map_err(|_| anyhow!("default backend lock poisoned"))?;
                guard.supports(capability)
            };
            if supports {
                return Ok(default_backend);
            }
        }

        let mut names: Vec<&String> = self.backends.keys().collect();
        names.sort();
        for name in names {
            let backend = &self.backends[name];
            let supports = {
                let guard = backend
                    .lock()
                    .map_err(|_| anyhow!("backend lock poisoned"))?;
                guard.supports(capability)
            };
            if supports {
                return Ok(backend.clone());
            }
        }

        Err(anyhow!(
            "no registered backend supports capability {:?}",
            capability
        ))
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProvider for BackendRegistry {
    fn detector_for(&self, capability: DetectionCapability) -> ScanResult<SharedDetector> {
        self.backend_for_capability(capability).map_err(|err| {
            log::debug!("capability check failed: {:#}", err);
            ScanError::CapabilityUnsupported
        })
    }
}
