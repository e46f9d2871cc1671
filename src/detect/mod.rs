mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::{DetectionCapability, PayloadDetector};
pub use backends::MarkerBackend;
#[cfg(feature = "backend-rqrr")]
pub use backends::QrBackend;
pub use registry::{BackendRegistry, CapabilityProvider, SharedDetector};
pub use result::DecodedPayload;
